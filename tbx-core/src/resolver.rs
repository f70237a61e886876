// tbx-core/src/resolver.rs

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use tbx_common::dependency::{BomImport, PreparedRoot, RawRoot, ResolutionRoot};
use tbx_common::engine::{
    CollectRequest, CollectRoot, ResolverEngine, SessionConfig, UpdatePolicy, REQUEST_CONTEXT,
};
use tbx_common::error::{Result, TbxError};
use tbx_common::model::version::ALL_VERSIONS;
use tbx_common::model::{
    ArtifactDescriptor, ArtifactResult, CollectResult, Coordinate, Dependency, DependencyExt,
    DependencyNode, DependencyResult, RemoteRepository, RepositoryMetadata, Version,
};
use tbx_common::ResolutionScope;
use tracing::{debug, warn};

/// Orchestrates collection and resolution on top of a [`ResolverEngine`].
///
/// Holds no mutable state: every call derives its own [`SessionConfig`]
/// from the one given at construction, so a single instance can be shared
/// across concurrent tasks.
pub struct ToolboxResolver {
    engine: Arc<dyn ResolverEngine>,
    session: SessionConfig,
    remote_repositories: Vec<RemoteRepository>,
}

impl ToolboxResolver {
    pub fn new(
        engine: Arc<dyn ResolverEngine>,
        session: SessionConfig,
        remote_repositories: Vec<RemoteRepository>,
    ) -> Self {
        Self {
            engine,
            session,
            remote_repositories,
        }
    }

    pub fn engine(&self) -> &Arc<dyn ResolverEngine> {
        &self.engine
    }

    pub fn session(&self) -> SessionConfig {
        self.session
    }

    pub fn remote_repositories(&self) -> &[RemoteRepository] {
        &self.remote_repositories
    }

    pub async fn read_artifact_descriptor(&self, coordinate: &Coordinate) -> Result<ArtifactDescriptor> {
        debug!("Reading artifact descriptor of {}", coordinate);
        self.engine
            .read_descriptor(&self.session, coordinate, &self.remote_repositories)
            .await
            .map_err(|e| match e {
                e @ TbxError::DescriptorFetch { .. } => e,
                other => TbxError::DescriptorFetch {
                    coordinate: coordinate.to_string(),
                    reason: other.to_string(),
                },
            })
    }

    /// Managed dependencies of the given BOMs, first listed wins.
    pub async fn import_boms<I, S>(&self, boms: I) -> Result<Vec<Dependency>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut import = BomImport::new();
        for bom_gav in boms {
            let bom_gav = bom_gav.as_ref().trim();
            if bom_gav.is_empty() {
                continue;
            }
            let bom = Coordinate::parse(bom_gav)?;
            let descriptor = self.read_artifact_descriptor(&bom).await?;
            import.absorb(&bom, descriptor.managed_dependencies);
        }
        Ok(import.finish())
    }

    /// Parses a full coordinate, or a `group:artifact` pair whose version
    /// comes from `managed`.
    pub fn parse_gav(&self, gav: &str, managed: &[Dependency]) -> Result<Coordinate> {
        match Coordinate::parse(gav) {
            Ok(coordinate) => Ok(coordinate),
            Err(e) => match managed.find_group_artifact(gav) {
                Some(dependency) => {
                    debug!(
                        "Using managed version {} for {}",
                        dependency.coordinate.version, gav
                    );
                    Ok(dependency.coordinate.clone())
                }
                None => Err(e),
            },
        }
    }

    pub fn parse_remote_repository(&self, spec: &str) -> Result<RemoteRepository> {
        RemoteRepository::parse_spec(spec)
    }

    pub async fn load_gav<I, S>(&self, gav: &str, boms: I) -> Result<PreparedRoot>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let managed = self.import_boms(boms).await?;
        let coordinate = self.parse_gav(gav, &managed)?;
        self.load_root(RawRoot::new(coordinate).with_managed_dependencies(managed))
            .await
    }

    /// Brings a root into the prepared state, reading its descriptor if
    /// it is still raw. Prepared roots come back untouched.
    pub async fn load_root(&self, root: impl Into<ResolutionRoot>) -> Result<PreparedRoot> {
        match root.into() {
            ResolutionRoot::Prepared(prepared) => Ok(prepared),
            ResolutionRoot::Loaded(loaded) => Ok(loaded.prepare()),
            ResolutionRoot::Raw(raw) => {
                let descriptor = self.read_artifact_descriptor(raw.coordinate()).await?;
                Ok(raw.load(descriptor).prepare())
            }
        }
    }

    fn collect_request(
        &self,
        scope: ResolutionScope,
        root: CollectRoot,
        dependencies: &[Dependency],
        managed_dependencies: &[Dependency],
    ) -> CollectRequest {
        let dependencies = if scope.eliminate_test() {
            dependencies.without_test()
        } else {
            dependencies.to_vec()
        };
        CollectRequest {
            root,
            dependencies,
            managed_dependencies: managed_dependencies.to_vec(),
            repositories: self.remote_repositories.clone(),
            context: REQUEST_CONTEXT.to_string(),
        }
    }

    pub async fn collect(
        &self,
        scope: ResolutionScope,
        root: impl Into<CollectRoot>,
        dependencies: &[Dependency],
        managed_dependencies: &[Dependency],
        verbose: bool,
    ) -> Result<CollectResult> {
        let root = root.into();
        let session = self.session.with_verbose(verbose);
        debug!("Collecting scope: {}", scope);

        let request = self.collect_request(scope, root, dependencies, managed_dependencies);
        debug!(
            "Collecting {} with {} direct and {} managed dependencies",
            request.root.coordinate(),
            request.dependencies.len(),
            request.managed_dependencies.len()
        );
        let mut result = self
            .engine
            .collect_dependencies(&session, &request)
            .await
            .map_err(|e| collection_error(&request, scope, e))?;

        if !verbose {
            prune_direct_children(&mut result.root, scope);
        }
        Ok(result)
    }

    pub async fn collect_root(
        &self,
        scope: ResolutionScope,
        root: &PreparedRoot,
        verbose: bool,
    ) -> Result<CollectResult> {
        self.collect(
            scope,
            root.coordinate().clone(),
            root.dependencies(),
            root.managed_dependencies(),
            verbose,
        )
        .await
    }

    pub async fn resolve(
        &self,
        scope: ResolutionScope,
        root: impl Into<CollectRoot>,
        dependencies: &[Dependency],
        managed_dependencies: &[Dependency],
    ) -> Result<DependencyResult> {
        let root = root.into();
        let session = self.session;
        debug!("Resolving scope: {}", scope);

        let request = self.collect_request(scope, root, dependencies, managed_dependencies);
        let mut result = match self
            .engine
            .resolve_dependencies(&session, &request, scope.resolution_filter())
            .await
        {
            Ok(result) => result,
            Err(e @ TbxError::Resolution { .. }) => return Err(e),
            Err(e) => return Err(collection_error(&request, scope, e)),
        };

        if prune_direct_children(&mut result.root, scope) > 0 {
            let remaining: HashSet<&Coordinate> = result
                .root
                .descendants()
                .into_iter()
                .map(DependencyNode::coordinate)
                .collect();
            result
                .artifact_results
                .retain(|r| remaining.contains(&r.coordinate));
        }

        let root_coordinate = request.root.coordinate().clone();
        let root_result = self
            .engine
            .resolve_artifacts(&session, &[root_coordinate.clone()], &self.remote_repositories)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| {
                ArtifactResult::failed(
                    root_coordinate.clone(),
                    vec!["engine returned no result for the root artifact".to_string()],
                )
            });

        if !root_result.is_resolved() {
            return Err(TbxError::Resolution {
                message: format!(
                    "Failed to resolve root artifact {}: {}",
                    root_coordinate,
                    root_result.exceptions.join("; ")
                ),
                partial: Some(Box::new(result)),
            });
        }

        let mut new_root = DependencyNode::root(root_result.coordinate.clone());
        new_root.file = root_result.file.clone();
        new_root.children = std::mem::take(&mut result.root.children);
        result.root = new_root;
        result.artifact_results.insert(0, root_result);
        Ok(result)
    }

    pub async fn resolve_root(
        &self,
        scope: ResolutionScope,
        root: &PreparedRoot,
    ) -> Result<DependencyResult> {
        self.resolve(
            scope,
            root.coordinate().clone(),
            root.dependencies(),
            root.managed_dependencies(),
        )
        .await
    }

    /// Resolves the given artifacts; fails if any one of them is missing.
    pub async fn resolve_artifacts(&self, coordinates: &[Coordinate]) -> Result<Vec<ArtifactResult>> {
        let results = self
            .engine
            .resolve_artifacts(&self.session, coordinates, &self.remote_repositories)
            .await;
        let failures: Vec<String> = results
            .iter()
            .filter(|r| !r.is_resolved())
            .map(|r| format!("{} ({})", r.coordinate, r.exceptions.join("; ")))
            .collect();
        if failures.is_empty() {
            Ok(results)
        } else {
            Err(TbxError::resolution(format!(
                "Could not resolve artifacts: {}",
                failures.join(", ")
            )))
        }
    }

    pub async fn find_newest_version(
        &self,
        coordinate: &Coordinate,
        allow_snapshots: bool,
    ) -> Result<Option<Version>> {
        let query = coordinate.with_version(ALL_VERSIONS);
        let versions = self
            .engine
            .resolve_version_range(&self.session, &query, &self.remote_repositories)
            .await
            .map_err(|e| match e {
                e @ TbxError::VersionRange { .. } => e,
                other => TbxError::VersionRange {
                    coordinate: query.to_string(),
                    reason: other.to_string(),
                },
            })?;

        let Some(highest) = versions.last() else {
            debug!("No versions found for {}", query);
            return Ok(None);
        };
        if allow_snapshots || !highest.is_snapshot() {
            return Ok(Some(highest.clone()));
        }
        Ok(versions.iter().rev().find(|v| !v.is_snapshot()).cloned())
    }

    /// Plugins published under the given groups, each at its newest stable
    /// version. Group metadata is always refetched.
    pub async fn list_available_plugins<I, S>(&self, group_ids: I) -> Result<Vec<Coordinate>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let session = self.session.with_update_policy(UpdatePolicy::Always);
        let mut processed: HashSet<String> = HashSet::new();
        let mut result = Vec::new();

        for group_id in group_ids {
            let group_id = group_id.as_ref();
            let metadata_results = self
                .engine
                .resolve_metadata(&session, group_id, &self.remote_repositories)
                .await;

            for metadata_result in metadata_results {
                let Some(file) = metadata_result.file.filter(|f| f.is_file()) else {
                    debug!(
                        "No plugin metadata for {} in {}",
                        group_id, metadata_result.repository.id
                    );
                    continue;
                };
                let metadata = match fs::read_to_string(&file)
                    .map_err(TbxError::from)
                    .and_then(|xml| RepositoryMetadata::parse(&xml))
                {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!("Skipping unreadable metadata {}: {}", file.display(), e);
                        continue;
                    }
                };

                for plugin in metadata.plugins {
                    if !processed.insert(format!("{}:{}", group_id, plugin.artifact_id)) {
                        continue;
                    }
                    let blueprint = Coordinate::new(group_id, &plugin.artifact_id, "0");
                    match self.find_newest_version(&blueprint, false).await {
                        Ok(Some(version)) => {
                            result.push(blueprint.with_version(version.as_str()))
                        }
                        Ok(None) => {
                            debug!("No stable version of {}, skipping", blueprint.group_artifact())
                        }
                        Err(e) => warn!(
                            "Skipping plugin {}: {}",
                            blueprint.group_artifact(),
                            e
                        ),
                    }
                }
            }
        }
        Ok(result)
    }
}

/// Drops direct children outside `scope`'s direct include set. TEST keeps
/// everything. Returns how many children were removed.
fn prune_direct_children(root: &mut DependencyNode, scope: ResolutionScope) -> usize {
    if scope == ResolutionScope::Test {
        return 0;
    }
    let removed = root.retain_children(|child| scope.includes_direct(child.scope()));
    if removed > 0 {
        debug!("Removed {} direct children outside {}", removed, scope);
    }
    removed
}

fn collection_error(request: &CollectRequest, scope: ResolutionScope, e: TbxError) -> TbxError {
    match e {
        e @ TbxError::GraphCollection { .. } => e,
        other => TbxError::GraphCollection {
            root: request.root.coordinate().to_string(),
            scope: scope.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(a: &str, scope: &str) -> DependencyNode {
        DependencyNode::new(Dependency::new(Coordinate::new("g", a, "1"), scope))
    }

    #[test]
    fn prune_keeps_only_direct_include() {
        let mut root = DependencyNode::root(Coordinate::new("g", "root", "1")).with_children(vec![
            child("c", "compile"),
            child("r", "runtime"),
            child("t", "test"),
        ]);
        assert_eq!(prune_direct_children(&mut root, ResolutionScope::Compile), 2);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].coordinate().artifact_id, "c");
    }

    #[test]
    fn prune_never_touches_test_scope() {
        let mut root = DependencyNode::root(Coordinate::new("g", "root", "1"))
            .with_children(vec![child("t", "test"), child("x", "import")]);
        assert_eq!(prune_direct_children(&mut root, ResolutionScope::Test), 0);
        assert_eq!(root.children.len(), 2);
    }
}
