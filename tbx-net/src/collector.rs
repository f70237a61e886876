// tbx-net/src/collector.rs
// Breadth-first dependency graph collection. The first occurrence of a
// versionless identity wins, so nearer declarations beat deeper ones and
// earlier siblings beat later ones.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use tbx_common::dependency::merge_dependencies;
use tbx_common::engine::{CollectRequest, CollectRoot};
use tbx_common::error::{Result, TbxError};
use tbx_common::model::{
    scopes, ArtifactDescriptor, Coordinate, Dependency, DependencyNode, Exclusion,
    RemoteRepository, Version, VersionRange,
};
use tracing::{debug, warn};

/// Where the collector gets descriptors and range candidates from.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    async fn descriptor(
        &self,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<ArtifactDescriptor>;

    /// Versions inside the coordinate's version range, ascending.
    async fn versions(
        &self,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<Vec<Version>>;
}

struct Slot {
    dependency: Dependency,
    children: Vec<usize>,
    omitted_for: Option<String>,
}

struct Pending {
    slot: usize,
    exclusions: Vec<Exclusion>,
}

/// Scope a transitive dependency ends up with below a parent of
/// `parent_scope`.
pub fn derive_scope(parent_scope: &str, declared: &str) -> String {
    let declared = if declared.is_empty() {
        scopes::COMPILE
    } else {
        declared
    };
    let parent = parent_scope.to_ascii_lowercase();
    match parent.as_str() {
        scopes::TEST | scopes::PROVIDED | scopes::SYSTEM => parent,
        scopes::RUNTIME if declared.eq_ignore_ascii_case(scopes::COMPILE) => {
            scopes::RUNTIME.to_string()
        }
        _ => declared.to_string(),
    }
}

pub struct Collector<'a, S: DescriptorSource + ?Sized> {
    source: &'a S,
    verbose: bool,
    managed: HashMap<String, Dependency>,
    arena: Vec<Slot>,
    winners: HashMap<String, String>,
    repositories: Vec<RemoteRepository>,
}

impl<'a, S: DescriptorSource + ?Sized> Collector<'a, S> {
    pub fn new(source: &'a S, verbose: bool) -> Self {
        Self {
            source,
            verbose,
            managed: HashMap::new(),
            arena: Vec::new(),
            winners: HashMap::new(),
            repositories: Vec::new(),
        }
    }

    pub async fn collect(mut self, request: &CollectRequest) -> Result<DependencyNode> {
        self.repositories = request.repositories.clone();
        let (root, direct, managed) = match &request.root {
            CollectRoot::Artifact(coordinate) => (
                Dependency::new(coordinate.clone(), ""),
                request.dependencies.clone(),
                request.managed_dependencies.clone(),
            ),
            CollectRoot::Dependency(dependency) => {
                let descriptor = self
                    .source
                    .descriptor(&dependency.coordinate, &self.repositories)
                    .await?;
                for repository in descriptor.repositories {
                    if !self.repositories.iter().any(|r| r.id == repository.id) {
                        self.repositories.push(repository);
                    }
                }
                (
                    dependency.clone(),
                    merge_dependencies(request.dependencies.clone(), descriptor.dependencies),
                    merge_dependencies(
                        request.managed_dependencies.clone(),
                        descriptor.managed_dependencies,
                    ),
                )
            }
        };
        for rule in managed {
            self.managed.entry(rule.versionless_id()).or_insert(rule);
        }
        debug!(
            "Collecting {} with {} direct dependencies",
            root.coordinate,
            direct.len()
        );

        self.winners
            .insert(root.versionless_id(), root.coordinate.version.clone());
        let root_exclusions = root.exclusions.clone();
        self.arena.push(Slot {
            dependency: root,
            children: Vec::new(),
            omitted_for: None,
        });

        let mut level = Vec::new();
        for dependency in direct {
            let Some(dependency) = self.pin_version(dependency).await? else {
                continue;
            };
            if let Some(pending) = self.admit(0, dependency, &root_exclusions) {
                level.push(pending);
            }
        }

        while !level.is_empty() {
            level = self.expand(level).await?;
        }
        self.into_tree()
    }

    /// Reads the descriptors of one breadth level concurrently and admits
    /// their dependencies in declaration order.
    async fn expand(&mut self, level: Vec<Pending>) -> Result<Vec<Pending>> {
        let coordinates: Vec<Coordinate> = level
            .iter()
            .map(|p| self.arena[p.slot].dependency.coordinate.clone())
            .collect();
        let source = self.source;
        let repositories = self.repositories.clone();
        let descriptors = join_all(
            coordinates
                .iter()
                .map(|c| source.descriptor(c, &repositories)),
        )
        .await;

        let mut next = Vec::new();
        for ((pending, coordinate), descriptor) in level.into_iter().zip(coordinates).zip(descriptors) {
            let descriptor = match descriptor {
                Ok(descriptor) => descriptor,
                Err(TbxError::NotFound(reason)) => {
                    warn!(
                        "The POM for {} is missing, no dependency information available ({})",
                        coordinate, reason
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            let parent = &self.arena[pending.slot].dependency;
            let parent_scope = parent.scope.clone();
            let mut exclusions = pending.exclusions.clone();
            exclusions.extend(parent.exclusions.iter().cloned());

            for declared in descriptor.dependencies {
                if declared.optional
                    || declared.has_scope(scopes::TEST)
                    || declared.has_scope(scopes::PROVIDED)
                {
                    continue;
                }
                if declared.is_excluded_by(&exclusions) {
                    debug!("{} excluded below {}", declared.coordinate, coordinate);
                    continue;
                }
                let mut dependency = self.manage(declared);
                dependency.scope = derive_scope(&parent_scope, &dependency.scope);
                let Some(dependency) = self.pin_version(dependency).await? else {
                    continue;
                };
                if let Some(admitted) = self.admit(pending.slot, dependency, &exclusions) {
                    next.push(admitted);
                }
            }
        }
        Ok(next)
    }

    /// Applies dependency management to a transitive dependency.
    fn manage(&self, mut dependency: Dependency) -> Dependency {
        if let Some(rule) = self.managed.get(&dependency.versionless_id()) {
            if !rule.coordinate.version.is_empty() {
                dependency.coordinate.version = rule.coordinate.version.clone();
            }
            if !rule.scope.is_empty() {
                dependency.scope = rule.scope.clone();
            }
            dependency.exclusions.extend(rule.exclusions.iter().cloned());
        }
        dependency
    }

    /// Turns version ranges into the highest matching version. Dependencies
    /// without any version are dropped with a warning.
    async fn pin_version(&self, mut dependency: Dependency) -> Result<Option<Dependency>> {
        let version = dependency.coordinate.version.clone();
        if version.is_empty() {
            warn!("No version for {}, skipping", dependency.coordinate.group_artifact());
            return Ok(None);
        }
        if !VersionRange::is_range(&version) {
            return Ok(Some(dependency));
        }
        let candidates = self
            .source
            .versions(&dependency.coordinate, &self.repositories)
            .await?;
        match candidates.last() {
            Some(highest) => {
                debug!("Range {} of {} pinned to {}", version, dependency.coordinate.group_artifact(), highest);
                dependency.coordinate.version = highest.as_str().to_string();
                Ok(Some(dependency))
            }
            None => Err(TbxError::VersionRange {
                coordinate: dependency.coordinate.to_string(),
                reason: "no version satisfies the range".to_string(),
            }),
        }
    }

    fn admit(&mut self, parent: usize, dependency: Dependency, exclusions: &[Exclusion]) -> Option<Pending> {
        let id = dependency.versionless_id();
        if let Some(winner) = self.winners.get(&id) {
            if self.verbose {
                let reason = if winner == &dependency.coordinate.version {
                    "duplicate".to_string()
                } else {
                    format!("conflict with {winner}")
                };
                let slot = self.push(parent, dependency);
                self.arena[slot].omitted_for = Some(reason);
            }
            return None;
        }
        self.winners.insert(id, dependency.coordinate.version.clone());
        let slot = self.push(parent, dependency);
        Some(Pending {
            slot,
            exclusions: exclusions.to_vec(),
        })
    }

    fn push(&mut self, parent: usize, dependency: Dependency) -> usize {
        let slot = self.arena.len();
        self.arena.push(Slot {
            dependency,
            children: Vec::new(),
            omitted_for: None,
        });
        self.arena[parent].children.push(slot);
        slot
    }

    /// Children always sit after their parent in the arena, so one reverse
    /// pass assembles the tree.
    fn into_tree(self) -> Result<DependencyNode> {
        let mut nodes: Vec<Option<DependencyNode>> = Vec::with_capacity(self.arena.len());
        nodes.resize_with(self.arena.len(), || None);
        for (index, slot) in self.arena.into_iter().enumerate().rev() {
            let children = slot
                .children
                .iter()
                .filter_map(|&c| nodes[c].take())
                .collect();
            let mut node = DependencyNode::new(slot.dependency).with_children(children);
            node.omitted_for = slot.omitted_for;
            nodes[index] = Some(node);
        }
        nodes
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| TbxError::Generic("Collected graph has no root".to_string()))
    }
}

pub async fn collect<S: DescriptorSource + ?Sized>(
    source: &S,
    request: &CollectRequest,
    verbose: bool,
) -> Result<DependencyNode> {
    Collector::new(source, verbose).collect(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbx_common::engine::REQUEST_CONTEXT;

    #[derive(Default)]
    struct MapSource {
        descriptors: HashMap<String, Vec<Dependency>>,
        versions: HashMap<String, Vec<&'static str>>,
    }

    impl MapSource {
        fn with(mut self, artifact: &str, deps: Vec<Dependency>) -> Self {
            self.descriptors.insert(artifact.to_string(), deps);
            self
        }
    }

    #[async_trait]
    impl DescriptorSource for MapSource {
        async fn descriptor(
            &self,
            coordinate: &Coordinate,
            _repositories: &[RemoteRepository],
        ) -> Result<ArtifactDescriptor> {
            let key = format!("{}:{}", coordinate.artifact_id, coordinate.version);
            let deps = self
                .descriptors
                .get(&key)
                .cloned()
                .ok_or(TbxError::NotFound(key))?;
            let mut descriptor = ArtifactDescriptor::empty(coordinate.clone());
            descriptor.dependencies = deps;
            Ok(descriptor)
        }

        async fn versions(
            &self,
            coordinate: &Coordinate,
            _repositories: &[RemoteRepository],
        ) -> Result<Vec<Version>> {
            let range = VersionRange::parse(&coordinate.version)?;
            let mut versions: Vec<Version> = self
                .versions
                .get(&coordinate.artifact_id)
                .into_iter()
                .flatten()
                .map(|v| Version::parse(v))
                .filter(|v| range.contains(v))
                .collect();
            versions.sort();
            Ok(versions)
        }
    }

    fn dep(artifact: &str, version: &str, scope: &str) -> Dependency {
        Dependency::new(Coordinate::new("g", artifact, version), scope)
    }

    fn request(dependencies: Vec<Dependency>, managed: Vec<Dependency>) -> CollectRequest {
        CollectRequest {
            root: CollectRoot::Artifact(Coordinate::new("g", "root", "1")),
            dependencies,
            managed_dependencies: managed,
            repositories: Vec::new(),
            context: REQUEST_CONTEXT.to_string(),
        }
    }

    fn render(node: &DependencyNode, depth: usize, out: &mut Vec<String>) {
        for child in &node.children {
            let mut line = format!(
                "{}{}:{}:{}",
                "  ".repeat(depth),
                child.coordinate().artifact_id,
                child.coordinate().version,
                child.scope()
            );
            if let Some(reason) = &child.omitted_for {
                line.push_str(&format!(" ({reason})"));
            }
            out.push(line);
            render(child, depth + 1, out);
        }
    }

    fn lines(node: &DependencyNode) -> Vec<String> {
        let mut out = Vec::new();
        render(node, 0, &mut out);
        out
    }

    #[test]
    fn scope_derivation_follows_parent() {
        assert_eq!(derive_scope("compile", "runtime"), "runtime");
        assert_eq!(derive_scope("runtime", "compile"), "runtime");
        assert_eq!(derive_scope("test", "compile"), "test");
        assert_eq!(derive_scope("provided", "runtime"), "provided");
        assert_eq!(derive_scope("compile", ""), "compile");
    }

    #[tokio::test]
    async fn nearest_declaration_wins() {
        let source = MapSource::default()
            .with("a:1", vec![dep("shared", "2", "compile"), dep("deep", "1", "runtime")])
            .with("b:1", vec![])
            .with("shared:1", vec![])
            .with("deep:1", vec![dep("shared", "3", "compile")]);
        let root = collect(
            &source,
            &request(
                vec![dep("a", "1", "compile"), dep("shared", "1", "compile"), dep("b", "1", "runtime")],
                vec![],
            ),
            false,
        )
        .await
        .unwrap();
        assert_eq!(
            lines(&root),
            ["a:1:compile", "  deep:1:runtime", "shared:1:compile", "b:1:runtime"]
        );
    }

    #[tokio::test]
    async fn verbose_keeps_losers_as_omitted_nodes() {
        let source = MapSource::default()
            .with("a:1", vec![dep("shared", "2", "compile")])
            .with("shared:1", vec![]);
        let root = collect(
            &source,
            &request(vec![dep("shared", "1", "compile"), dep("a", "1", "compile")], vec![]),
            true,
        )
        .await
        .unwrap();
        assert_eq!(
            lines(&root),
            ["shared:1:compile", "a:1:compile", "  shared:2:compile (conflict with 1)"]
        );
        assert!(root.children[1].children[0].is_omitted());
    }

    #[tokio::test]
    async fn transitive_test_optional_and_excluded_are_skipped() {
        let source = MapSource::default()
            .with(
                "a:1",
                vec![
                    dep("junit", "4", "test"),
                    dep("servlet", "3", "provided"),
                    dep("opt", "1", "compile").with_optional(true),
                    dep("logging", "1", "compile"),
                    dep("kept", "1", "runtime"),
                ],
            )
            .with("kept:1", vec![]);
        let direct = dep("a", "1", "compile").with_exclusions(vec![Exclusion::new("g", "logging")]);
        let root = collect(&source, &request(vec![direct], vec![]), false)
            .await
            .unwrap();
        assert_eq!(lines(&root), ["a:1:compile", "  kept:1:runtime"]);
    }

    #[tokio::test]
    async fn management_overrides_transitive_versions_only() {
        let source = MapSource::default()
            .with("a:1", vec![dep("lib", "1", "compile")])
            .with("lib:5", vec![]);
        let root = collect(
            &source,
            &request(vec![dep("a", "1", "runtime")], vec![dep("lib", "5", "")]),
            false,
        )
        .await
        .unwrap();
        assert_eq!(lines(&root), ["a:1:runtime", "  lib:5:runtime"]);
    }

    #[tokio::test]
    async fn ranges_pin_to_highest_match() {
        let mut source = MapSource::default().with("lib:1.5", vec![]);
        source.versions.insert("lib".to_string(), vec!["1.0", "1.5", "2.0"]);
        let root = collect(&source, &request(vec![dep("lib", "[1.0,2.0)", "compile")], vec![]), false)
            .await
            .unwrap();
        assert_eq!(lines(&root), ["lib:1.5:compile"]);

        let err = collect(&source, &request(vec![dep("lib", "[3,)", "compile")], vec![]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, TbxError::VersionRange { .. }));
    }

    #[tokio::test]
    async fn missing_descriptor_leaves_a_leaf() {
        let source = MapSource::default();
        let root = collect(&source, &request(vec![dep("ghost", "1", "compile")], vec![]), false)
            .await
            .unwrap();
        assert_eq!(lines(&root), ["ghost:1:compile"]);
        assert_eq!(root.scope(), "");
    }

    #[tokio::test]
    async fn dependency_root_merges_its_descriptor() {
        let source = MapSource::default()
            .with("app:1", vec![dep("lib", "1", "compile"), dep("extra", "1", "compile")])
            .with("lib:9", vec![])
            .with("extra:1", vec![]);
        let mut req = request(vec![dep("lib", "9", "compile")], vec![]);
        req.root = CollectRoot::Dependency(dep("app", "1", "compile"));
        let root = collect(&source, &req, false).await.unwrap();
        assert_eq!(root.scope(), "compile");
        assert_eq!(lines(&root), ["lib:9:compile", "extra:1:compile"]);
    }
}
