// tbx-net/src/engine.rs
// Maven 2 layout repositories over HTTP, with the local repository doubling
// as the artifact file cache.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};
use reqwest::Client;
use tbx_common::cache::Cache;
use tbx_common::config::Config;
use tbx_common::dependency::{BomImport, DependencyFilter};
use tbx_common::engine::{CollectRequest, ResolverEngine, SessionConfig, UpdatePolicy};
use tbx_common::error::{Result, TbxError};
use tbx_common::model::metadata::METADATA_FILE_NAME;
use tbx_common::model::{
    ArtifactDescriptor, ArtifactResult, CollectResult, Coordinate, DependencyNode,
    DependencyResult, MetadataResult, RemoteRepository, RepositoryMetadata, Version, VersionRange,
};
use tracing::{debug, warn};

use crate::collector::{self, DescriptorSource};
use crate::http::{build_http_client, download_and_verify, fetch_sha256, fetch_text};
use crate::pom::{EffectivePom, Pom};
use crate::validation::validate_url;

const MAX_PARENT_DEPTH: usize = 32;
const MAX_IMPORT_DEPTH: usize = 16;
const MAX_PARALLEL_DOWNLOADS: usize = 8;

pub struct MavenEngine {
    client: Client,
    local_repository: PathBuf,
    offline: bool,
    cache: Cache,
    /// Descriptors keyed by their POM coordinate.
    descriptors: Mutex<HashMap<Coordinate, ArtifactDescriptor>>,
}

impl MavenEngine {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            local_repository: config.local_repository().to_path_buf(),
            offline: config.offline,
            cache: Cache::new(config)?,
            descriptors: Mutex::new(HashMap::new()),
        })
    }

    pub fn local_repository(&self) -> &Path {
        &self.local_repository
    }

    fn local_path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.local_repository.clone(), |p, s| p.join(s))
    }

    /// Local copy of `coordinate`, downloading it from the first repository
    /// that has it. Only when every repository answered 404 is the error
    /// `TbxError::NotFound`.
    async fn fetch_file(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<(PathBuf, Option<String>)> {
        let target = self.local_path(&coordinate.repository_path());
        if target.is_file() {
            debug!("Using {} from the local repository", coordinate);
            return Ok((target, None));
        }
        if self.offline {
            return Err(TbxError::NotFound(format!(
                "{coordinate} is not in the local repository and offline mode is on"
            )));
        }

        let mut reasons = Vec::new();
        let mut only_missing = true;
        for repository in repositories {
            match self.download(session, coordinate, repository, &target).await {
                Ok(path) => return Ok((path, Some(repository.id.clone()))),
                Err(TbxError::NotFound(_)) => {
                    reasons.push(format!("not found in {}", repository.id));
                }
                Err(e) => {
                    warn!("Failed to fetch {} from {}: {}", coordinate, repository.id, e);
                    only_missing = false;
                    reasons.push(format!("{}: {}", repository.id, e));
                }
            }
        }
        let message = if reasons.is_empty() {
            format!("{coordinate}: no repositories configured")
        } else {
            format!("{coordinate}: {}", reasons.join("; "))
        };
        if only_missing {
            Err(TbxError::NotFound(message))
        } else {
            Err(TbxError::DownloadError(
                coordinate.file_name(),
                repositories
                    .iter()
                    .map(|r| r.url.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                message,
            ))
        }
    }

    async fn download(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repository: &RemoteRepository,
        target: &Path,
    ) -> Result<PathBuf> {
        let relative = if coordinate.is_snapshot() {
            self.snapshot_path(session, coordinate, repository).await?
        } else {
            coordinate.repository_path()
        };
        let url = repository.join(&relative);
        validate_url(&url)?;
        let sha256 = fetch_sha256(&self.client, &url).await;
        download_and_verify(&self.client, &url, target, sha256.as_deref()).await
    }

    /// Remote path of the newest deployment of a `-SNAPSHOT` artifact.
    async fn snapshot_path(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repository: &RemoteRepository,
    ) -> Result<String> {
        let relative = format!("{}/{}", coordinate.version_dir(), METADATA_FILE_NAME);
        let file = match self.metadata_file(session, repository, &relative).await {
            Ok(file) => file,
            Err(TbxError::NotFound(_)) => return Ok(coordinate.repository_path()),
            Err(e) => return Err(e),
        };
        let metadata = RepositoryMetadata::parse(&tokio::fs::read_to_string(&file).await?)?;
        Ok(match metadata.snapshot {
            Some(snapshot) => format!(
                "{}/{}",
                coordinate.version_dir(),
                coordinate
                    .with_version(snapshot.expand(&coordinate.version))
                    .file_name()
            ),
            None => coordinate.repository_path(),
        })
    }

    /// Cached copy of a repository metadata file, refetched according to the
    /// session's update policy.
    async fn metadata_file(
        &self,
        session: &SessionConfig,
        repository: &RemoteRepository,
        relative: &str,
    ) -> Result<PathBuf> {
        let cached = self.cache.path_for(&repository.id, relative);
        let fresh = match session.update_policy {
            UpdatePolicy::Always => false,
            UpdatePolicy::Never => cached.is_file(),
            UpdatePolicy::Default => self.cache.is_cache_valid(&repository.id, relative)?,
        };
        if fresh || (self.offline && cached.is_file()) {
            debug!("Using cached metadata {}", cached.display());
            return Ok(cached);
        }
        if self.offline {
            return Err(TbxError::NotFound(format!(
                "{relative} is not cached for {} and offline mode is on",
                repository.id
            )));
        }

        let url = repository.join(relative);
        validate_url(&url)?;
        match fetch_text(&self.client, &url).await? {
            Some(text) => self.cache.store_raw(&repository.id, relative, &text),
            None => Err(TbxError::NotFound(url)),
        }
    }

    async fn read_pom(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<Pom> {
        let (file, _) = self.fetch_file(session, coordinate, repositories).await?;
        let text = tokio::fs::read_to_string(&file).await?;
        Pom::parse(&text).map_err(|e| TbxError::DescriptorFetch {
            coordinate: coordinate.to_string(),
            reason: e.to_string(),
        })
    }

    fn cached_descriptor(&self, pom: &Coordinate) -> Option<ArtifactDescriptor> {
        self.descriptors
            .lock()
            .ok()
            .and_then(|cache| cache.get(pom).cloned())
    }

    fn descriptor_at<'a>(
        &'a self,
        session: &'a SessionConfig,
        coordinate: &'a Coordinate,
        repositories: &'a [RemoteRepository],
        import_depth: usize,
    ) -> BoxFuture<'a, Result<ArtifactDescriptor>> {
        async move {
            let pom_coordinate = coordinate.pom();
            if let Some(mut descriptor) = self.cached_descriptor(&pom_coordinate) {
                descriptor.coordinate = coordinate.clone();
                return Ok(descriptor);
            }
            if import_depth > MAX_IMPORT_DEPTH {
                return Err(TbxError::DescriptorFetch {
                    coordinate: coordinate.to_string(),
                    reason: "BOM imports nested too deeply".to_string(),
                });
            }
            debug!("Building descriptor of {}", pom_coordinate);

            let mut chain = Vec::new();
            let mut seen = HashSet::new();
            let mut next = Some(pom_coordinate.clone());
            while let Some(current) = next {
                if chain.len() >= MAX_PARENT_DEPTH || !seen.insert(current.clone()) {
                    return Err(TbxError::DescriptorFetch {
                        coordinate: coordinate.to_string(),
                        reason: format!("parent chain loops or is too deep at {current}"),
                    });
                }
                let pom = self.read_pom(session, &current, repositories).await?;
                next = pom.parent.clone();
                chain.push(pom);
            }

            let effective = EffectivePom::build(&chain).map_err(|e| TbxError::DescriptorFetch {
                coordinate: coordinate.to_string(),
                reason: e.to_string(),
            })?;
            let mut lookup = repositories.to_vec();
            for repository in &effective.repositories {
                if !lookup.iter().any(|r| r.id == repository.id) {
                    lookup.push(repository.clone());
                }
            }

            let mut import = BomImport::new();
            for bom in effective.bom_imports() {
                let bom_descriptor = self
                    .descriptor_at(session, &bom, &lookup, import_depth + 1)
                    .await?;
                import.absorb(&bom, bom_descriptor.managed_dependencies);
            }

            let descriptor = effective.into_descriptor(import.finish());
            if let Ok(mut cache) = self.descriptors.lock() {
                cache.insert(pom_coordinate, descriptor.clone());
            }
            Ok(ArtifactDescriptor {
                coordinate: coordinate.clone(),
                ..descriptor
            })
        }
        .boxed()
    }

    async fn artifact_result(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> ArtifactResult {
        match self.fetch_file(session, coordinate, repositories).await {
            Ok((file, repository)) => ArtifactResult::resolved(coordinate.clone(), file, repository),
            Err(e) => ArtifactResult::failed(coordinate.clone(), vec![e.to_string()]),
        }
    }

    async fn artifact_results(
        &self,
        session: &SessionConfig,
        coordinates: &[Coordinate],
        repositories: &[RemoteRepository],
    ) -> Vec<ArtifactResult> {
        let lookups: Vec<_> = coordinates
            .iter()
            .map(|c| self.artifact_result(session, c, repositories))
            .collect();
        stream::iter(lookups)
            .buffered(MAX_PARALLEL_DOWNLOADS)
            .collect::<Vec<_>>()
            .await
    }

    async fn collect_tree(
        &self,
        session: &SessionConfig,
        request: &CollectRequest,
    ) -> Result<DependencyNode> {
        let source = SessionSource {
            engine: self,
            session: *session,
        };
        collector::collect(&source, request, session.verbose).await
    }
}

/// Binds the engine to one session for the collector.
struct SessionSource<'a> {
    engine: &'a MavenEngine,
    session: SessionConfig,
}

#[async_trait]
impl DescriptorSource for SessionSource<'_> {
    async fn descriptor(
        &self,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<ArtifactDescriptor> {
        self.engine
            .descriptor_at(&self.session, coordinate, repositories, 0)
            .await
    }

    async fn versions(
        &self,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<Vec<Version>> {
        self.engine
            .resolve_version_range(&self.session, coordinate, repositories)
            .await
    }
}

/// Drops omitted nodes and everything `filter` rejects, subtrees included.
/// `depth` is that of `node`; the root is 0.
fn apply_filter(node: &mut DependencyNode, filter: DependencyFilter, depth: usize) {
    node.children
        .retain(|c| !c.is_omitted() && filter.accept_at(depth + 1, &c.dependency));
    for child in &mut node.children {
        apply_filter(child, filter, depth + 1);
    }
}

#[async_trait]
impl ResolverEngine for MavenEngine {
    async fn read_descriptor(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<ArtifactDescriptor> {
        self.descriptor_at(session, coordinate, repositories, 0).await
    }

    async fn collect_dependencies(
        &self,
        session: &SessionConfig,
        request: &CollectRequest,
    ) -> Result<CollectResult> {
        let root = self.collect_tree(session, request).await?;
        Ok(CollectResult { root })
    }

    async fn resolve_dependencies(
        &self,
        session: &SessionConfig,
        request: &CollectRequest,
        filter: DependencyFilter,
    ) -> Result<DependencyResult> {
        let mut root = self.collect_tree(session, request).await?;
        apply_filter(&mut root, filter, 0);

        let coordinates: Vec<Coordinate> = root
            .descendants()
            .into_iter()
            .map(|n| n.coordinate().clone())
            .collect();
        let artifact_results = self
            .artifact_results(session, &coordinates, &request.repositories)
            .await;

        let mut files = artifact_results.iter().map(|r| r.file.clone());
        root.for_each_descendant_mut(&mut |node| {
            node.file = files.next().flatten();
        });

        let result = DependencyResult {
            root,
            artifact_results,
        };
        let failures = result.failures();
        if failures.is_empty() {
            return Ok(result);
        }
        let message = format!(
            "Could not resolve {} of {} artifacts: {}",
            failures.len(),
            result.artifact_results.len(),
            failures
                .iter()
                .map(|f| f.coordinate.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Err(TbxError::Resolution {
            message,
            partial: Some(Box::new(result)),
        })
    }

    async fn resolve_artifacts(
        &self,
        session: &SessionConfig,
        coordinates: &[Coordinate],
        repositories: &[RemoteRepository],
    ) -> Vec<ArtifactResult> {
        self.artifact_results(session, coordinates, repositories)
            .await
    }

    async fn resolve_version_range(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<Vec<Version>> {
        let range = VersionRange::parse(&coordinate.version).map_err(|e| TbxError::VersionRange {
            coordinate: coordinate.to_string(),
            reason: e.to_string(),
        })?;
        let relative = format!(
            "{}/{}/{}",
            coordinate.group_id.replace('.', "/"),
            coordinate.artifact_id,
            METADATA_FILE_NAME
        );

        let mut listed: Vec<String> = Vec::new();
        let local = self.local_path(&relative.replace(METADATA_FILE_NAME, "maven-metadata-local.xml"));
        if local.is_file() {
            match std::fs::read_to_string(&local)
                .map_err(TbxError::from)
                .and_then(|xml| RepositoryMetadata::parse(&xml))
            {
                Ok(metadata) => listed.extend(metadata.versions),
                Err(e) => warn!("Ignoring unreadable {}: {}", local.display(), e),
            }
        }
        for repository in repositories {
            let file = match self.metadata_file(session, repository, &relative).await {
                Ok(file) => file,
                Err(TbxError::NotFound(_)) => {
                    debug!("No versions of {} in {}", coordinate.group_artifact(), repository.id);
                    continue;
                }
                Err(e) => {
                    warn!("Could not read versions of {} from {}: {}", coordinate.group_artifact(), repository.id, e);
                    continue;
                }
            };
            match tokio::fs::read_to_string(&file)
                .await
                .map_err(TbxError::from)
                .and_then(|xml| RepositoryMetadata::parse(&xml))
            {
                Ok(metadata) => listed.extend(metadata.versions),
                Err(e) => warn!("Ignoring unreadable {}: {}", file.display(), e),
            }
        }

        // `1` and `1.0` order equal but are distinct releases
        let mut seen = HashSet::new();
        let mut versions: Vec<Version> = listed
            .iter()
            .filter(|v| seen.insert(v.as_str()))
            .map(|v| Version::parse(v))
            .filter(|v| range.contains(v))
            .collect();
        versions.sort();
        debug!(
            "{} versions of {} match {}",
            versions.len(),
            coordinate.group_artifact(),
            coordinate.version
        );
        Ok(versions)
    }

    async fn resolve_metadata(
        &self,
        session: &SessionConfig,
        group_id: &str,
        repositories: &[RemoteRepository],
    ) -> Vec<MetadataResult> {
        let relative = format!("{}/{}", group_id.replace('.', "/"), METADATA_FILE_NAME);
        let mut results = Vec::with_capacity(repositories.len());
        for repository in repositories {
            let result = match self.metadata_file(session, repository, &relative).await {
                Ok(file) => MetadataResult::found(group_id, repository.clone(), file),
                Err(TbxError::NotFound(_)) => MetadataResult::missing(group_id, repository.clone(), None),
                Err(e) => {
                    debug!("Metadata of {} unavailable from {}: {}", group_id, repository.id, e);
                    MetadataResult::missing(group_id, repository.clone(), Some(e.to_string()))
                }
            };
            results.push(result);
        }
        results
    }
}
