// In-memory engine double for orchestrator tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tbx_common::dependency::DependencyFilter;
use tbx_common::engine::{CollectRequest, ResolverEngine, SessionConfig};
use tbx_common::error::{Result, TbxError};
use tbx_common::model::{
    ArtifactDescriptor, ArtifactResult, CollectResult, Coordinate, Dependency, DependencyNode,
    DependencyResult, MetadataResult, RemoteRepository, Version,
};

#[derive(Debug, Default)]
pub struct Calls {
    pub descriptor_reads: Vec<Coordinate>,
    pub collect_requests: Vec<CollectRequest>,
    pub sessions: Vec<SessionConfig>,
    pub version_queries: Vec<Coordinate>,
    pub filters: Vec<DependencyFilter>,
}

#[derive(Default)]
pub struct FakeEngine {
    pub descriptors: HashMap<String, ArtifactDescriptor>,
    /// Children the engine hands back below the root of every graph.
    pub graph: Vec<DependencyNode>,
    pub versions: HashMap<String, Vec<&'static str>>,
    pub metadata: HashMap<String, Vec<Option<PathBuf>>>,
    pub missing_files: HashSet<String>,
    /// `group:artifact` pairs whose version queries fail.
    pub broken_versions: HashSet<String>,
    pub calls: Mutex<Calls>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_descriptor(mut self, gav: &str, descriptor: ArtifactDescriptor) -> Self {
        self.descriptors.insert(gav.to_string(), descriptor);
        self
    }

    pub fn with_graph(mut self, children: Vec<DependencyNode>) -> Self {
        self.graph = children;
        self
    }

    pub fn with_versions(mut self, group_artifact: &str, versions: Vec<&'static str>) -> Self {
        self.versions.insert(group_artifact.to_string(), versions);
        self
    }

    pub fn with_metadata(mut self, group_id: &str, files: Vec<Option<PathBuf>>) -> Self {
        self.metadata.insert(group_id.to_string(), files);
        self
    }

    pub fn with_missing_file(mut self, coordinate: &Coordinate) -> Self {
        self.missing_files.insert(coordinate.to_string());
        self
    }

    pub fn with_broken_versions(mut self, group_artifact: &str) -> Self {
        self.broken_versions.insert(group_artifact.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn record_session(&self, session: &SessionConfig) {
        self.calls.lock().unwrap().sessions.push(*session);
    }

    fn locate(&self, coordinate: &Coordinate) -> ArtifactResult {
        if self.missing_files.contains(&coordinate.to_string()) {
            ArtifactResult::failed(coordinate.clone(), vec![format!("{coordinate} not found")])
        } else {
            ArtifactResult::resolved(
                coordinate.clone(),
                PathBuf::from("/fake/repository").join(coordinate.repository_path()),
                Some("fake".to_string()),
            )
        }
    }
}

pub fn node(artifact_id: &str, scope: &str) -> DependencyNode {
    DependencyNode::new(dep(artifact_id, "1.0", scope))
}

pub fn dep(artifact_id: &str, version: &str, scope: &str) -> Dependency {
    Dependency::new(Coordinate::new("org.example", artifact_id, version), scope)
}

pub fn descriptor(
    coordinate: Coordinate,
    dependencies: Vec<Dependency>,
    managed: Vec<Dependency>,
) -> ArtifactDescriptor {
    ArtifactDescriptor {
        coordinate,
        dependencies,
        managed_dependencies: managed,
        repositories: Vec::new(),
    }
}

fn filter_tree(nodes: &[DependencyNode], filter: DependencyFilter, depth: usize) -> Vec<DependencyNode> {
    nodes
        .iter()
        .filter(|n| filter.accept_at(depth, &n.dependency))
        .map(|n| {
            let mut kept = n.clone();
            kept.children = filter_tree(&n.children, filter, depth + 1);
            kept
        })
        .collect()
}

#[async_trait]
impl ResolverEngine for FakeEngine {
    async fn read_descriptor(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        _repositories: &[RemoteRepository],
    ) -> Result<ArtifactDescriptor> {
        self.record_session(session);
        self.calls
            .lock()
            .unwrap()
            .descriptor_reads
            .push(coordinate.clone());
        self.descriptors
            .get(&coordinate.to_string())
            .cloned()
            .ok_or_else(|| TbxError::NotFound(format!("no descriptor for {coordinate}")))
    }

    async fn collect_dependencies(
        &self,
        session: &SessionConfig,
        request: &CollectRequest,
    ) -> Result<CollectResult> {
        self.record_session(session);
        self.calls
            .lock()
            .unwrap()
            .collect_requests
            .push(request.clone());
        Ok(CollectResult {
            root: DependencyNode::root(request.root.coordinate().clone())
                .with_children(self.graph.clone()),
        })
    }

    async fn resolve_dependencies(
        &self,
        session: &SessionConfig,
        request: &CollectRequest,
        filter: DependencyFilter,
    ) -> Result<DependencyResult> {
        self.calls.lock().unwrap().filters.push(filter);
        let collected = self.collect_dependencies(session, request).await?;
        let mut root = collected.root;
        root.children = filter_tree(&root.children, filter, 1);

        let mut artifact_results = Vec::new();
        root.for_each_descendant_mut(&mut |n| {
            let result = self.locate(n.coordinate());
            n.file = result.file.clone();
            artifact_results.push(result);
        });
        let result = DependencyResult {
            root,
            artifact_results,
        };
        if result.failures().is_empty() {
            Ok(result)
        } else {
            Err(TbxError::Resolution {
                message: "dependency files missing".to_string(),
                partial: Some(Box::new(result)),
            })
        }
    }

    async fn resolve_artifacts(
        &self,
        session: &SessionConfig,
        coordinates: &[Coordinate],
        _repositories: &[RemoteRepository],
    ) -> Vec<ArtifactResult> {
        self.record_session(session);
        coordinates.iter().map(|c| self.locate(c)).collect()
    }

    async fn resolve_version_range(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        _repositories: &[RemoteRepository],
    ) -> Result<Vec<Version>> {
        self.record_session(session);
        self.calls
            .lock()
            .unwrap()
            .version_queries
            .push(coordinate.clone());
        if self.broken_versions.contains(&coordinate.group_artifact()) {
            return Err(TbxError::VersionRange {
                coordinate: coordinate.to_string(),
                reason: "metadata unavailable".to_string(),
            });
        }
        let mut versions: Vec<Version> = self
            .versions
            .get(&coordinate.group_artifact())
            .map(|vs| vs.iter().map(|v| Version::parse(v)).collect())
            .unwrap_or_default();
        versions.sort();
        Ok(versions)
    }

    async fn resolve_metadata(
        &self,
        session: &SessionConfig,
        group_id: &str,
        repositories: &[RemoteRepository],
    ) -> Vec<MetadataResult> {
        self.record_session(session);
        let files = self.metadata.get(group_id).cloned().unwrap_or_default();
        repositories
            .iter()
            .enumerate()
            .map(|(idx, repo)| match files.get(idx).cloned().flatten() {
                Some(file) => MetadataResult::found(group_id, repo.clone(), file),
                None => MetadataResult::missing(group_id, repo.clone(), None),
            })
            .collect()
    }
}
