//! The narrow interface to whatever actually collects graphs and moves files.
use async_trait::async_trait;

use crate::dependency::DependencyFilter;
use crate::error::Result;
use crate::model::{
    ArtifactDescriptor, ArtifactResult, CollectResult, Coordinate, Dependency, DependencyResult,
    MetadataResult, RemoteRepository, Version,
};

pub const REQUEST_CONTEXT: &str = "tbx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Honour cached metadata while it is fresh.
    #[default]
    Default,
    /// Always refetch remote metadata.
    Always,
    /// Never go remote for metadata that is cached.
    Never,
}

/// Per-call engine configuration. Operations derive their own copy, so no
/// call can observe another's tweaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig {
    /// Keep conflict losers and management details in collected graphs.
    pub verbose: bool,
    pub update_policy: UpdatePolicy,
}

impl SessionConfig {
    pub fn with_verbose(self, verbose: bool) -> Self {
        Self { verbose, ..self }
    }

    pub fn with_update_policy(self, update_policy: UpdatePolicy) -> Self {
        Self {
            update_policy,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectRoot {
    Artifact(Coordinate),
    Dependency(Dependency),
}

impl CollectRoot {
    pub fn coordinate(&self) -> &Coordinate {
        match self {
            Self::Artifact(coordinate) => coordinate,
            Self::Dependency(dependency) => &dependency.coordinate,
        }
    }
}

impl From<Coordinate> for CollectRoot {
    fn from(coordinate: Coordinate) -> Self {
        Self::Artifact(coordinate)
    }
}

impl From<Dependency> for CollectRoot {
    fn from(dependency: Dependency) -> Self {
        Self::Dependency(dependency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
    pub root: CollectRoot,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
    pub context: String,
}

#[async_trait]
pub trait ResolverEngine: Send + Sync {
    async fn read_descriptor(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<ArtifactDescriptor>;

    async fn collect_dependencies(
        &self,
        session: &SessionConfig,
        request: &CollectRequest,
    ) -> Result<CollectResult>;

    /// Collects and resolves every node `filter` accepts. Failed files are
    /// reported as `TbxError::Resolution` carrying the partial result.
    async fn resolve_dependencies(
        &self,
        session: &SessionConfig,
        request: &CollectRequest,
        filter: DependencyFilter,
    ) -> Result<DependencyResult>;

    /// One result per requested coordinate, in request order. Failures are
    /// reported per entry, never for the call as a whole.
    async fn resolve_artifacts(
        &self,
        session: &SessionConfig,
        coordinates: &[Coordinate],
        repositories: &[RemoteRepository],
    ) -> Vec<ArtifactResult>;

    /// Versions matching the coordinate's version range, ascending.
    async fn resolve_version_range(
        &self,
        session: &SessionConfig,
        coordinate: &Coordinate,
        repositories: &[RemoteRepository],
    ) -> Result<Vec<Version>>;

    /// Group-level metadata, one result per repository.
    async fn resolve_metadata(
        &self,
        session: &SessionConfig,
        group_id: &str,
        repositories: &[RemoteRepository],
    ) -> Vec<MetadataResult>;
}
