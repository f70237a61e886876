// tbx-common/src/model/mod.rs
pub mod coordinate;
pub mod dependency;
pub mod descriptor;
pub mod graph;
pub mod metadata;
pub mod repository;
pub mod version;

// Re-export
pub use coordinate::Coordinate;
pub use dependency::{scopes, Dependency, DependencyExt, Exclusion};
pub use descriptor::ArtifactDescriptor;
pub use graph::{ArtifactResult, CollectResult, DependencyNode, DependencyResult};
pub use metadata::{MetadataResult, PluginEntry, RepositoryMetadata, SnapshotInfo};
pub use repository::RemoteRepository;
pub use version::{Version, VersionRange};
