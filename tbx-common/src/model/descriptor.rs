use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;
use super::dependency::Dependency;
use super::repository::RemoteRepository;

/// What the engine knows about an artifact from its descriptor (POM).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub managed_dependencies: Vec<Dependency>,
    /// Repositories the descriptor itself declares.
    #[serde(default)]
    pub repositories: Vec<RemoteRepository>,
}

impl ArtifactDescriptor {
    pub fn empty(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            repositories: Vec::new(),
        }
    }
}
