use serde::Serialize;

use super::merge::merge_dependencies;
use crate::model::{ArtifactDescriptor, Coordinate, Dependency};

/// A root whose descriptor has not been read yet. Anything the caller
/// supplied up front dominates what the descriptor later contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRoot {
    coordinate: Coordinate,
    dependencies: Vec<Dependency>,
    managed_dependencies: Vec<Dependency>,
}

impl RawRoot {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_managed_dependencies(mut self, managed: Vec<Dependency>) -> Self {
        self.managed_dependencies = managed;
        self
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn load(self, descriptor: ArtifactDescriptor) -> LoadedRoot {
        LoadedRoot {
            dependencies: merge_dependencies(self.dependencies, descriptor.dependencies),
            managed_dependencies: merge_dependencies(
                self.managed_dependencies,
                descriptor.managed_dependencies,
            ),
            coordinate: self.coordinate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRoot {
    coordinate: Coordinate,
    dependencies: Vec<Dependency>,
    managed_dependencies: Vec<Dependency>,
}

impl LoadedRoot {
    /// A root whose dependency data is already known; no descriptor is read.
    pub fn new(
        coordinate: Coordinate,
        dependencies: Vec<Dependency>,
        managed_dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            coordinate,
            dependencies,
            managed_dependencies,
        }
    }

    pub fn prepare(self) -> PreparedRoot {
        PreparedRoot {
            coordinate: self.coordinate,
            dependencies: self.dependencies,
            managed_dependencies: self.managed_dependencies,
        }
    }
}

/// Frozen root, ready for collection or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedRoot {
    coordinate: Coordinate,
    dependencies: Vec<Dependency>,
    managed_dependencies: Vec<Dependency>,
}

impl PreparedRoot {
    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn managed_dependencies(&self) -> &[Dependency] {
        &self.managed_dependencies
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionRoot {
    Raw(RawRoot),
    Loaded(LoadedRoot),
    Prepared(PreparedRoot),
}

impl ResolutionRoot {
    pub fn coordinate(&self) -> &Coordinate {
        match self {
            Self::Raw(root) => &root.coordinate,
            Self::Loaded(root) => &root.coordinate,
            Self::Prepared(root) => &root.coordinate,
        }
    }
}

impl From<RawRoot> for ResolutionRoot {
    fn from(root: RawRoot) -> Self {
        Self::Raw(root)
    }
}

impl From<LoadedRoot> for ResolutionRoot {
    fn from(root: LoadedRoot) -> Self {
        Self::Loaded(root)
    }
}

impl From<PreparedRoot> for ResolutionRoot {
    fn from(root: PreparedRoot) -> Self {
        Self::Prepared(root)
    }
}

impl From<Coordinate> for ResolutionRoot {
    fn from(coordinate: Coordinate) -> Self {
        Self::Raw(RawRoot::new(coordinate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(a: &str, v: &str) -> Dependency {
        Dependency::compile(Coordinate::new("g", a, v))
    }

    #[test]
    fn caller_supplied_entries_dominate_descriptor() {
        let root = RawRoot::new(Coordinate::new("g", "root", "1"))
            .with_managed_dependencies(vec![dep("a", "2.0")]);
        let mut descriptor = ArtifactDescriptor::empty(Coordinate::new("g", "root", "1"));
        descriptor.dependencies = vec![dep("a", "1.0"), dep("b", "1.0")];
        descriptor.managed_dependencies = vec![dep("a", "1.5"), dep("c", "3.0")];

        let prepared = root.load(descriptor).prepare();
        assert_eq!(prepared.dependencies().len(), 2);
        let managed: Vec<&str> = prepared
            .managed_dependencies()
            .iter()
            .map(|d| d.coordinate.version.as_str())
            .collect();
        assert_eq!(managed, ["2.0", "3.0"]);
    }

    #[test]
    fn prepared_root_never_lacks_sequences() {
        let prepared = RawRoot::new(Coordinate::new("g", "root", "1"))
            .load(ArtifactDescriptor::empty(Coordinate::new("g", "root", "1")))
            .prepare();
        assert!(prepared.dependencies().is_empty());
        assert!(prepared.managed_dependencies().is_empty());
    }
}
