use std::fmt;

use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;

/// Well-known dependency scope names.
pub mod scopes {
    pub const COMPILE: &str = "compile";
    pub const PROVIDED: &str = "provided";
    pub const RUNTIME: &str = "runtime";
    pub const SYSTEM: &str = "system";
    pub const TEST: &str = "test";
    pub const IMPORT: &str = "import";
}

/// A pattern removing matching artifacts from the subtree of a dependency.
/// Every field accepts `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default = "wildcard")]
    pub classifier: String,
    #[serde(default = "wildcard")]
    pub extension: String,
}

fn wildcard() -> String {
    "*".to_string()
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: wildcard(),
            extension: wildcard(),
        }
    }

    pub fn matches(&self, coordinate: &Coordinate) -> bool {
        fn field(pattern: &str, value: &str) -> bool {
            pattern == "*" || pattern == value
        }
        field(&self.group_id, &coordinate.group_id)
            && field(&self.artifact_id, &coordinate.artifact_id)
            && field(&self.classifier, &coordinate.classifier)
            && field(&self.extension, &coordinate.extension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(coordinate: Coordinate, scope: impl Into<String>) -> Self {
        Self {
            coordinate,
            scope: scope.into(),
            optional: false,
            exclusions: Vec::new(),
        }
    }

    pub fn compile(coordinate: Coordinate) -> Self {
        Self::new(coordinate, scopes::COMPILE)
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Exclusion>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_coordinate(&self, coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            ..self.clone()
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.eq_ignore_ascii_case(scope)
    }

    pub fn is_test(&self) -> bool {
        self.has_scope(scopes::TEST)
    }

    pub fn versionless_id(&self) -> String {
        self.coordinate.versionless_id()
    }

    pub fn is_excluded_by(&self, exclusions: &[Exclusion]) -> bool {
        exclusions.iter().any(|e| e.matches(&self.coordinate))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coordinate)?;
        if !self.scope.is_empty() {
            write!(f, " ({}", self.scope)?;
            if self.optional {
                write!(f, ", optional")?;
            }
            write!(f, ")")?;
        } else if self.optional {
            write!(f, " (optional)")?;
        }
        Ok(())
    }
}

pub trait DependencyExt {
    fn without_test(&self) -> Vec<Dependency>;
    fn find_group_artifact(&self, group_artifact: &str) -> Option<&Dependency>;
}

impl DependencyExt for [Dependency] {
    fn without_test(&self) -> Vec<Dependency> {
        self.iter().filter(|d| !d.is_test()).cloned().collect()
    }

    fn find_group_artifact(&self, group_artifact: &str) -> Option<&Dependency> {
        self.iter()
            .find(|d| d.coordinate.group_artifact() == group_artifact)
    }
}
