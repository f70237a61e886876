use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::TbxError;
use crate::model::dependency::{scopes, Dependency};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ScopeSet: u8 {
        const COMPILE  = 0b00000001;
        const PROVIDED = 0b00000010;
        const RUNTIME  = 0b00000100;
        const SYSTEM   = 0b00001000;
        const TEST     = 0b00010000;
    }
}

impl ScopeSet {
    /// Maps a free-form scope name; unknown names map to the empty set.
    pub fn from_scope_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            scopes::COMPILE => Self::COMPILE,
            scopes::PROVIDED => Self::PROVIDED,
            scopes::RUNTIME => Self::RUNTIME,
            scopes::SYSTEM => Self::SYSTEM,
            scopes::TEST => Self::TEST,
            _ => Self::empty(),
        }
    }

    pub fn contains_scope(&self, name: &str) -> bool {
        let flag = Self::from_scope_name(name);
        !flag.is_empty() && self.contains(flag)
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::COMPILE, scopes::COMPILE),
            (Self::PROVIDED, scopes::PROVIDED),
            (Self::RUNTIME, scopes::RUNTIME),
            (Self::SYSTEM, scopes::SYSTEM),
            (Self::TEST, scopes::TEST),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Decides which nodes below the root take part in file resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyFilter {
    AcceptAll,
    RejectAll,
    Scopes(ScopeSet),
    /// `transitive` everywhere, and the root's direct children must also
    /// be in `direct`.
    Layered {
        direct: ScopeSet,
        transitive: ScopeSet,
    },
}

impl DependencyFilter {
    pub fn accept(&self, dependency: &Dependency) -> bool {
        match self {
            Self::AcceptAll => true,
            Self::RejectAll => false,
            Self::Scopes(set) | Self::Layered { transitive: set, .. } => {
                set.contains_scope(&dependency.scope)
            }
        }
    }

    /// Like [`accept`](Self::accept) for a node `depth` levels below the
    /// root; direct children sit at depth 1.
    pub fn accept_at(&self, depth: usize, dependency: &Dependency) -> bool {
        match self {
            Self::Layered { direct, .. } if depth == 1 => {
                direct.contains_scope(&dependency.scope) && self.accept(dependency)
            }
            _ => self.accept(dependency),
        }
    }
}

/// Resolution scopes modelled on Maven mojo dependency resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionScope {
    None,
    Compile,
    CompilePlusRuntime,
    Runtime,
    RuntimePlusSystem,
    Test,
}

impl ResolutionScope {
    pub const ALL: [ResolutionScope; 6] = [
        Self::None,
        Self::Compile,
        Self::CompilePlusRuntime,
        Self::Runtime,
        Self::RuntimePlusSystem,
        Self::Test,
    ];

    /// Whether test-scoped dependencies are dropped before collection.
    pub fn eliminate_test(&self) -> bool {
        !matches!(self, Self::Test)
    }

    /// Scopes kept among the root's direct children when not verbose.
    pub fn direct_include(&self) -> ScopeSet {
        match self {
            Self::None => ScopeSet::empty(),
            Self::Compile => ScopeSet::COMPILE,
            Self::CompilePlusRuntime => ScopeSet::COMPILE | ScopeSet::RUNTIME,
            Self::Runtime => ScopeSet::RUNTIME,
            Self::RuntimePlusSystem => ScopeSet::RUNTIME | ScopeSet::SYSTEM,
            Self::Test => ScopeSet::all(),
        }
    }

    /// Direct-children pruning never applies to TEST.
    pub fn includes_direct(&self, scope: &str) -> bool {
        matches!(self, Self::Test) || self.direct_include().contains_scope(scope)
    }

    /// Filter the engine applies to every node below the root.
    pub fn dependency_filter(&self) -> DependencyFilter {
        match self {
            Self::None => DependencyFilter::RejectAll,
            Self::Compile => {
                DependencyFilter::Scopes(ScopeSet::COMPILE | ScopeSet::SYSTEM | ScopeSet::PROVIDED)
            }
            Self::CompilePlusRuntime => DependencyFilter::Scopes(
                ScopeSet::COMPILE | ScopeSet::SYSTEM | ScopeSet::PROVIDED | ScopeSet::RUNTIME,
            ),
            Self::Runtime => DependencyFilter::Scopes(ScopeSet::COMPILE | ScopeSet::RUNTIME),
            Self::RuntimePlusSystem => {
                DependencyFilter::Scopes(ScopeSet::COMPILE | ScopeSet::RUNTIME | ScopeSet::SYSTEM)
            }
            Self::Test => DependencyFilter::AcceptAll,
        }
    }

    /// Transitive filter combined with direct-child pruning, so that pruned
    /// children never reach file resolution.
    pub fn resolution_filter(&self) -> DependencyFilter {
        match self.dependency_filter() {
            DependencyFilter::Scopes(transitive) => DependencyFilter::Layered {
                direct: self.direct_include(),
                transitive,
            },
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Compile => "COMPILE",
            Self::CompilePlusRuntime => "COMPILE_PLUS_RUNTIME",
            Self::Runtime => "RUNTIME",
            Self::RuntimePlusSystem => "RUNTIME_PLUS_SYSTEM",
            Self::Test => "TEST",
        }
    }
}

impl Default for ResolutionScope {
    fn default() -> Self {
        Self::Runtime
    }
}

impl fmt::Display for ResolutionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResolutionScope {
    type Err = TbxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['+', '-'], "_");
        match normalized.as_str() {
            "none" => Ok(Self::None),
            "compile" => Ok(Self::Compile),
            "compile_plus_runtime" | "compile_runtime" => Ok(Self::CompilePlusRuntime),
            "runtime" => Ok(Self::Runtime),
            "runtime_plus_system" | "runtime_system" => Ok(Self::RuntimePlusSystem),
            "test" => Ok(Self::Test),
            _ => Err(TbxError::Config(format!(
                "Unknown resolution scope '{s}' (expected one of none, compile, compile+runtime, runtime, runtime+system, test)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinate;

    fn dep(scope: &str) -> Dependency {
        Dependency::new(Coordinate::new("g", "a", "1"), scope)
    }

    #[test]
    fn only_test_keeps_test_dependencies() {
        for scope in ResolutionScope::ALL {
            assert_eq!(scope.eliminate_test(), scope != ResolutionScope::Test, "{scope}");
        }
    }

    #[test]
    fn direct_include_table() {
        assert_eq!(ResolutionScope::None.direct_include(), ScopeSet::empty());
        assert_eq!(ResolutionScope::Compile.direct_include(), ScopeSet::COMPILE);
        assert_eq!(
            ResolutionScope::CompilePlusRuntime.direct_include(),
            ScopeSet::COMPILE | ScopeSet::RUNTIME
        );
        assert_eq!(ResolutionScope::Runtime.direct_include(), ScopeSet::RUNTIME);
        assert_eq!(
            ResolutionScope::RuntimePlusSystem.direct_include(),
            ScopeSet::RUNTIME | ScopeSet::SYSTEM
        );
        assert!(ResolutionScope::Test.includes_direct("import"));
    }

    #[test]
    fn scope_names_are_case_insensitive() {
        assert!(ResolutionScope::Compile.includes_direct("COMPILE"));
        assert!(!ResolutionScope::Compile.includes_direct("runtime"));
        assert!(!ResolutionScope::Compile.includes_direct(""));
    }

    #[test]
    fn transitive_filters() {
        assert!(!ResolutionScope::None.dependency_filter().accept(&dep("compile")));
        let compile = ResolutionScope::Compile.dependency_filter();
        assert!(compile.accept(&dep("provided")));
        assert!(!compile.accept(&dep("runtime")));
        let runtime = ResolutionScope::Runtime.dependency_filter();
        assert!(runtime.accept(&dep("compile")));
        assert!(!runtime.accept(&dep("provided")));
        assert!(!runtime.accept(&dep("system")));
        assert!(ResolutionScope::RuntimePlusSystem
            .dependency_filter()
            .accept(&dep("system")));
        assert!(ResolutionScope::Test.dependency_filter().accept(&dep("whatever")));
    }

    #[test]
    fn resolution_filter_prunes_direct_children_only() {
        let compile = ResolutionScope::Compile.resolution_filter();
        assert!(!compile.accept_at(1, &dep("provided")));
        assert!(compile.accept_at(2, &dep("provided")));
        assert!(compile.accept_at(1, &dep("compile")));
        assert!(!compile.accept_at(2, &dep("runtime")));

        let test = ResolutionScope::Test.resolution_filter();
        assert!(test.accept_at(1, &dep("import")));
        assert!(!ResolutionScope::None.resolution_filter().accept_at(1, &dep("compile")));
    }

    #[test]
    fn parses_scope_names() {
        assert_eq!("compile+runtime".parse::<ResolutionScope>().unwrap(), ResolutionScope::CompilePlusRuntime);
        assert_eq!("RUNTIME_PLUS_SYSTEM".parse::<ResolutionScope>().unwrap(), ResolutionScope::RuntimePlusSystem);
        assert!("bogus".parse::<ResolutionScope>().is_err());
    }
}
