pub mod merge;
pub mod root;
pub mod scope;

pub use merge::{merge_dependencies, BomImport};
pub use root::{LoadedRoot, PreparedRoot, RawRoot, ResolutionRoot};
pub use scope::{DependencyFilter, ResolutionScope, ScopeSet};
