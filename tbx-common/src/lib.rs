// tbx-common/src/lib.rs
pub mod cache;
pub mod config;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod model;

// Re-export key types
pub use cache::Cache;
pub use config::Config;
pub use dependency::{PreparedRoot, ResolutionRoot, ResolutionScope};
pub use engine::{ResolverEngine, SessionConfig};
pub use error::{Result, TbxError};
pub use model::{Coordinate, Dependency, RemoteRepository, Version};
