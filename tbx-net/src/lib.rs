// tbx-net/src/lib.rs
pub mod collector;
pub mod engine;
pub mod http;
pub mod pom;
pub mod validation;

pub use engine::MavenEngine;
pub use validation::{validate_url, verify_checksum};
