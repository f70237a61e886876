// tbx-core/src/lib.rs
pub mod resolver;

pub use resolver::ToolboxResolver;
