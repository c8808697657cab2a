//! MCP prompts: expert personas and per-table schema documents.

pub mod generator;
pub mod registry;

pub use generator::PromptGenerator;
pub use registry::PromptRegistry;
