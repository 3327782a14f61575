//! Built-in tool implementations for AIKA.
//!
//! Three tools give the agent its capabilities:
//! - `create_file` — save content to disk when the user asks for it
//! - `web_search`  — look up current information on the web
//! - `fetch_url`   — pull readable text out of a web page

pub mod create_file;
pub mod fetch_url;
pub mod web_search;

pub use create_file::CreateFileTool;
pub use fetch_url::FetchUrlTool;
pub use web_search::WebSearchTool;

use aika_core::tool::ToolRegistry;

/// Create the default tool registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CreateFileTool::new()));
    registry.register(Box::new(WebSearchTool::new()));
    registry.register(Box::new(FetchUrlTool::new()));
    registry
}
