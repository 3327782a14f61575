//! # AIKA Core
//!
//! Domain types, traits, and error definitions for the AIKA terminal agent.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The model endpoint and every tool are defined as traits here.
//! Implementations live in their respective crates. This enables:
//! - Swapping the LLM backend via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, MessageToolCall, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
