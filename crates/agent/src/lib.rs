//! The AIKA agent loop and its supporting per-turn state.
//!
//! One `AgentLoop` owns a session: it drives the model/tool cycle for each
//! user turn ([`AgentLoop::run_turn`]), enforces per-turn tool budgets,
//! memoizes tool results for the life of the session, collects citation
//! URLs, and segments the finished answer into prose and code blocks.

pub mod budget;
pub mod cache;
pub mod dispatch;
pub mod loop_runner;
pub mod segment;
pub mod sources;

pub use budget::ToolBudget;
pub use cache::ToolCache;
pub use dispatch::dispatch;
pub use loop_runner::{AgentLoop, TurnOutput};
pub use segment::{code_blocks, segment, Segment};
pub use sources::SourceCollector;
