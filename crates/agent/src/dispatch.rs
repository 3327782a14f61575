//! Tool dispatch: one model-issued tool request in, one tool turn out.
//!
//! Order of checks matters and is load-bearing:
//! 1. malformed argument JSON degrades to an empty argument set;
//! 2. a spent budget short-circuits with a refusal, touching neither the
//!    counter nor the cache;
//! 3. otherwise the request is counted, answered from cache when possible,
//!    and executed when not — execution failures become descriptive result
//!    strings, never errors.
//!
//! Result strings (including failures) are cached, and any URLs in them
//! feed the source collector.

use aika_core::message::{Message, MessageToolCall};
use aika_core::tool::{ToolCall, ToolRegistry};
use serde_json::Value;
use tracing::{debug, warn};

use crate::budget::ToolBudget;
use crate::cache::ToolCache;
use crate::sources::SourceCollector;

const SEARCH_TOOL: &str = "web_search";
const FETCH_TOOL: &str = "fetch_url";

/// Resolve one tool request into a tool turn. Infallible: every outcome,
/// including unknown tools and execution failures, is encoded in the
/// returned message's content.
pub async fn dispatch(
    request: &MessageToolCall,
    registry: &ToolRegistry,
    budget: &mut ToolBudget,
    cache: &mut ToolCache,
    sources: &mut SourceCollector,
) -> Message {
    let arguments = parse_arguments(&request.arguments);

    if budget.is_exhausted(&request.name) {
        debug!(tool = %request.name, "Tool budget exhausted, refusing request");
        return Message::tool_result(
            &request.id,
            &request.name,
            budget.refusal_message(&request.name),
        );
    }

    // The budget counts requests the model issued, so a cache hit below
    // still costs one unit.
    budget.record(&request.name);

    let result = match cache.get(&request.name, &arguments) {
        Some(cached) => {
            debug!(tool = %request.name, "Tool cache hit");
            cached.to_string()
        }
        None => {
            let call = ToolCall {
                id: request.id.clone(),
                name: request.name.clone(),
                arguments: arguments.clone(),
            };
            let result = match registry.execute(&call).await {
                Ok(result) => result.output,
                Err(e) => {
                    warn!(tool = %request.name, error = %e, "Tool execution failed");
                    format!("Error executing tool '{}': {e}", request.name)
                }
            };
            cache.insert(&request.name, &arguments, result.clone());
            result
        }
    };

    collect_sources(&request.name, &arguments, &result, sources);

    Message::tool_result(&request.id, &request.name, result)
}

/// Parse the raw argument payload; malformed JSON degrades to `{}`.
fn parse_arguments(raw: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Malformed tool arguments, substituting empty set");
            Value::Object(serde_json::Map::new())
        }
    }
}

/// Pull citation URLs out of a tool result: every result URL for search,
/// the requested URL for fetch. Unparseable results contribute nothing.
fn collect_sources(tool: &str, arguments: &Value, result: &str, sources: &mut SourceCollector) {
    match tool {
        SEARCH_TOOL => {
            let Ok(parsed) = serde_json::from_str::<Value>(result) else {
                return;
            };
            let Some(results) = parsed["results"].as_array() else {
                return;
            };
            for entry in results {
                if sources.is_full() {
                    break;
                }
                if let Some(url) = entry["url"].as_str() {
                    sources.add(url);
                }
            }
        }
        FETCH_TOOL => {
            if let Some(url) = arguments["url"].as_str() {
                sources.add(url);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aika_core::error::ToolError;
    use aika_core::message::Role;
    use aika_core::tool::{Tool, ToolResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test tool that counts real invocations and echoes its arguments.
    struct CountingTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "counting"
        }
        fn description(&self) -> &str {
            "Counts invocations"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult::ok(arguments.to_string()))
        }
    }

    /// Test tool that always fails.
    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "failing".into(),
                reason: "boom".into(),
            })
        }
    }

    /// Test stand-in for web_search returning a fixed result list.
    struct FakeSearchTool {
        payload: String,
    }

    #[async_trait]
    impl Tool for FakeSearchTool {
        fn name(&self) -> &str {
            SEARCH_TOOL
        }
        fn description(&self) -> &str {
            "Fixed search results"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::ok(self.payload.clone()))
        }
    }

    fn counting_registry() -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CountingTool {
            calls: calls.clone(),
        }));
        (registry, calls)
    }

    fn request(name: &str, arguments: &str) -> MessageToolCall {
        MessageToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    fn budget_of(tool: &str, limit: u32) -> ToolBudget {
        let mut limits = HashMap::new();
        limits.insert(tool.to_string(), limit);
        ToolBudget::new(limits)
    }

    #[tokio::test]
    async fn counts_every_request_even_cache_hits() {
        let (registry, calls) = counting_registry();
        let mut budget = budget_of("counting", 5);
        let mut cache = ToolCache::new();
        let mut sources = SourceCollector::new(6);

        let req = request("counting", r#"{"x": 1}"#);
        for _ in 0..3 {
            dispatch(&req, &registry, &mut budget, &mut cache, &mut sources).await;
        }

        assert_eq!(budget.count("counting"), 3);
        // Only the first request reached the tool.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refusal_past_limit_leaves_counter_and_cache_alone() {
        let (registry, calls) = counting_registry();
        let mut budget = budget_of("counting", 2);
        let mut cache = ToolCache::new();
        let mut sources = SourceCollector::new(6);

        dispatch(
            &request("counting", r#"{"x": 1}"#),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;
        dispatch(
            &request("counting", r#"{"x": 2}"#),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;

        let refused = dispatch(
            &request("counting", r#"{"x": 3}"#),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;

        assert!(refused.content.contains("Budget exceeded for counting"));
        assert_eq!(budget.count("counting"), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_key_ignores_argument_order() {
        let (registry, calls) = counting_registry();
        let mut budget = ToolBudget::default();
        let mut cache = ToolCache::new();
        let mut sources = SourceCollector::new(6);

        let first = dispatch(
            &request("counting", r#"{"a": 1, "b": 2}"#),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;
        let second = dispatch(
            &request("counting", r#"{"b": 2, "a": 1}"#),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;

        assert_eq!(first.content, second.content);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_arguments_degrade_to_empty() {
        let (registry, calls) = counting_registry();
        let mut budget = ToolBudget::default();
        let mut cache = ToolCache::new();
        let mut sources = SourceCollector::new(6);

        let turn = dispatch(
            &request("counting", "{not json"),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;

        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.content, "{}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn execution_failure_becomes_result_string() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool));
        let mut budget = ToolBudget::default();
        let mut cache = ToolCache::new();
        let mut sources = SourceCollector::new(6);

        let turn = dispatch(
            &request("failing", "{}"),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;

        assert_eq!(turn.role, Role::Tool);
        assert!(turn.content.contains("Error executing tool 'failing'"));
        assert!(turn.content.contains("boom"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_result_string() {
        let registry = ToolRegistry::new();
        let mut budget = ToolBudget::default();
        let mut cache = ToolCache::new();
        let mut sources = SourceCollector::new(6);

        let turn = dispatch(
            &request("ghost", "{}"),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;

        assert!(turn.content.contains("Error executing tool 'ghost'"));
        assert_eq!(turn.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn search_results_feed_source_collector() {
        let payload = serde_json::json!({
            "query": "rust",
            "source": "test",
            "results": [
                {"title": "a", "url": "https://a.example", "snippet": ""},
                {"title": "dup", "url": "https://a.example", "snippet": ""},
                {"title": "bad", "url": "ftp://nope.example", "snippet": ""},
                {"title": "b", "url": "https://b.example", "snippet": ""},
                {"title": "c", "url": "https://c.example", "snippet": ""}
            ]
        })
        .to_string();

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FakeSearchTool { payload }));
        let mut budget = ToolBudget::default();
        let mut cache = ToolCache::new();
        let mut sources = SourceCollector::new(2);

        dispatch(
            &request(SEARCH_TOOL, r#"{"query": "rust"}"#),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;

        assert_eq!(sources.urls(), ["https://a.example", "https://b.example"]);
    }

    #[tokio::test]
    async fn fetch_records_the_requested_url() {
        struct FakeFetchTool;

        #[async_trait]
        impl Tool for FakeFetchTool {
            fn name(&self) -> &str {
                FETCH_TOOL
            }
            fn description(&self) -> &str {
                "Fixed fetch"
            }
            fn parameters_schema(&self) -> serde_json::Value {
                serde_json::json!({"type": "object", "properties": {}})
            }
            async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
                Ok(ToolResult::ok(r#"{"url":"https://page.example","status":"ok"}"#))
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FakeFetchTool));
        let mut budget = ToolBudget::default();
        let mut cache = ToolCache::new();
        let mut sources = SourceCollector::new(6);

        dispatch(
            &request(FETCH_TOOL, r#"{"url": "https://page.example"}"#),
            &registry,
            &mut budget,
            &mut cache,
            &mut sources,
        )
        .await;

        assert_eq!(sources.urls(), ["https://page.example"]);
    }
}
