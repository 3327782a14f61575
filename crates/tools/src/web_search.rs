//! Web search tool backed by the DuckDuckGo Instant Answer API.
//!
//! Returns a JSON string `{query, source, results: [{title, url, snippet}]}`.
//! Search provider failures are folded into the result list as an error
//! snippet so the model can react to them narratively.

use aika_core::error::ToolError;
use aika_core::tool::{Tool, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";
const SEARCH_SOURCE: &str = "duckduckgo_instant_answer_api";

pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information. Returns JSON with a list of results \
         [{title, url, snippet}]. Use this when the user asks to research or when you \
         need current info."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query string"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Max number of results (1-10)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let max_results = arguments["max_results"].as_u64().unwrap_or(5).clamp(1, 10) as usize;

        debug!(query, max_results, "Running web search");

        let (results, failed) = match self.query_instant_answers(query).await {
            Ok(mut results) => {
                results.truncate(max_results);
                (results, false)
            }
            Err(e) => (
                vec![SearchResult {
                    title: String::new(),
                    url: String::new(),
                    snippet: format!("DuckDuckGo error: {e}"),
                }],
                true,
            ),
        };

        let payload = SearchPayload {
            query: query.to_string(),
            source: SEARCH_SOURCE.to_string(),
            results,
        };
        let output = serde_json::to_string(&payload).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "web_search".into(),
            reason: e.to_string(),
        })?;

        Ok(if failed {
            ToolResult::failure(output)
        } else {
            ToolResult::ok(output)
        })
    }
}

impl WebSearchTool {
    async fn query_instant_answers(&self, query: &str) -> Result<Vec<SearchResult>, String> {
        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_redirect", "1"),
                ("no_html", "1"),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let data: InstantAnswer = response.json().await.map_err(|e| e.to_string())?;
        Ok(flatten_instant_answer(data))
    }
}

/// Flatten the Instant Answer payload: the abstract first, then related
/// topics (including one level of nested topic groups), in API order.
fn flatten_instant_answer(data: InstantAnswer) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if !data.abstract_url.is_empty() || !data.abstract_text.is_empty() {
        results.push(SearchResult {
            title: data.heading.clone(),
            url: data.abstract_url.clone(),
            snippet: data.abstract_text.clone(),
        });
    }

    for topic in data.related_topics {
        match topic {
            RelatedTopic::Leaf { first_url, text } => {
                if !first_url.is_empty() && !text.is_empty() {
                    results.push(SearchResult {
                        title: truncate_chars(&text, 120),
                        url: first_url,
                        snippet: text,
                    });
                }
            }
            RelatedTopic::Group { topics } => {
                for sub in topics {
                    if !sub.first_url.is_empty() && !sub.text.is_empty() {
                        results.push(SearchResult {
                            title: truncate_chars(&sub.text, 120),
                            url: sub.first_url,
                            snippet: sub.text,
                        });
                    }
                }
            }
            RelatedTopic::Other(_) => {}
        }
    }

    results
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[derive(Debug, Serialize)]
struct SearchPayload {
    query: String,
    source: String,
    results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(default, rename = "Heading")]
    heading: String,
    #[serde(default, rename = "AbstractText")]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default, rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

// Untagged: leaf entries carry FirstURL/Text, topic groups carry Topics.
// Anything else (ads, disambiguation stubs) falls through to Other.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Leaf {
        #[serde(rename = "FirstURL")]
        first_url: String,
        #[serde(rename = "Text")]
        text: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<TopicEntry>,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct TopicEntry {
    #[serde(default, rename = "FirstURL")]
    first_url: String,
    #[serde(default, rename = "Text")]
    text: String,
}
