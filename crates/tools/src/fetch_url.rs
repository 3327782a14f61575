//! URL fetch tool — download a page and extract readable text.
//!
//! HTML is converted with `html2text`, with a tag-stripping fallback for
//! documents it cannot handle. The extracted text is whitespace-normalized
//! (blank lines dropped, lines trimmed) and truncated to `max_chars` with an
//! explicit marker. Fetch failures are encoded in the JSON output
//! (`status: "error"`) rather than raised, so the model can react to them.

use aika_core::error::ToolError;
use aika_core::tool::{Tool, ToolResult};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; AIKA/1.0; +https://example.com/bot)";
const DEFAULT_MAX_CHARS: usize = 4000;
const TRUNCATION_MARKER: &str = "\n...[truncated]";
const HTML2TEXT_WIDTH: usize = 120;

pub struct FetchUrlTool {
    client: reqwest::Client,
}

impl FetchUrlTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for FetchUrlTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetch a web page and extract readable text content for analysis and summarization."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "HTTP/HTTPS URL to fetch"
                },
                "max_chars": {
                    "type": "integer",
                    "description": "Max characters to return",
                    "default": 4000
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        let max_chars = arguments["max_chars"]
            .as_u64()
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_CHARS);

        let parsed = url::Url::parse(url)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolError::InvalidArguments(format!(
                "URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        debug!(url, max_chars, "Fetching URL");

        match self.fetch(url).await {
            Ok((body, is_html)) => {
                let text = if is_html {
                    extract_readable_text(&body)
                } else {
                    body
                };
                let content = truncate(&normalize_whitespace(&text), max_chars);
                let payload = FetchPayload {
                    url: url.to_string(),
                    status: "ok".into(),
                    content: Some(content),
                    error: None,
                };
                Ok(ToolResult::ok(encode(&payload)?))
            }
            Err(e) => {
                let payload = FetchPayload {
                    url: url.to_string(),
                    status: "error".into(),
                    content: None,
                    error: Some(e),
                };
                Ok(ToolResult::failure(encode(&payload)?))
            }
        }
    }
}

impl FetchUrlTool {
    /// Perform the GET. Returns the body and whether it looked like HTML.
    async fn fetch(&self, url: &str) -> Result<(String, bool), String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("server returned status {status}"));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
            .unwrap_or(true);

        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok((body, is_html))
    }
}

fn encode(payload: &FetchPayload) -> Result<String, ToolError> {
    serde_json::to_string(payload).map_err(|e| ToolError::ExecutionFailed {
        tool_name: "fetch_url".into(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Serialize)]
struct FetchPayload {
    url: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Convert HTML to readable text: `html2text` first, tag stripping as a
/// fallback for documents it rejects.
fn extract_readable_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), HTML2TEXT_WIDTH) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => strip_html_tags(html),
    }
}

/// Strip HTML tags and decode the common entities. Always succeeds.
fn strip_html_tags(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut inside_tag = false;

    for ch in input.chars() {
        match ch {
            '<' => inside_tag = true,
            '>' => {
                inside_tag = false;
                result.push(' ');
            }
            _ if !inside_tag => result.push(ch),
            _ => {}
        }
    }

    result
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Drop blank lines and trim the rest, one line of text per content line.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut at a char boundary and append the truncation marker when content
/// was actually dropped.
fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
