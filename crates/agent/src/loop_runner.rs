//! The agent loop: one user turn from input text to rendered answer.
//!
//! `run_turn` drives the query/tool-execution cycle: append the user turn,
//! call the model with tools enabled, execute any requested tools in order,
//! and repeat until the model answers in plain text or the step ceiling is
//! reached. Whatever happens, the turn produces a `TurnOutput` — endpoint
//! failures degrade to an error answer rather than surfacing as `Err`.

use aika_core::error::ProviderError;
use aika_core::message::{Message, Transcript};
use aika_core::provider::{Provider, ProviderRequest, ToolChoice};
use aika_core::tool::ToolRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::budget::ToolBudget;
use crate::cache::ToolCache;
use crate::dispatch::dispatch;
use crate::segment::{self, Segment};
use crate::sources::{self, SourceCollector};

const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_SOURCES_LIMIT: usize = 6;
const DEFAULT_MAX_STEPS: u32 = 6;

const STEP_CEILING_NOTICE: &str =
    "Tool loop limit reached; provide your best answer now with available info. Do not call tools.";

const FINAL_ANSWER_DIRECTIVE: &str = "Final answer only. Do not call any tools in this turn.\n\
    Output must be plain text. Do not use Markdown, backticks, or any markup.\n\
    Use code delimiters 'BEGIN CODE (language)' and 'END CODE' for code.\n\
    If web research was used earlier, append a 'Sources:' section with plain URLs.\n\
    Keep it concise unless the user explicitly asked for more detail.";

/// Everything one user turn produces, ready for rendering and the
/// save/copy commands.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    /// The final answer text, with the Sources section already appended
    /// when enabled.
    pub text: String,
    /// Citation URLs collected from tool results, in discovery order.
    pub sources: Vec<String>,
    /// The answer split into prose and code segments.
    pub segments: Vec<Segment>,
}

/// Orchestrates user turns against one provider and one tool registry.
///
/// Budgets and sources reset every turn; the result cache lives as long
/// as the loop does.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: f32,
    budgets: HashMap<String, u32>,
    sources_limit: usize,
    always_show_sources: bool,
    max_steps: u32,
    cache: ToolCache,
    tool_status: Option<ToolStatusSink>,
}

/// Callback invoked with the tool name just before each tool executes,
/// so a frontend can show progress while the turn is still running.
type ToolStatusSink = Box<dyn Fn(&str) + Send + Sync>;

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            budgets: HashMap::new(),
            sources_limit: DEFAULT_SOURCES_LIMIT,
            always_show_sources: true,
            max_steps: DEFAULT_MAX_STEPS,
            cache: ToolCache::new(),
            tool_status: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Per-turn call limits by tool name. Tools absent from the map are
    /// unbudgeted.
    pub fn with_budgets(mut self, budgets: HashMap<String, u32>) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn with_sources_limit(mut self, limit: usize) -> Self {
        self.sources_limit = limit;
        self
    }

    pub fn with_always_show_sources(mut self, enabled: bool) -> Self {
        self.always_show_sources = enabled;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Report each tool execution to the given sink as it happens.
    pub fn with_tool_status<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.tool_status = Some(Box::new(sink));
        self
    }

    /// Runtime toggle for the Sources section (the `sources on/off`
    /// command).
    pub fn set_always_show_sources(&mut self, enabled: bool) {
        self.always_show_sources = enabled;
    }

    pub fn always_show_sources(&self) -> bool {
        self.always_show_sources
    }

    pub fn sources_limit(&self) -> usize {
        self.sources_limit
    }

    /// The session system prompt: identity, output format, tool policy.
    pub fn system_prompt(&self) -> String {
        let web_limit = self.budgets.get("web_search").copied().unwrap_or(2);
        let fetch_limit = self.budgets.get("fetch_url").copied().unwrap_or(3);
        format!(
            "You are AIKA, a concise, helpful assistant with access to tools: create_file, web_search, fetch_url.\n\
             Output format:\n\
             - Plain text only. Do not use Markdown, backticks, or any markup.\n\
             - For lists, use simple hyphens or numbered items (1), 2), 3)).\n\
             - For code, use delimiters:\n\
             \x20 BEGIN CODE (language)\n\
             \x20 ...code...\n\
             \x20 END CODE\n\
             Tool use policy:\n\
             - Use web_search when needed; at most {web_limit} calls per request.\n\
             - After searching, use fetch_url on up to {fetch_limit} promising results.\n\
             - If a tool fails, briefly state the failure and proceed.\n\
             - When you used web research, append a Sources section with plain URLs (one per line).\n\
             File creation policy:\n\
             - Call create_file only if the user explicitly asks to save or create a file.\n\
             Style:\n\
             - Be direct, friendly, and concise by default."
        )
    }

    /// Run one user turn to completion. The transcript gains the user
    /// turn plus everything the exchange produced; on endpoint failure
    /// the failed model call is not appended and the returned text
    /// describes the failure.
    pub async fn run_turn(&mut self, transcript: &mut Transcript, user_text: &str) -> TurnOutput {
        transcript.push(Message::user(user_text));

        let mut budget = ToolBudget::new(self.budgets.clone());
        let mut sources = SourceCollector::new(self.sources_limit);

        let text = match self.drive(transcript, &mut budget, &mut sources).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Turn aborted by endpoint failure");
                format!("Could not produce an answer: {e}")
            }
        };

        let segments = segment::segment(&text);
        TurnOutput {
            text,
            sources: sources.into_urls(),
            segments,
        }
    }

    /// The query/tool cycle. Returns the final answer text, or the
    /// endpoint error when a tool-enabled model call fails.
    async fn drive(
        &mut self,
        transcript: &mut Transcript,
        budget: &mut ToolBudget,
        sources: &mut SourceCollector,
    ) -> Result<String, ProviderError> {
        let mut steps = 0u32;

        loop {
            let request = self.request(transcript.messages.clone(), ToolChoice::Auto);
            let response = self.provider.complete(request).await?;

            let content = response.message.content.clone();
            let tool_calls = response.message.tool_calls.clone();
            transcript.push(response.message);

            if !tool_calls.is_empty() {
                for call in &tool_calls {
                    info!(tool = %call.name, "Executing tool request");
                    if let Some(status) = &self.tool_status {
                        status(&call.name);
                    }
                    let turn =
                        dispatch(call, &self.tools, budget, &mut self.cache, sources).await;
                    transcript.push(turn);
                }

                steps += 1;
                if steps >= self.max_steps {
                    debug!(steps, "Step ceiling reached, forcing final answer");
                    transcript.push(Message::system(STEP_CEILING_NOTICE));
                    return Ok(self.force_final(transcript, sources).await);
                }
                continue;
            }

            if !content.trim().is_empty() {
                return Ok(self.with_sources(content, sources));
            }

            // Tool-free, content-free reply: ask again with tools disabled.
            debug!("Empty assistant reply, forcing final answer");
            return Ok(self.force_final(transcript, sources).await);
        }
    }

    /// One model call with tools disabled and a one-shot formatting
    /// directive. The directive is not persisted; the answer (or the
    /// error text standing in for it) is appended as an assistant turn.
    async fn force_final(&self, transcript: &mut Transcript, sources: &SourceCollector) -> String {
        let mut messages = transcript.messages.clone();
        messages.push(Message::system(FINAL_ANSWER_DIRECTIVE));

        let request = self.request(messages, ToolChoice::None);
        let text = match self.provider.complete(request).await {
            Ok(response) => self.with_sources(response.message.content, sources),
            Err(e) => {
                warn!(error = %e, "Final answer call failed");
                format!("Could not render final answer: {e}")
            }
        };

        transcript.push(Message::assistant(text.clone()));
        text
    }

    fn with_sources(&self, text: String, sources: &SourceCollector) -> String {
        if self.always_show_sources && !sources.is_empty() {
            sources::append_sources(&text, sources.urls())
        } else {
            text
        }
    }

    fn request(&self, messages: Vec<Message>, tool_choice: ToolChoice) -> ProviderRequest {
        let tools = match tool_choice {
            ToolChoice::Auto => self.tools.definitions(),
            ToolChoice::None => Vec::new(),
        };
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            tools,
            tool_choice,
        }
    }
}
