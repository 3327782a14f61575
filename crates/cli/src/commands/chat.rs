//! `aika chat` — Interactive session or single-message mode.
//!
//! The interactive loop owns the `(text, sources, segments)` triple of the
//! last answer; the `s`/`save`/`copy`/`sources` commands operate on it
//! without re-entering the agent loop.

use std::collections::HashMap;
use std::sync::Arc;

use aika_agent::segment::{code_blocks, Segment};
use aika_agent::{AgentLoop, TurnOutput};
use aika_config::AppConfig;
use aika_core::message::Transcript;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

const TITLE: &str = r"
      _    ___  _  __
     / \  / _ \| |/ /___
    / _ \| | | | ' // _ \
   / ___ \ |_| | . \  __/
  /_/   \_\___/|_|\_\___|  AIKA
";

const INTERRUPT_NOTICE: &str = "Interrupted. Type 'quit' to exit.";

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    tracing::debug!(?config, "Loaded configuration");

    // Check for API key early — give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    AIKA_API_KEY   (generic)");
        eprintln!("    GROQ_API_KEY   (for the default Groq endpoint)");
        eprintln!("    OPENAI_API_KEY (for OpenAI-compatible endpoints)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = aika_providers::build_from_config(&config)
        .map_err(|e| format!("Failed to build provider: {e}"))?;
    let registry = Arc::new(aika_tools::default_registry());

    let mut budgets = HashMap::new();
    budgets.insert("web_search".to_string(), config.web_search_limit);
    budgets.insert("fetch_url".to_string(), config.fetch_url_limit);

    let mut agent = AgentLoop::new(provider, registry)
        .with_model(&config.model)
        .with_temperature(config.temperature)
        .with_budgets(budgets)
        .with_sources_limit(config.sources_limit)
        .with_always_show_sources(config.always_show_sources)
        .with_max_steps(config.max_steps)
        .with_tool_status(|tool| println!("Executing tool: {tool} ..."));

    let mut transcript = Transcript::with_system_prompt(agent.system_prompt());

    // Single-message mode: one turn, print, done.
    if let Some(message) = message {
        let output = agent.run_turn(&mut transcript, &message).await;
        render_answer(&output, config.pretty);
        return Ok(());
    }

    interactive(agent, transcript, config.pretty).await
}

async fn interactive(
    mut agent: AgentLoop,
    mut transcript: Transcript,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    clear_screen();
    print_banner();
    println!("Try: Research Python 3.13 changes and save a summary");
    println!();

    let mut last: Option<TurnOutput> = None;
    let stdin = io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    loop {
        prompt().await?;
        let line = match next_input(&mut lines).await? {
            InputEvent::Line(line) => line,
            InputEvent::Interrupted => {
                // Ctrl+C only discards the pending prompt.
                println!();
                println!("{INTERRUPT_NOTICE}");
                continue;
            }
            InputEvent::Eof => break, // Ctrl+D
        };
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }
        let lower = input.to_lowercase();

        match lower.as_str() {
            "quit" | "exit" | "bye" => {
                println!("Goodbye!");
                break;
            }
            "clear" => {
                clear_screen();
                print_banner();
                continue;
            }
            "help" | "?" => {
                println!("{}", help_text());
                continue;
            }
            "s" | ":w" => {
                let default_name = default_save_name();
                print!("filename [{default_name}]: ");
                flush_stdout().await?;
                let filename = match next_input(&mut lines).await? {
                    InputEvent::Line(name) if !name.trim().is_empty() => name.trim().to_string(),
                    InputEvent::Line(_) => default_name,
                    InputEvent::Interrupted => {
                        println!();
                        println!("Save canceled.");
                        continue;
                    }
                    InputEvent::Eof => break,
                };
                println!("{}", save_last_answer(last.as_ref(), &filename));
                continue;
            }
            "sources on" => {
                agent.set_always_show_sources(true);
                println!("Sources: ON (limit {})", agent.sources_limit());
                continue;
            }
            "sources off" => {
                agent.set_always_show_sources(false);
                println!("Sources: OFF");
                continue;
            }
            "sources status" => {
                if agent.always_show_sources() {
                    println!("Sources: ON (limit {})", agent.sources_limit());
                } else {
                    println!("Sources: OFF");
                }
                continue;
            }
            _ => {}
        }

        if let Some(rest) = input.strip_prefix("save ") {
            let filename = rest.trim();
            if filename.is_empty() {
                println!("Usage: save <filename>");
            } else {
                println!("{}", save_last_answer(last.as_ref(), filename));
            }
            continue;
        }

        if lower == "copy" || lower.starts_with("copy ") {
            println!("{}", copy_code_block(last.as_ref(), &input));
            continue;
        }

        // Regular user message
        let output = agent.run_turn(&mut transcript, &input).await;
        render_answer(&output, pretty);
        last = Some(output);
    }

    Ok(())
}

/// One event from the interactive prompt.
#[derive(Debug, PartialEq, Eq)]
enum InputEvent {
    Line(String),
    Interrupted,
    Eof,
}

/// Wait for the next input line, racing it against Ctrl+C so an interrupt
/// aborts only the pending prompt, never the session. In-flight model and
/// tool calls are unaffected — they run to completion.
async fn next_input<R>(lines: &mut io::Lines<R>) -> io::Result<InputEvent>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => Ok(match line? {
            Some(line) => InputEvent::Line(line),
            None => InputEvent::Eof,
        }),
        _ = tokio::signal::ctrl_c() => Ok(InputEvent::Interrupted),
    }
}

/// Print an answer, re-fencing code segments so they stand out even in
/// plain mode.
fn render_answer(output: &TurnOutput, pretty: bool) {
    println!();
    for segment in &output.segments {
        match segment {
            Segment::Prose { text } => println!("{text}"),
            Segment::Code { text, lang } => {
                if pretty {
                    let ruler = "-".repeat(40);
                    println!("{ruler} {lang}");
                    println!("{text}");
                    println!("{ruler}");
                } else {
                    println!("BEGIN CODE ({lang})");
                    println!("{text}");
                    println!("END CODE");
                }
            }
        }
    }
    println!();
}

/// Save the last answer's text to a file.
fn save_last_answer(last: Option<&TurnOutput>, filename: &str) -> String {
    let Some(output) = last else {
        return "Nothing to save yet. Ask a question first.".to_string();
    };
    if output.text.trim().is_empty() {
        return "Nothing to save yet. Ask a question first.".to_string();
    }
    match std::fs::write(filename, &output.text) {
        Ok(()) => format!("Saved to '{filename}'."),
        Err(e) => format!("Error saving file: {e}"),
    }
}

/// Handle `copy` / `copy <n>` against the last answer's code blocks
/// (1-based index, bare `copy` takes the last block).
fn copy_code_block(last: Option<&TurnOutput>, input: &str) -> String {
    let blocks = match last {
        Some(output) => code_blocks(&output.segments),
        None => Vec::new(),
    };
    if blocks.is_empty() {
        return "No code blocks in last answer.".to_string();
    }

    match select_code_block(&blocks, input) {
        Ok(code) => copy_to_clipboard(code),
        Err(msg) => msg,
    }
}

/// Pick the block `copy [n]` refers to: 1-based index when the suffix is
/// numeric, otherwise the last block (a non-numeric suffix is treated
/// like bare `copy`).
fn select_code_block<'a>(blocks: &[(&'a str, &'a str)], input: &str) -> Result<&'a str, String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let index = match parts.get(1).map(|p| p.parse::<usize>()) {
        Some(Ok(n)) => {
            if n == 0 || n > blocks.len() {
                return Err(format!(
                    "Index out of range. There are {} code blocks.",
                    blocks.len()
                ));
            }
            n - 1
        }
        _ => blocks.len() - 1,
    };
    Ok(blocks[index].1)
}

fn copy_to_clipboard(text: &str) -> String {
    match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.to_string())) {
        Ok(()) => "Copied to clipboard.".to_string(),
        Err(e) => format!("Could not copy: {e}"),
    }
}

fn default_save_name() -> String {
    format!("aika_{}.txt", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

fn help_text() -> String {
    concat!(
        "Commands:\n",
        "- s or :w                 Save last answer (prompt for filename)\n",
        "- save <filename>         Save last answer to a specific file\n",
        "- copy                    Copy last code block to clipboard\n",
        "- copy <n>                Copy nth code block from last answer (1-based)\n",
        "- sources on/off/status   Toggle auto-append Sources section\n",
        "- clear                   Clear the screen (history kept)\n",
        "- help                    Show this help\n",
        "- quit / exit / bye       Exit\n",
    )
    .to_string()
}

fn print_banner() {
    println!("{TITLE}");
    println!("Terminal AI assistant. Tools: create_file, web_search, fetch_url. Type 'help' for commands.");
}

fn clear_screen() {
    print!("\x1b[2J\x1b[H");
}

async fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(b"you> ").await?;
    stdout.flush().await
}

async fn flush_stdout() -> io::Result<()> {
    io::stdout().flush().await
}
