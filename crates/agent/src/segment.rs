//! Reply segmentation into alternating prose and code blocks.
//!
//! The model is told to wrap code in `BEGIN CODE (lang)` / `END CODE`
//! fences. `segment` splits a finished reply on those markers, line by
//! line, and is total: any input string produces a segment list, with
//! unterminated fences flushed as a trailing code segment. Content lines
//! are carried verbatim; only the two marker line kinds are consumed.

/// One contiguous run of a finished reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Free text between code fences.
    Prose { text: String },
    /// A fenced code block with its language tag (`text` when untagged).
    Code { text: String, lang: String },
}

impl Segment {
    pub fn is_code(&self) -> bool {
        matches!(self, Segment::Code { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            Segment::Prose { text } | Segment::Code { text, .. } => text,
        }
    }
}

const OPEN_MARKER: &str = "BEGIN CODE";
const CLOSE_MARKER: &str = "END CODE";
const DEFAULT_LANG: &str = "text";

/// Split a reply into prose and code segments. Never fails.
pub fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    let mut lang: Option<String> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if lang.is_none() {
            if let Some(tag) = parse_open_marker(trimmed) {
                flush_prose(&mut segments, &mut run);
                lang = Some(tag);
            } else {
                run.push(line);
            }
        } else if trimmed == CLOSE_MARKER {
            let tag = lang.take().unwrap_or_else(|| DEFAULT_LANG.into());
            segments.push(Segment::Code {
                text: run.join("\n"),
                lang: tag,
            });
            run.clear();
        } else {
            run.push(line);
        }
    }

    match lang {
        // Unterminated fence: flush what accumulated as code anyway.
        Some(tag) => segments.push(Segment::Code {
            text: run.join("\n"),
            lang: tag,
        }),
        None => flush_prose(&mut segments, &mut run),
    }

    segments
}

/// Collect the code segments, in order, as (language, content) pairs.
pub fn code_blocks(segments: &[Segment]) -> Vec<(&str, &str)> {
    segments
        .iter()
        .filter_map(|s| match s {
            Segment::Code { text, lang } => Some((lang.as_str(), text.as_str())),
            Segment::Prose { .. } => None,
        })
        .collect()
}

/// Emit the accumulated prose run, dropping empty accumulations.
fn flush_prose(segments: &mut Vec<Segment>, run: &mut Vec<&str>) {
    let text = run.join("\n");
    run.clear();
    if !text.is_empty() {
        segments.push(Segment::Prose { text });
    }
}

/// Match an opening fence line (already trimmed). Returns the language tag
/// when the line is a fence: `BEGIN CODE` alone or with a parenthesized
/// tag. Malformed or empty parentheses fall back to the neutral tag.
fn parse_open_marker(trimmed: &str) -> Option<String> {
    let rest = trimmed.strip_prefix(OPEN_MARKER)?.trim();
    if rest.is_empty() {
        return Some(DEFAULT_LANG.to_string());
    }
    let inner = rest.strip_prefix('(')?;
    let tag = inner.strip_suffix(')').map(str::trim).unwrap_or("");
    if tag.is_empty() {
        Some(DEFAULT_LANG.to_string())
    } else {
        Some(tag.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_code_prose() {
        let input = "Hello\nBEGIN CODE (go)\nfunc main(){}\nEND CODE\nBye";
        let segments = segment(input);
        assert_eq!(
            segments,
            vec![
                Segment::Prose {
                    text: "Hello".into()
                },
                Segment::Code {
                    text: "func main(){}".into(),
                    lang: "go".into()
                },
                Segment::Prose {
                    text: "Bye".into()
                },
            ]
        );
    }

    #[test]
    fn plain_text_is_one_prose_segment() {
        let segments = segment("just an answer\nwith two lines");
        assert_eq!(
            segments,
            vec![Segment::Prose {
                text: "just an answer\nwith two lines".into()
            }]
        );
    }

    #[test]
    fn unterminated_fence_flushes_as_code() {
        let segments = segment("BEGIN CODE (py)\nprint(1)");
        assert_eq!(
            segments,
            vec![Segment::Code {
                text: "print(1)".into(),
                lang: "py".into()
            }]
        );
    }

    #[test]
    fn untagged_fence_defaults_to_text() {
        let segments = segment("BEGIN CODE\nraw\nEND CODE");
        assert_eq!(
            segments,
            vec![Segment::Code {
                text: "raw".into(),
                lang: "text".into()
            }]
        );
    }

    #[test]
    fn malformed_parentheses_default_to_text() {
        let segments = segment("BEGIN CODE (py\nx = 1\nEND CODE");
        assert_eq!(
            segments,
            vec![Segment::Code {
                text: "x = 1".into(),
                lang: "text".into()
            }]
        );
    }

    #[test]
    fn begin_code_with_trailing_words_is_prose() {
        let input = "BEGIN CODE review at noon";
        let segments = segment(input);
        assert_eq!(segments, vec![Segment::Prose { text: input.into() }]);
    }

    #[test]
    fn markers_survive_surrounding_whitespace() {
        let input = "  BEGIN CODE (rust)  \nfn f() {}\n   END CODE   ";
        let segments = segment(input);
        assert_eq!(
            segments,
            vec![Segment::Code {
                text: "fn f() {}".into(),
                lang: "rust".into()
            }]
        );
    }

    #[test]
    fn adjacent_fences_do_not_emit_empty_prose() {
        let input = "BEGIN CODE (a)\none\nEND CODE\nBEGIN CODE (b)\ntwo\nEND CODE";
        let segments = segment(input);
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(Segment::is_code));
    }

    #[test]
    fn empty_fence_still_emits_a_code_segment() {
        let segments = segment("BEGIN CODE (sh)\nEND CODE");
        assert_eq!(
            segments,
            vec![Segment::Code {
                text: String::new(),
                lang: "sh".into()
            }]
        );
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(segment("").is_empty());
    }

    #[test]
    fn round_trip_reconstructs_content_lines() {
        let input = "intro line\n\nBEGIN CODE (rust)\nlet x = 1;\n\nlet y = 2;\nEND CODE\noutro";
        let marker_free = input
            .lines()
            .filter(|l| {
                let t = l.trim();
                !t.starts_with("BEGIN CODE") && t != "END CODE"
            })
            .collect::<Vec<_>>()
            .join("\n");

        let segments = segment(input);
        let rebuilt = segments
            .iter()
            .map(Segment::text)
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(rebuilt, marker_free);
    }

    #[test]
    fn code_blocks_extracts_in_order() {
        let input = "a\nBEGIN CODE (py)\nfirst\nEND CODE\nb\nBEGIN CODE\nsecond\nEND CODE";
        let segments = segment(input);
        let blocks = code_blocks(&segments);
        assert_eq!(blocks, vec![("py", "first"), ("text", "second")]);
    }
}
