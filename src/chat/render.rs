//! Output rendering for the shell.
//!
//! The dispatch chain talks to the terminal only through [`Renderer`], so
//! tests can record what a turn would have shown.  [`PlainTextRenderer`]
//! writes to stdout with optional ANSI styling.

use std::env;
use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::aggregator::AggregatedResult;
use crate::chat::session::SessionStats;
use crate::types::{GroundingChunk, UrlMetadata};

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for dim text (used for references).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for green text (used for accepted content and progress).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for rejections and errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for cyan text (used for the status line).
const ANSI_CYAN: &str = "\x1b[36m";

/// Width used when `COLUMNS` is unset or unparsable.
const DEFAULT_WIDTH: usize = 80;

/// Trait for rendering shell output.
pub trait Renderer: Send {
    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Content of the given kind (e.g. "file", "youtube video") was added to the conversation.
    fn print_accepted(&mut self, kind: &str);

    /// Content was refused because of its MIME type; `None` when the type is unknown.
    fn print_rejected(&mut self, mime_type: Option<&str>);

    /// One more fragment of the answer arrived.
    fn progress_tick(&mut self, snapshot: &AggregatedResult);

    /// The answer stream ended, for whatever reason.
    fn finish_progress(&mut self);

    /// Print a completed answer.
    fn print_answer(&mut self, text: &str);

    /// Print grounding and URL-context references as a block separate from the answer.
    fn print_references(&mut self, grounding: &[GroundingChunk], url_context: &[UrlMetadata]);

    /// Print structured payloads extracted from the answer.
    fn print_payloads(&mut self, payloads: &[Value]);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);

    /// Print the status line.
    fn print_toolbar(&mut self, stats: &SessionStats);

    /// Returns true if streaming should be interrupted.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// The status line: profile, toggles, history state and model.
pub fn toolbar_line(stats: &SessionStats) -> String {
    format!(
        "  {:<6}   {}   {}   {}    {}",
        stats.instruction.name(),
        if stats.toggles.google_search {
            "google   "
        } else {
            "no google"
        },
        if stats.toggles.url_context {
            "url context   "
        } else {
            "no url context"
        },
        if stats.turn_count > 0 {
            "has history"
        } else {
            "chat is empty"
        },
        stats.model.short_name(),
    )
}

/// Markdown-style links for every reference, grounding first.
pub fn reference_links(grounding: &[GroundingChunk], url_context: &[UrlMetadata]) -> Vec<String> {
    let web = grounding
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .map(|web| format!("[{}]({})", web.title, web.uri));
    let retrieved = url_context
        .iter()
        .map(|meta| format!("[{0}]({0})", meta.retrieved_url));
    web.chain(retrieved).collect()
}

fn terminal_width() -> usize {
    env::var("COLUMNS")
        .ok()
        .and_then(|cols| cols.trim().parse::<usize>().ok())
        .filter(|cols| *cols > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    width: usize,
    ticks: usize,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            width: terminal_width(),
            ticks: 0,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Flushes stdout to ensure immediate display of progress.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_info(&mut self, info: &str) {
        println!("{info}");
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("{}", self.styled(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_accepted(&mut self, kind: &str) {
        println!("{}", self.styled(ANSI_GREEN, &format!("{kind} accepted")));
    }

    fn print_rejected(&mut self, mime_type: Option<&str>) {
        let label = self.styled(ANSI_RED, "file rejected, it has non allowed mimetype:");
        println!("{label} {}", mime_type.unwrap_or("unknown"));
    }

    fn progress_tick(&mut self, _: &AggregatedResult) {
        self.ticks += 1;
        if self.ticks <= self.width {
            print!("{}", self.styled(ANSI_GREEN, "-"));
            self.flush();
        }
    }

    fn finish_progress(&mut self) {
        let rest = self.width.saturating_sub(self.ticks);
        println!("{}", self.styled(ANSI_GREEN, &"-".repeat(rest)));
        self.ticks = 0;
        self.flush();
    }

    fn print_answer(&mut self, text: &str) {
        println!("{}", text.trim_end());
    }

    fn print_references(&mut self, grounding: &[GroundingChunk], url_context: &[UrlMetadata]) {
        let links = reference_links(grounding, url_context);
        if links.is_empty() {
            return;
        }
        println!();
        for link in links {
            println!("{}", self.styled(ANSI_DIM, &link));
        }
    }

    fn print_payloads(&mut self, payloads: &[Value]) {
        for payload in payloads {
            match serde_json::to_string_pretty(payload) {
                Ok(json) => println!("{json}"),
                Err(_) => println!("{payload}"),
            }
        }
    }

    fn print_interrupted(&mut self) {
        println!("[interrupted]");
        self.flush();
    }

    fn print_toolbar(&mut self, stats: &SessionStats) {
        println!("{}", self.styled(ANSI_CYAN, &toolbar_line(stats)));
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
