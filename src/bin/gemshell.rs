//! Interactive shell for asking Gemini questions about text, files and videos.
//!
//! # Usage
//!
//! ```bash
//! # Interactive shell
//! gemshell
//!
//! # Answer one question and exit
//! gemshell what is the capital of Burkina Faso
//!
//! # Start with terse answers and URL context enabled
//! gemshell --system "answer in one sentence" --url-context
//! ```
//!
//! Inside the shell, a line naming a local file or a remote document attaches
//! it to the conversation, a video link attaches the video, `\help` lists the
//! commands and `exit`, `quit` or Ctrl-D leave.  Ctrl-C while an answer
//! streams discards that answer.
//!
//! Set `GEMINI_API_KEY` for authentication and `GEMSHELL_LOG` (e.g.
//! `GEMSHELL_LOG=gemshell=debug`) for diagnostics on stderr.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use gemshell::Gemini;
use gemshell::chat::{
    ChatSession, DefaultQueryHandler, DispatchChain, DispatchContext, DispatchOutcome, Handler,
    PlainTextRenderer, Renderer, ShellArgs, ShellConfig, help_text,
};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GEMSHELL_LOG";

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Main entry point for the gemshell application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let (args, free) = ShellArgs::from_command_line_relaxed("gemshell [OPTIONS] [PROMPT...]");
    let config = ShellConfig::from(args);
    let use_color = config.use_color;
    let history_file = config.history_file.clone();

    let client = Gemini::new(None)?;
    let mut session = ChatSession::new(Arc::new(client), config);

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;
    let mut renderer =
        PlainTextRenderer::with_color(use_color).with_interrupt(Arc::clone(&interrupted));

    if !free.is_empty() {
        let prompt = free.join(" ");
        let mut ctx = DispatchContext::new(&mut session, &mut renderer);
        DefaultQueryHandler.execute(&prompt, &mut ctx).await?;
        return Ok(());
    }

    let chain = DispatchChain::standard()?;
    let mut rl = DefaultEditor::new()?;
    if let Err(err) = rl.load_history(&history_file) {
        tracing::debug!(path = %history_file.display(), error = %err, "no readline history loaded");
    }

    renderer.print_info(help_text());
    println!();
    renderer.print_toolbar(&session.stats());

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        match rl.readline("prompt> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                let mut ctx = DispatchContext::new(&mut session, &mut renderer);
                match chain.run_turn(&line, &mut ctx).await {
                    Ok(DispatchOutcome::Break) => break,
                    Ok(_) => {}
                    Err(err) if err.is_unhandled() => return Err(err.into()),
                    Err(err) => renderer.print_error(&err.to_string()),
                }
                renderer.print_toolbar(&session.stats());
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt aborts the turn
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(&history_file) {
        tracing::warn!(path = %history_file.display(), error = %err, "could not save readline history");
    }
    Ok(())
}
