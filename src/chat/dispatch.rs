//! Input classification and dispatch.
//!
//! Every input line is offered to an ordered list of [`Handler`]s.  The
//! first handler that claims responsibility executes and its fixed
//! continuation decides whether the shell keeps going.  The order of
//! [`DispatchChain::standard`] is part of its contract:
//!
//! 1. exit keywords, before anything inspects content;
//! 2. blank input, before any loader can mistake it for a path;
//! 3. backslash commands;
//! 4. video links, before the generic URL loader would claim them;
//! 5. local files, then remote documents;
//! 6. everything else is a query, and that handler is always last.
//!
//! Responsibility checks never fail: input they cannot make sense of is
//! simply not theirs.  A remote document whose host cannot be reached turns
//! out not to be content, and the line is asked as a query instead.

use std::fmt;
use std::time::Duration;

use futures::StreamExt;

use crate::chat::commands::{ShellCommand, help_text, parse_command};
use crate::chat::render::Renderer;
use crate::chat::session::ChatSession;
use crate::error::{Error, Result};
use crate::extract::extract;
use crate::loader::{
    ContentDecision, ContentLoader, LocalFileLoader, MimeTypeGate, RemoteFileLoader,
    VideoLinkValidator,
};
use crate::observability::DISPATCH_TURNS;
use crate::types::{Model, Part};

/// What the shell loop does after an input has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Read the next input.
    Continue,
    /// Leave the loop.
    Break,
    /// No handler claimed the input; the chain lacks a catch-all.
    Unhandled,
}

/// What a handler may touch while executing.
pub struct DispatchContext<'a> {
    pub session: &'a mut ChatSession,
    pub renderer: &'a mut dyn Renderer,
}

impl<'a> DispatchContext<'a> {
    pub fn new(session: &'a mut ChatSession, renderer: &'a mut dyn Renderer) -> Self {
        Self { session, renderer }
    }
}

/// One link of the dispatch chain.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// True when this handler is responsible for `input`.  Must not fail
    /// or panic on any string.
    fn check_responsibility(&self, input: &str) -> bool;

    /// Perform this handler's side effect.
    async fn execute(&self, input: &str, ctx: &mut DispatchContext<'_>) -> Result<()>;

    /// The outcome reported after a successful execution.
    fn continuation(&self) -> DispatchOutcome;
}

/// Leaves the shell on `exit` or `quit`.
#[derive(Debug, Default)]
pub struct ExitHandler;

const EXIT_KEYWORDS: &[&str] = &["exit", "quit"];

#[async_trait::async_trait]
impl Handler for ExitHandler {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn check_responsibility(&self, input: &str) -> bool {
        let folded = input.trim().to_lowercase();
        EXIT_KEYWORDS.contains(&folded.as_str())
    }

    async fn execute(&self, _input: &str, _ctx: &mut DispatchContext<'_>) -> Result<()> {
        Ok(())
    }

    fn continuation(&self) -> DispatchOutcome {
        DispatchOutcome::Break
    }
}

/// Swallows blank lines.
#[derive(Debug, Default)]
pub struct EmptyInputHandler;

#[async_trait::async_trait]
impl Handler for EmptyInputHandler {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn check_responsibility(&self, input: &str) -> bool {
        input.trim().is_empty()
    }

    async fn execute(&self, _input: &str, _ctx: &mut DispatchContext<'_>) -> Result<()> {
        Ok(())
    }

    fn continuation(&self) -> DispatchOutcome {
        DispatchOutcome::Continue
    }
}

/// Applies backslash commands to the session.
#[derive(Debug, Default)]
pub struct CommandHandler;

#[async_trait::async_trait]
impl Handler for CommandHandler {
    fn name(&self) -> &'static str {
        "command"
    }

    fn check_responsibility(&self, input: &str) -> bool {
        parse_command(input).is_some()
    }

    async fn execute(&self, input: &str, ctx: &mut DispatchContext<'_>) -> Result<()> {
        let Some(command) = parse_command(input) else {
            return Ok(());
        };
        let session = &mut *ctx.session;
        let renderer = &mut *ctx.renderer;
        match command {
            ShellCommand::NextInstruction => {
                let profile = session.next_instruction();
                renderer.print_info(&format!("Instruction: {profile}"));
            }
            ShellCommand::System(text) => {
                session.set_custom_instruction(text);
                renderer.print_info("Instruction: custom");
            }
            ShellCommand::ToggleGoogleSearch => {
                let on = session.toggle_google_search();
                renderer.print_info(&format!("Google search {}", on_off(on)));
            }
            ShellCommand::ToggleUrlContext => {
                let on = session.toggle_url_context();
                renderer.print_info(&format!("URL context {}", on_off(on)));
            }
            ShellCommand::Model(None) => {
                let model = session.next_model();
                renderer.print_info(&format!("Model: {model}"));
            }
            ShellCommand::Model(Some(name)) => {
                let model: Model = name.parse().unwrap_or(Model::Custom(name));
                renderer.print_info(&format!("Model: {model}"));
                session.set_model(model);
            }
            ShellCommand::Clear => {
                session.clear();
                renderer.print_info("Conversation cleared.");
            }
            ShellCommand::Stats => {
                let stats = session.stats();
                renderer.print_toolbar(&stats);
                renderer.print_info(&format!(
                    "{} turns, {} answers",
                    stats.turn_count, stats.answered
                ));
            }
            ShellCommand::SaveTranscript(path) => match session.save_transcript_to(&path) {
                Ok(()) => renderer.print_info(&format!("Transcript saved to {path}")),
                Err(err) => renderer.print_error(&format!("Failed to save transcript: {err}")),
            },
            ShellCommand::LoadTranscript(path) => match session.load_transcript_from(&path) {
                Ok(()) => renderer.print_info(&format!("Transcript loaded from {path}")),
                Err(err) => renderer.print_error(&format!("Failed to load transcript: {err}")),
            },
            ShellCommand::Help => renderer.print_info(help_text()),
            ShellCommand::Invalid(message) => renderer.print_error(&message),
        }
        Ok(())
    }

    fn continuation(&self) -> DispatchOutcome {
        DispatchOutcome::Continue
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Attaches video links by reference; words around the link are asked as a query.
#[derive(Debug)]
pub struct VideoLinkHandler {
    validator: VideoLinkValidator,
}

impl VideoLinkHandler {
    pub fn new(validator: VideoLinkValidator) -> Self {
        Self { validator }
    }
}

#[async_trait::async_trait]
impl Handler for VideoLinkHandler {
    fn name(&self) -> &'static str {
        "video"
    }

    fn check_responsibility(&self, input: &str) -> bool {
        self.validator.validate(input).is_some()
    }

    async fn execute(&self, input: &str, ctx: &mut DispatchContext<'_>) -> Result<()> {
        let Some((link, rest)) = self.validator.split(input) else {
            return Ok(());
        };
        ctx.session.append_content(Part::uri(link, None));
        ctx.renderer.print_accepted("video");
        if !rest.is_empty() {
            DefaultQueryHandler.execute(&rest, ctx).await?;
        }
        Ok(())
    }

    fn continuation(&self) -> DispatchOutcome {
        DispatchOutcome::Continue
    }
}

/// Attaches content from a [`ContentLoader`] once the gate admits its type.
pub struct ContentHandler {
    loader: Box<dyn ContentLoader>,
    gate: MimeTypeGate,
}

impl ContentHandler {
    pub fn new(loader: impl ContentLoader + 'static, gate: MimeTypeGate) -> Self {
        Self {
            loader: Box::new(loader),
            gate,
        }
    }
}

impl fmt::Debug for ContentHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHandler")
            .field("loader", &self.loader.name())
            .field("gate", &self.gate)
            .finish()
    }
}

#[async_trait::async_trait]
impl Handler for ContentHandler {
    fn name(&self) -> &'static str {
        self.loader.name()
    }

    fn check_responsibility(&self, input: &str) -> bool {
        self.loader.validate(input).is_some()
    }

    async fn execute(&self, input: &str, ctx: &mut DispatchContext<'_>) -> Result<()> {
        let Some(identifier) = self.loader.validate(input) else {
            return Ok(());
        };
        match self.loader.resolve(&identifier, &self.gate).await? {
            ContentDecision::Accepted(content) => {
                ctx.session.append_content(content.to_part());
                ctx.renderer.print_accepted("file");
            }
            ContentDecision::Rejected { mime_type } => {
                ctx.renderer.print_rejected(mime_type.as_deref());
            }
            ContentDecision::Unreachable => {
                tracing::debug!(loader = self.loader.name(), "not reachable; asking instead");
                DefaultQueryHandler.execute(input, ctx).await?;
            }
            ContentDecision::FetchFailed { reason } => {
                ctx.renderer
                    .print_error(&format!("could not fetch {identifier}: {reason}"));
            }
        }
        Ok(())
    }

    fn continuation(&self) -> DispatchOutcome {
        DispatchOutcome::Continue
    }
}

/// How often a stalled answer stream checks for an interrupt.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

fn interrupted(renderer: &mut dyn Renderer) {
    renderer.finish_progress();
    renderer.print_interrupted();
    tracing::debug!("answer interrupted; partial answer discarded");
}

/// Asks the model; responsible for everything that reaches it.
#[derive(Debug, Default)]
pub struct DefaultQueryHandler;

#[async_trait::async_trait]
impl Handler for DefaultQueryHandler {
    fn name(&self) -> &'static str {
        "query"
    }

    fn check_responsibility(&self, _: &str) -> bool {
        true
    }

    async fn execute(&self, input: &str, ctx: &mut DispatchContext<'_>) -> Result<()> {
        let mut stream = ctx.session.ask(input).await?;
        let mut poll = tokio::time::interval(INTERRUPT_POLL);
        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = poll.tick() => {
                    if ctx.renderer.should_interrupt() {
                        interrupted(&mut *ctx.renderer);
                        return Ok(());
                    }
                    continue;
                }
            };
            let Some(snapshot) = next else {
                break;
            };
            if ctx.renderer.should_interrupt() {
                interrupted(&mut *ctx.renderer);
                return Ok(());
            }
            match snapshot {
                Ok(snapshot) => ctx.renderer.progress_tick(&snapshot),
                Err(err) => {
                    ctx.renderer.finish_progress();
                    return Err(err);
                }
            }
        }
        ctx.renderer.finish_progress();

        let result = stream.into_result()?;
        if result.text.is_empty() {
            ctx.renderer.print_info("(no answer)");
            return Ok(());
        }
        ctx.renderer.print_answer(&result.text);
        if result.has_references() {
            ctx.renderer
                .print_references(&result.grounding, &result.url_context);
        }
        let payloads = extract(&result.text);
        ctx.session.append_model_turn(result.text);
        if !payloads.is_empty() {
            ctx.renderer.print_payloads(&payloads);
        }
        Ok(())
    }

    fn continuation(&self) -> DispatchOutcome {
        DispatchOutcome::Continue
    }
}

/// An ordered list of handlers.
pub struct DispatchChain {
    handlers: Vec<Box<dyn Handler>>,
}

impl DispatchChain {
    /// A chain over `handlers`, evaluated in order.
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        Self { handlers }
    }

    /// The shell's chain with the default video host.
    pub fn standard() -> Result<Self> {
        Self::with_video_validator(VideoLinkValidator::new()?)
    }

    /// The shell's chain with a specific video-link validator.
    pub fn with_video_validator(video: VideoLinkValidator) -> Result<Self> {
        let gate = MimeTypeGate::standard();
        Ok(Self::new(vec![
            Box::new(ExitHandler),
            Box::new(EmptyInputHandler),
            Box::new(CommandHandler),
            Box::new(VideoLinkHandler::new(video)),
            Box::new(ContentHandler::new(LocalFileLoader::new(), gate.clone())),
            Box::new(ContentHandler::new(RemoteFileLoader::new()?, gate)),
            Box::new(DefaultQueryHandler),
        ]))
    }

    /// Names of the handlers in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// The name of the handler that would claim `input`.
    pub fn claimant(&self, input: &str) -> Option<&'static str> {
        self.handlers
            .iter()
            .find(|h| h.check_responsibility(input))
            .map(|h| h.name())
    }

    /// Offer `input` to each handler in turn; the first responsible one runs.
    pub async fn handle(
        &self,
        input: &str,
        ctx: &mut DispatchContext<'_>,
    ) -> Result<DispatchOutcome> {
        for handler in &self.handlers {
            if handler.check_responsibility(input) {
                DISPATCH_TURNS.click();
                tracing::debug!(handler = handler.name(), "dispatching input");
                handler.execute(input, ctx).await?;
                return Ok(handler.continuation());
            }
        }
        Ok(DispatchOutcome::Unhandled)
    }

    /// Like [`DispatchChain::handle`], but an unclaimed input is an error.
    pub async fn run_turn(
        &self,
        input: &str,
        ctx: &mut DispatchContext<'_>,
    ) -> Result<DispatchOutcome> {
        match self.handle(input, ctx).await? {
            DispatchOutcome::Unhandled => Err(Error::unhandled(input)),
            outcome => Ok(outcome),
        }
    }
}
