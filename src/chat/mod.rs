//! The interactive shell built on top of the library.
//!
//! - [`config`]: command-line parsing and resolved configuration
//! - [`session`]: conversation history and toggles
//! - [`commands`]: backslash command parsing
//! - [`dispatch`]: the chain of input handlers
//! - [`render`]: terminal output

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod render;
pub mod session;

pub use commands::{ShellCommand, help_text, parse_command};
pub use config::{InstructionProfile, SHORT_INSTRUCTION, ShellArgs, ShellConfig};
pub use dispatch::{
    CommandHandler, ContentHandler, DefaultQueryHandler, DispatchChain, DispatchContext,
    DispatchOutcome, EmptyInputHandler, ExitHandler, Handler, VideoLinkHandler,
};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ChatSession, SessionStats};
