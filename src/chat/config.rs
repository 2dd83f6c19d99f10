//! Configuration types for the shell.
//!
//! Command-line arguments are parsed via `arrrg` and resolved into a
//! [`ShellConfig`] that the session owns and the commands mutate.

use std::env;
use std::fmt;
use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::service::ToolToggles;
use crate::types::Model;

/// Directive used by the short instruction profile.
pub const SHORT_INSTRUCTION: &str = "answer short and precise, do not explain, just answer the question. If the prompt starts with \"exp\", give a detailed answer with explanation.";

/// File name of the readline history kept in the temp directory.
const HISTORY_FILE_NAME: &str = ".llm-history";

/// Command-line arguments for the gemshell tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ShellArgs {
    /// Model to use.
    #[arrrg(optional, "Model to use (default: gemini-2.5-flash)", "MODEL")]
    pub model: Option<String>,

    /// Custom instruction to start with.
    #[arrrg(optional, "Custom system instruction", "TEXT")]
    pub system: Option<String>,

    /// Start with search grounding off.
    #[arrrg(flag, "Disable Google search grounding")]
    pub no_google_search: bool,

    /// Start with URL context on.
    #[arrrg(flag, "Enable URL context")]
    pub url_context: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Where to keep the line-editing history.
    #[arrrg(optional, "History file (default: $TMPDIR/.llm-history)", "FILE")]
    pub history_file: Option<String>,
}

/// A named system-level directive applied to every query until changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InstructionProfile {
    /// No instruction.
    #[default]
    Standard,
    /// Terse answers.
    Short,
    /// A user-supplied instruction.
    Custom(String),
}

impl InstructionProfile {
    /// The label shown in the status line.
    pub fn name(&self) -> &'static str {
        match self {
            InstructionProfile::Standard => "std",
            InstructionProfile::Short => "short",
            InstructionProfile::Custom(_) => "custom",
        }
    }

    /// The instruction text sent with queries; empty for none.
    pub fn text(&self) -> &str {
        match self {
            InstructionProfile::Standard => "",
            InstructionProfile::Short => SHORT_INSTRUCTION,
            InstructionProfile::Custom(text) => text,
        }
    }
}

impl fmt::Display for InstructionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved configuration for a shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// The model to ask.
    pub model: Model,

    /// The active instruction profile.
    pub instruction: InstructionProfile,

    /// The most recent custom instruction, restored when cycling to custom.
    pub custom_instruction: String,

    /// Enabled server-side capabilities.
    pub toggles: ToolToggles,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Line-editing history file.
    pub history_file: PathBuf,
}

/// `$TMPDIR/.llm-history`.
pub fn default_history_file() -> PathBuf {
    env::temp_dir().join(HISTORY_FILE_NAME)
}

impl ShellConfig {
    /// Creates a new ShellConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.5-flash
    /// - Instruction: std
    /// - Google search on, URL context off
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            instruction: InstructionProfile::Standard,
            custom_instruction: String::new(),
            toggles: ToolToggles::default(),
            use_color: true,
            history_file: default_history_file(),
        }
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Starts with a custom instruction profile.
    pub fn with_custom_instruction(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.custom_instruction = text.clone();
        self.instruction = InstructionProfile::Custom(text);
        self
    }

    pub fn with_toggles(mut self, toggles: ToolToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    pub fn with_history_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_file = path.into();
        self
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ShellArgs> for ShellConfig {
    fn from(args: ShellArgs) -> Self {
        let mut config = ShellConfig::new().with_toggles(ToolToggles {
            google_search: !args.no_google_search,
            url_context: args.url_context,
        });
        if let Some(model) = args.model {
            config.model = model.parse().unwrap_or(Model::Custom(model));
        }
        if let Some(system) = args.system {
            config = config.with_custom_instruction(system);
        }
        if let Some(path) = args.history_file {
            config.history_file = PathBuf::from(path);
        }
        config.use_color = !args.no_color;
        config
    }
}
