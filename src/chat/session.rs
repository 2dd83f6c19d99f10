//! Session state for the shell.
//!
//! A [`ChatSession`] owns the conversation history, the resolved
//! [`ShellConfig`] and the remote service answering queries.  History only
//! grows: loaded content and finished answers are appended, and nothing is
//! removed except by [`ChatSession::clear`].

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::aggregator::{AggregatingStream, ResponseAggregator};
use crate::chat::config::{InstructionProfile, ShellConfig};
use crate::error::{Error, Result};
use crate::service::{QueryConfig, RemoteService, ToolToggles};
use crate::types::{Content, Model, Part, Role};

/// A snapshot of the session for the status line and `\stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The active model.
    pub model: Model,
    /// The active instruction profile.
    pub instruction: InstructionProfile,
    /// Enabled capabilities.
    pub toggles: ToolToggles,
    /// Number of turns in the history.
    pub turn_count: usize,
    /// Queries answered to completion.
    pub answered: u64,
}

/// Conversation state shared by the dispatch chain.
pub struct ChatSession {
    service: Arc<dyn RemoteService>,
    config: ShellConfig,
    history: Vec<Content>,
    answered: u64,
}

impl ChatSession {
    /// Creates a new session answering through `service`.
    pub fn new(service: Arc<dyn RemoteService>, config: ShellConfig) -> Self {
        Self {
            service,
            config,
            history: Vec::new(),
            answered: 0,
        }
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// The conversation so far.
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// True once anything has been added to the conversation.
    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    /// Clears the conversation history.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Everything a query needs besides the history.
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            instruction: self.config.instruction.text().to_string(),
            toggles: self.config.toggles,
            model: self.config.model.clone(),
        }
    }

    /// Appends loaded content or a link as a user turn.
    pub fn append_content(&mut self, part: Part) {
        self.history.push(Content::new(Role::User, vec![part]));
    }

    /// Commits a completed answer as a model turn.
    pub fn append_model_turn(&mut self, text: impl Into<String>) {
        self.history.push(Content::model(text));
        self.answered += 1;
    }

    /// Record `query` as a user turn and start streaming the answer.
    pub async fn ask(&mut self, query: &str) -> Result<AggregatingStream> {
        let config = self.query_config();
        let aggregator = ResponseAggregator::new(Arc::clone(&self.service));
        aggregator.ask(&mut self.history, &config, query).await
    }

    /// Flips search grounding; returns the new state.
    pub fn toggle_google_search(&mut self) -> bool {
        self.config.toggles.google_search = !self.config.toggles.google_search;
        self.config.toggles.google_search
    }

    /// Flips URL context; returns the new state.
    pub fn toggle_url_context(&mut self) -> bool {
        self.config.toggles.url_context = !self.config.toggles.url_context;
        self.config.toggles.url_context
    }

    /// Cycles std, short, custom.
    pub fn next_instruction(&mut self) -> &InstructionProfile {
        self.config.instruction = match self.config.instruction {
            InstructionProfile::Standard => InstructionProfile::Short,
            InstructionProfile::Short => {
                InstructionProfile::Custom(self.config.custom_instruction.clone())
            }
            InstructionProfile::Custom(_) => InstructionProfile::Standard,
        };
        &self.config.instruction
    }

    /// Stores `text` as the custom instruction and makes it active.
    pub fn set_custom_instruction(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.config.custom_instruction = text.clone();
        self.config.instruction = InstructionProfile::Custom(text);
    }

    /// Cycles to the next known model.
    pub fn next_model(&mut self) -> &Model {
        self.config.model = self.config.model.next();
        &self.config.model
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            instruction: self.config.instruction.clone(),
            toggles: self.config.toggles,
            turn_count: self.history.len(),
            answered: self.answered,
        }
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile::new(&self.history);
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    /// Loads a transcript from disk, replacing the current conversation history.
    pub fn load_transcript_from<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path.as_ref())
            .map_err(|err| Error::io("failed to open transcript file", err))?;
        let reader = BufReader::new(file);
        let transcript: TranscriptFile = from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse transcript", Some(Box::new(err)))
        })?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(Error::validation(
                format!("unsupported transcript version {}", transcript.version),
                Some("version".to_string()),
            ));
        }
        self.history = transcript.contents;
        Ok(())
    }
}

const TRANSCRIPT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    contents: Vec<Content>,
}

impl TranscriptFile {
    fn new(contents: &[Content]) -> Self {
        Self {
            version: TRANSCRIPT_VERSION,
            contents: contents.to_vec(),
        }
    }
}
