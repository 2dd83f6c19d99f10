use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A Gemini model identifier.
///
/// This can be one of the models the shell knows how to configure, or a
/// custom string passed straight through to the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Models the shell can cycle through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Gemini 2.5 Pro
    #[serde(rename = "gemini-2.5-pro")]
    Gemini25Pro,

    /// Gemini 2.5 Flash
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,

    /// Gemini 2.5 Flash-Lite
    #[serde(rename = "gemini-2.5-flash-lite")]
    Gemini25FlashLite,
}

impl KnownModel {
    /// All known models in cycling order.
    pub const ALL: [KnownModel; 3] = [
        KnownModel::Gemini25Pro,
        KnownModel::Gemini25Flash,
        KnownModel::Gemini25FlashLite,
    ];

    /// The identifier used in API paths.
    pub fn api_name(self) -> &'static str {
        match self {
            KnownModel::Gemini25Pro => "gemini-2.5-pro",
            KnownModel::Gemini25Flash => "gemini-2.5-flash",
            KnownModel::Gemini25FlashLite => "gemini-2.5-flash-lite",
        }
    }

    /// The label shown in the status line.
    pub fn short_name(self) -> &'static str {
        match self {
            KnownModel::Gemini25Pro => "pro",
            KnownModel::Gemini25Flash => "flash",
            KnownModel::Gemini25FlashLite => "lite",
        }
    }

    /// Thinking budget sent with every request.
    ///
    /// Pro cannot disable thinking, so it gets the smallest budget allowed.
    pub fn thinking_budget(self) -> u32 {
        match self {
            KnownModel::Gemini25Pro => 128,
            KnownModel::Gemini25Flash | KnownModel::Gemini25FlashLite => 0,
        }
    }

    /// The model after this one, wrapping around.
    pub fn next(self) -> KnownModel {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl Model {
    /// The identifier used in API paths.
    pub fn api_name(&self) -> &str {
        match self {
            Model::Known(known) => known.api_name(),
            Model::Custom(custom) => custom,
        }
    }

    /// The label shown in the status line.
    pub fn short_name(&self) -> &str {
        match self {
            Model::Known(known) => known.short_name(),
            Model::Custom(custom) => custom,
        }
    }

    /// Thinking budget for known models; custom models use the API default.
    pub fn thinking_budget(&self) -> Option<u32> {
        match self {
            Model::Known(known) => Some(known.thinking_budget()),
            Model::Custom(_) => None,
        }
    }

    /// The next known model; a custom model cycles back to the first.
    pub fn next(&self) -> Model {
        match self {
            Model::Known(known) => Model::Known(known.next()),
            Model::Custom(_) => Model::Known(KnownModel::ALL[0]),
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gemini25Flash)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

impl FromStr for KnownModel {
    type Err = String;

    /// Accepts the API name or the short name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        KnownModel::ALL
            .into_iter()
            .find(|m| m.api_name() == wanted || m.short_name() == wanted)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<KnownModel>() {
            Ok(known) => Model::Known(known),
            Err(_) => Model::Custom(s.trim().to_string()),
        })
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}
