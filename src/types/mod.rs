// Public modules
pub mod content;
pub mod grounding;
pub mod model;
pub mod request;
pub mod response;

// Re-exports
pub use content::{Content, FileData, InlineData, Part, Role};
pub use grounding::{GroundingChunk, GroundingMetadata, UrlContextMetadata, UrlMetadata, WebChunk};
pub use model::{KnownModel, Model};
pub use request::{GenerateContentRequest, GenerationConfig, ThinkingConfig, Tool, ToolOptions};
pub use response::{Candidate, GenerateContentResponse, UsageMetadata};
