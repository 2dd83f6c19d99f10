// Public modules
pub mod aggregator;
pub mod chat;
pub mod client;
pub mod error;
pub mod extract;
pub mod loader;
pub mod observability;
pub mod service;
pub mod sse;
pub mod types;

// Re-exports
pub use aggregator::{
    AggregatedResult, AggregatingStream, AggregatorState, Fragment, ResponseAggregator,
};
pub use client::Gemini;
pub use error::{Error, Result};
pub use extract::extract;
pub use observability::register_biometrics;
pub use service::{FragmentStream, QueryConfig, RemoteService, ToolToggles};
pub use types::*;
