// Modular script acquisition architecture
//
// This module produces the narration script for a source video through a
// provider trait:
// - Gemini: remote video understanding via the Gemini File API
//
// To add a new inference service:
// 1. Create service-specific data structures for parsing JSON
// 2. Implement ScriptProvider for your service
// 3. Update the factory to create your implementation

pub mod common;
pub mod gemini;

use async_trait::async_trait;
use std::path::Path;

pub use common::*;

use crate::config::ScriptConfig;
use crate::error::Result;

/// Main trait for narration script acquisition
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScriptProvider: Send + Sync {
    /// Produce a narration script for the given source video.
    ///
    /// The returned text is best-effort prose from the remote service; it is
    /// never parsed as structured data.
    async fn acquire(&self, video_path: &Path) -> Result<String>;
}

/// Factory for creating script provider instances
pub struct ScriptProviderFactory;

impl ScriptProviderFactory {
    /// Create the default script provider implementation (Gemini-based)
    pub fn create_provider(config: ScriptConfig) -> Box<dyn ScriptProvider> {
        Box::new(gemini::GeminiScriptProvider::new(config))
    }
}
