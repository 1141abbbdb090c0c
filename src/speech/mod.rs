// Modular speech synthesis architecture
//
// This module converts narration text into a voice-over audio file through a
// synthesizer trait:
// - Edge: HTTP bridge to the Edge neural voices

pub mod edge;

use async_trait::async_trait;
use std::path::Path;
use std::str::FromStr;

use crate::config::SpeechConfig;
use crate::error::{RecapError, Result};

/// The narrator identities offered to the user.
///
/// Each maps to an opaque synthesizer voice id; the set is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceProfile {
    Male,
    Female,
}

impl VoiceProfile {
    /// Opaque voice identifier understood by the synthesis service
    pub fn voice_id(&self) -> &'static str {
        match self {
            VoiceProfile::Male => "my-MM-ThihaNeural",
            VoiceProfile::Female => "my-MM-NilarNeural",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VoiceProfile::Male => "Male (Thiha)",
            VoiceProfile::Female => "Female (Nilar)",
        }
    }

    pub fn all() -> &'static [VoiceProfile] {
        &[VoiceProfile::Male, VoiceProfile::Female]
    }
}

impl FromStr for VoiceProfile {
    type Err = RecapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "male" => Ok(VoiceProfile::Male),
            "female" => Ok(VoiceProfile::Female),
            other => Err(RecapError::Validation(format!(
                "Unknown voice: {} (expected male or female)",
                other
            ))),
        }
    }
}

/// Main trait for speech synthesis operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize narration audio for the given text, writing the audio
    /// bytes to `output_path`
    async fn synthesize(
        &self,
        text: &str,
        voice: VoiceProfile,
        output_path: &Path,
    ) -> Result<()>;
}

/// Factory for creating speech synthesizer instances
pub struct SpeechSynthesizerFactory;

impl SpeechSynthesizerFactory {
    /// Create the default synthesizer implementation (Edge bridge)
    pub fn create_synthesizer(config: SpeechConfig) -> Box<dyn SpeechSynthesizer> {
        Box::new(edge::EdgeSpeechSynthesizer::new(config))
    }
}
