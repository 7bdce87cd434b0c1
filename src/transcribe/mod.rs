// Speech-to-text over an external transcription tool
//
// The trait keeps orchestration independent of the recognizer; the whisper
// CLI implementation lives in `whisper`.

pub mod whisper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use whisper::WhisperTranscriber;

use crate::config::TranscriberConfig;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<TranscriptionSegment>,
    pub language: Option<String>,
    /// Recognizer output as received, written verbatim by the json format
    #[serde(skip)]
    pub raw: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscribeOptions {
    pub model: String,
    /// `None` lets the recognizer detect the language
    pub language: Option<String>,
}

impl TranscribeOptions {
    /// Command line values win over configuration; "auto" means detect
    pub fn resolve(config: &TranscriberConfig, model: Option<String>, language: Option<String>) -> Self {
        let language = language
            .or_else(|| config.language.clone())
            .filter(|l| !l.trim().is_empty() && !l.eq_ignore_ascii_case("auto"));

        Self {
            model: model.unwrap_or_else(|| config.model.clone()),
            language,
        }
    }
}

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe audio file to text
    async fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<Transcription>;

    /// Check if the transcription tool can be launched
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_default(config: TranscriberConfig) -> Box<dyn TranscriberTrait> {
        Box::new(WhisperTranscriber::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_prefer_cli_values() {
        let config = TranscriberConfig {
            language: Some("ja".to_string()),
            ..TranscriberConfig::default()
        };

        let options = TranscribeOptions::resolve(&config, Some("small".to_string()), Some("en".to_string()));
        assert_eq!(options.model, "small");
        assert_eq!(options.language.as_deref(), Some("en"));

        let options = TranscribeOptions::resolve(&config, None, None);
        assert_eq!(options.model, "base");
        assert_eq!(options.language.as_deref(), Some("ja"));
    }

    #[test]
    fn test_auto_language_means_detect() {
        let config = TranscriberConfig::default();
        let options = TranscribeOptions::resolve(&config, None, Some("AUTO".to_string()));
        assert_eq!(options.language, None);
    }
}
