use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::config::TranscriberConfig;
use crate::error::{Result, VidToolsError};
use crate::media::MediaCommand;
use super::{TranscribeOptions, TranscriberTrait, Transcription, TranscriptionSegment};

/// Whisper CLI JSON output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperOutput {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<WhisperSegment>,
    pub language: Option<String>,
}

/// Whisper CLI segment format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl From<WhisperOutput> for Transcription {
    fn from(output: WhisperOutput) -> Self {
        let segments = output
            .segments
            .into_iter()
            .map(|seg| TranscriptionSegment {
                id: seg.id,
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
            })
            .collect();

        Transcription {
            text: output.text.trim().to_string(),
            segments,
            language: output.language,
            raw: None,
        }
    }
}

/// Transcriber backed by the `whisper` command line tool
pub struct WhisperTranscriber {
    config: TranscriberConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    pub fn command(&self, audio_path: &Path, output_dir: &Path, options: &TranscribeOptions) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.config.binary_path, "Transcription")
            .path(audio_path)
            .arg("--model").arg(&options.model)
            .arg("--output_dir").path(output_dir)
            .arg("--output_format").arg("json")
            .arg("--verbose").arg("False");

        if let Some(lang) = &options.language {
            cmd = cmd.arg("--language").arg(lang);
        }

        cmd
    }

    /// Parse the JSON document whisper writes next to its other outputs
    pub fn parse_output(json_content: &str) -> Result<Transcription> {
        let invalid = |e: serde_json::Error| VidToolsError::Transcription(format!("Failed to parse whisper JSON: {}", e));

        let raw: serde_json::Value = serde_json::from_str(json_content).map_err(invalid)?;
        let output: WhisperOutput = serde_json::from_value(raw.clone()).map_err(invalid)?;

        let mut transcription = Transcription::from(output);
        transcription.raw = Some(raw);
        Ok(transcription)
    }
}

#[async_trait]
impl TranscriberTrait for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<Transcription> {
        info!("Transcribing {} with model {}", audio_path.display(), options.model);

        let temp_dir = tempfile::tempdir()
            .map_err(|e| VidToolsError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        self.command(audio_path, output_dir, options).execute().await?;

        let audio_filename = audio_path
            .file_stem()
            .ok_or_else(|| VidToolsError::Transcription("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_filename.to_string_lossy()));

        let json_content = tokio::fs::read_to_string(&json_file).await.map_err(|e| {
            VidToolsError::Transcription(format!(
                "whisper produced no output at {}: {}",
                json_file.display(),
                e
            ))
        })?;

        let transcription = Self::parse_output(&json_content)?;
        info!(
            "Transcription completed: {} segments, language {}",
            transcription.segments.len(),
            transcription.language.as_deref().unwrap_or("unknown")
        );
        Ok(transcription)
    }

    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--help")
            .output()
            .map_err(|e| VidToolsError::Launch {
                tool: self.config.binary_path.clone(),
                source: e,
            })?;

        if output.status.success() {
            info!("whisper command-line tool is available");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(VidToolsError::Transcription(format!(
                "whisper not available. Install with: pip install openai-whisper\nError: {}",
                stderr
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "text": " Hello there. General Kenobi.",
        "segments": [
            {"id": 0, "seek": 0, "start": 0.0, "end": 1.52, "text": " Hello there.",
             "tokens": [50364, 2425], "temperature": 0.0, "avg_logprob": -0.21,
             "compression_ratio": 0.8, "no_speech_prob": 0.01},
            {"id": 1, "seek": 0, "start": 1.52, "end": 3.0, "text": " General Kenobi.",
             "tokens": [50440], "temperature": 0.0, "avg_logprob": -0.3,
             "compression_ratio": 0.8, "no_speech_prob": 0.02}
        ],
        "language": "en"
    }"#;

    #[test]
    fn test_parse_whisper_output() {
        let transcription = WhisperTranscriber::parse_output(SAMPLE).unwrap();
        assert_eq!(transcription.text, "Hello there. General Kenobi.");
        assert_eq!(transcription.language.as_deref(), Some("en"));
        assert_eq!(transcription.segments.len(), 2);
        assert_eq!(transcription.segments[1].text, "General Kenobi.");
        assert_eq!(transcription.segments[1].start, 1.52);
    }

    #[test]
    fn test_parse_keeps_full_whisper_result() {
        let transcription = WhisperTranscriber::parse_output(SAMPLE).unwrap();
        assert_eq!(transcription.segments[0].id, 0);
        assert_eq!(transcription.segments[1].id, 1);

        let raw = transcription.raw.as_ref().unwrap();
        assert_eq!(raw["segments"][0]["tokens"], serde_json::json!([50364, 2425]));
        assert_eq!(raw["segments"][1]["no_speech_prob"], serde_json::json!(0.02));
    }

    #[test]
    fn test_segment_id_out_of_range_is_rejected() {
        let json = r#"{"text": "x", "segments": [{"id": 4294967296, "start": 0.0, "end": 1.0, "text": "x"}]}"#;
        assert!(WhisperTranscriber::parse_output(json).is_err());
    }

    #[test]
    fn test_parse_rejects_non_whisper_json() {
        let err = WhisperTranscriber::parse_output(r#"{"segments": []}"#).unwrap_err();
        assert!(matches!(err, VidToolsError::Transcription(_)));
    }

    #[test]
    fn test_command_with_language() {
        let transcriber = WhisperTranscriber::new(TranscriberConfig::default());
        let options = TranscribeOptions {
            model: "small".to_string(),
            language: Some("fr".to_string()),
        };
        let cmd = transcriber.command(Path::new("a.wav"), Path::new("/tmp/out"), &options);

        assert_eq!(cmd.binary_path, "whisper");
        assert_eq!(
            cmd.args,
            vec![
                "a.wav", "--model", "small", "--output_dir", "/tmp/out", "--output_format", "json",
                "--verbose", "False", "--language", "fr"
            ]
        );
    }

    #[test]
    fn test_command_without_language_lets_whisper_detect() {
        let transcriber = WhisperTranscriber::new(TranscriberConfig::default());
        let options = TranscribeOptions {
            model: "base".to_string(),
            language: None,
        };
        let cmd = transcriber.command(Path::new("a.wav"), Path::new("out"), &options);
        assert!(!cmd.args.iter().any(|a| a == "--language"));
    }
}
