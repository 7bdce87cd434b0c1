use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::burn::SubtitleStyle;
use crate::error::{Result, VidToolsError};

/// Configuration file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "vidtools.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub transcriber: TranscriberConfig,
    pub ocr: OcrConfig,
    pub output: OutputConfig,
    pub style: SubtitleStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Additional encoding options for subtitle burning
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub burn_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to the whisper command line tool
    pub binary_path: String,
    /// Default whisper model (tiny, base, small, medium, large)
    pub model: String,
    /// Default language; `None` or "auto" lets whisper detect it
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Path to tesseract binary
    pub binary_path: String,
    /// Number of frames sampled across the video
    pub samples: usize,
    /// Fraction of samples a text must appear in to count as a watermark
    pub min_occurrence_ratio: f64,
    /// Corner region width as a fraction of the frame width
    pub region_width: f64,
    /// Corner region height as a fraction of the frame height
    pub region_height: f64,
    /// Recognized text shorter than this is treated as noise
    pub min_text_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub clean_dir: String,
    pub tagged_dir: String,
    pub audio_dir: String,
    pub transcript_dir: String,
    pub subtitle_dir: String,
    pub burned_dir: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            burn_options: vec![
                // "-preset".to_string(), "medium".to_string(),
                // "-crf".to_string(), "23".to_string(),
            ],
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper".to_string(),
            model: "base".to_string(),
            language: None,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary_path: "tesseract".to_string(),
            samples: 8,
            min_occurrence_ratio: 0.6,
            region_width: 0.25,
            region_height: 0.15,
            min_text_len: 3,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            clean_dir: "clean".to_string(),
            tagged_dir: "tagged".to_string(),
            audio_dir: "audio".to_string(),
            transcript_dir: "transcripts".to_string(),
            subtitle_dir: "subtitles".to_string(),
            burned_dir: "subtitled".to_string(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VidToolsError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| VidToolsError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VidToolsError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VidToolsError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load the explicit config file, else `vidtools.toml` in the working directory, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ocr.samples == 0 {
            return Err(VidToolsError::Config("ocr.samples must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.ocr.min_occurrence_ratio) {
            return Err(VidToolsError::Config(
                "ocr.min_occurrence_ratio must be between 0 and 1".to_string(),
            ));
        }
        for (name, value) in [("region_width", self.ocr.region_width), ("region_height", self.ocr.region_height)] {
            if value <= 0.0 || value > 1.0 {
                return Err(VidToolsError::Config(format!("ocr.{} must be in (0, 1]", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [transcriber]
            model = "small"

            [output]
            burned_dir = "burned"
            "#,
        )
        .unwrap();

        assert_eq!(config.transcriber.model, "small");
        assert_eq!(config.transcriber.binary_path, "whisper");
        assert_eq!(config.output.burned_dir, "burned");
        assert_eq!(config.output.clean_dir, "clean");
        assert_eq!(config.media.ffprobe_path, "ffprobe");
        assert_eq!(config.ocr.samples, 8);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("vidtools.toml");

        let mut config = Config::default();
        config.media.burn_options = vec!["-crf".to_string(), "20".to_string()];
        config.save_to_file(file.path()).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert!(written.contains("burn_options"));
        let loaded = Config::from_file(file.path()).unwrap();
        assert_eq!(loaded.media.burn_options, vec!["-crf", "20"]);
        assert_eq!(loaded.style.font_size, config.style.font_size);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("broken.toml");
        file.write_str("[media\nffmpeg_path = ").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, VidToolsError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_ocr_settings() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.ocr.samples = 0;
        assert!(config.validate().is_err());

        config.ocr.samples = 4;
        config.ocr.region_width = 1.5;
        assert!(config.validate().is_err());
    }
}
