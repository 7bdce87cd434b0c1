use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::burn::{subtitle_filter, SubtitleStyle};
use crate::checksum::{parse_stream_hashes, HashAlgorithm, StreamChecksum};
use crate::config::MediaConfig;
use crate::error::{Result, VidToolsError};
use super::{AudioOptions, MediaCommandBuilder, MediaProcessorTrait};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    ffmpeg: MediaCommandBuilder,
    ffprobe: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let ffmpeg = MediaCommandBuilder::new(&config.ffmpeg_path);
        let ffprobe = MediaCommandBuilder::new(&config.ffprobe_path);

        Self {
            config,
            ffmpeg,
            ffprobe,
        }
    }

    fn first_version_line(binary: &str) -> Result<String> {
        let output = Command::new(binary)
            .arg("-version")
            .output()
            .map_err(|e| VidToolsError::Launch {
                tool: binary.to_string(),
                source: e,
            })?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            Ok(version_info.lines().next().unwrap_or("Unknown version").to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(VidToolsError::Media(format!("{} version check failed: {}", binary, stderr)))
        }
    }
}

/// A tool can exit 0 and still leave nothing behind; treat that as a failure
pub fn ensure_output(path: &Path, description: &str) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(VidToolsError::Media(format!(
            "{} produced an empty file: {}",
            description,
            path.display()
        ))),
        Err(_) => Err(VidToolsError::Media(format!(
            "{} did not produce {}",
            description,
            path.display()
        ))),
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn strip_metadata(&self, input: &Path, output: &Path) -> Result<()> {
        info!("Stripping metadata from {} -> {}", input.display(), output.display());

        self.ffmpeg.strip_metadata(input, output).execute().await?;
        ensure_output(output, "Metadata stripping")
    }

    async fn set_comment(&self, input: &Path, output: &Path, comment: &str) -> Result<()> {
        info!("Setting comment on {} -> {}", input.display(), output.display());
        debug!("Comment: {}", comment);

        self.ffmpeg.set_comment(input, output, comment).execute().await?;
        ensure_output(output, "Comment rewrite")
    }

    async fn extract_audio(&self, video_path: &Path, audio_path: &Path, options: &AudioOptions) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.ffmpeg.extract_audio(video_path, audio_path, options).execute().await?;
        ensure_output(audio_path, "Audio extraction")?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        style: &SubtitleStyle,
    ) -> Result<()> {
        info!("Burning subtitles from {} into {} -> {}",
              subtitle_path.display(), video_path.display(), output_path.display());

        let filter = subtitle_filter(subtitle_path, style)?;
        let command = self.ffmpeg.burn_subtitles(
            video_path,
            output_path,
            filter,
            &self.config.burn_options,
        );
        command.execute().await?;
        ensure_output(output_path, "Subtitle burning")?;

        info!("Subtitle burning completed successfully");
        Ok(())
    }

    async fn probe_raw(&self, input: &Path) -> Result<String> {
        debug!("Probing {}", input.display());
        self.ffprobe.probe(input).execute_capture().await
    }

    async fn stream_checksums(&self, input: &Path, algorithm: HashAlgorithm) -> Result<Vec<StreamChecksum>> {
        info!("Hashing streams of {} with {}", input.display(), algorithm.ffmpeg_name());

        let stdout = self.ffmpeg.stream_hash(input, algorithm).execute_capture().await?;
        let checksums = parse_stream_hashes(&stdout)?;
        if checksums.is_empty() {
            return Err(VidToolsError::Media(format!(
                "No streams hashed in {}",
                input.display()
            )));
        }
        Ok(checksums)
    }

    async fn extract_frame(
        &self,
        video_path: &Path,
        at_seconds: f64,
        crop_filter: &str,
        image_path: &Path,
    ) -> Result<()> {
        self.ffmpeg
            .extract_frame(video_path, at_seconds, crop_filter, image_path)
            .execute()
            .await?;
        ensure_output(image_path, "Frame extraction")
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let ffmpeg = Self::first_version_line(&self.config.ffmpeg_path)?;
        let ffprobe = Self::first_version_line(&self.config.ffprobe_path)?;
        Ok(format!("{}\n{}", ffmpeg, ffprobe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_ensure_output_rejects_missing_and_empty_files() {
        let dir = assert_fs::TempDir::new().unwrap();
        let missing = dir.child("missing.mp4");
        let empty = dir.child("empty.mp4");
        empty.touch().unwrap();
        let full = dir.child("full.mp4");
        full.write_binary(b"\x00\x00\x00\x18ftyp").unwrap();

        assert!(ensure_output(missing.path(), "Metadata stripping").is_err());
        let err = ensure_output(empty.path(), "Metadata stripping").unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert!(ensure_output(full.path(), "Metadata stripping").is_ok());
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_reports_launch_error() {
        let processor = MediaProcessorImpl::new(MediaConfig {
            ffmpeg_path: "vidtools-missing-ffmpeg".to_string(),
            ffprobe_path: "vidtools-missing-ffprobe".to_string(),
            burn_options: Vec::new(),
        });

        assert!(matches!(
            processor.get_version_info().await,
            Err(VidToolsError::Launch { .. })
        ));
        let err = processor
            .strip_metadata(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, VidToolsError::Launch { .. }));
    }
}
