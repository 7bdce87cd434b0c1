use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::checksum::HashAlgorithm;
use crate::error::{Result, VidToolsError};
use super::AudioOptions;

/// Abstract external tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").path(path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.path(path)
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Only report errors on stderr
    pub fn quiet(self) -> Self {
        self.arg("-v").arg("error")
    }

    /// Map every stream of the first input
    pub fn map_all(self) -> Self {
        self.arg("-map").arg("0")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy every stream without re-encoding
    pub fn copy_streams(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Set a container-level metadata tag
    pub fn metadata(self, key: &str, value: &str) -> Self {
        self.arg("-metadata").arg(format!("{}={}", key, value))
    }

    /// Seek the input to `seconds` before decoding
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format!("{:.3}", seconds))
    }

    fn build(&self) -> Command {
        debug!("Executing {}: {} {:?}", self.description, self.binary_path, self.args);
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);
        cmd
    }

    fn check_status(&self, output: &std::process::Output) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(VidToolsError::Tool {
            tool: self.binary_path.clone(),
            description: self.description.clone(),
            code: output.status.code(),
            stderr,
        })
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        let output = self.build().output().await.map_err(|e| VidToolsError::Launch {
            tool: self.binary_path.clone(),
            source: e,
        })?;
        self.check_status(&output)
    }

    /// Execute the command and return its stdout
    pub async fn execute_capture(&self) -> Result<String> {
        let output = self.build().output().await.map_err(|e| VidToolsError::Launch {
            tool: self.binary_path.clone(),
            source: e,
        })?;
        self.check_status(&output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the ffmpeg/ffprobe invocations behind each command
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build metadata stripping command (stream copy)
    pub fn strip_metadata<P: AsRef<Path>>(&self, input: P, output: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Metadata stripping")
            .overwrite()
            .input(input)
            .map_all()
            .arg("-map_metadata").arg("-1")
            .arg("-map_chapters").arg("-1")
            .copy_streams()
            .output(output)
    }

    /// Build comment rewrite command (stream copy, other tags kept)
    pub fn set_comment<P: AsRef<Path>>(&self, input: P, output: P, comment: &str) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Comment rewrite")
            .overwrite()
            .input(input)
            .map_all()
            .arg("-map_metadata").arg("0")
            .copy_streams()
            .metadata("comment", comment)
            .output(output)
    }

    /// Build audio extraction command
    pub fn extract_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        options: &AudioOptions,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .args(options.format.codec_args().iter().copied());

        if let Some(rate) = options.sample_rate {
            cmd = cmd.audio_sample_rate(rate);
        }
        if options.mono {
            cmd = cmd.audio_channels(1);
        }

        cmd.overwrite().output(audio_path)
    }

    /// Build subtitle burning command; `filter` is a complete `subtitles=` filter
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        output_path: P,
        filter: String,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Subtitle burning")
            .overwrite()
            .input(&video_path)
            .video_filter(filter)
            .video_codec("libx264")
            .copy_audio();

        // Add user-specified additional options
        for option in additional_options {
            cmd = cmd.arg(option);
        }

        cmd.output(output_path)
    }

    /// Build per-stream hash command writing `index,type,ALG=digest` lines to stdout
    pub fn stream_hash<P: AsRef<Path>>(&self, input: P, algorithm: HashAlgorithm) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Stream checksum")
            .quiet()
            .input(input)
            .map_all()
            .copy_streams()
            .arg("-f").arg("streamhash")
            .arg("-hash").arg(algorithm.ffmpeg_name())
            .arg("-")
    }

    /// Build single cropped frame extraction command
    pub fn extract_frame<P: AsRef<Path>>(
        &self,
        video_path: P,
        at_seconds: f64,
        crop_filter: &str,
        image_path: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Frame extraction")
            .quiet()
            .seek(at_seconds)
            .input(video_path)
            .arg("-frames:v").arg("1")
            .video_filter(crop_filter)
            .overwrite()
            .output(image_path)
    }

    /// Build ffprobe JSON format/stream query
    pub fn probe<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Stream probe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .path(input)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check")
            .arg("-version")
    }
}
