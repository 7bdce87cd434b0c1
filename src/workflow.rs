use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::burn::{locate_subtitles, validate_subtitle_file, SubtitleStyle};
use crate::checksum::{ChecksumReport, HashAlgorithm};
use crate::config::Config;
use crate::error::{Result, VidToolsError};
use crate::media::{AudioOptions, MediaProcessorFactory, MediaProcessorTrait};
use crate::paths::{
    derived_output, discover_videos, file_name, file_stem, is_video, prepare_output, require_file,
    sibling_output, DiscoveredFile,
};
use crate::probe::ProbeReport;
use crate::subtitle::{write_transcript, TranscriptFormat};
use crate::transcribe::{TranscribeOptions, TranscriberFactory, TranscriberTrait, Transcription};
use crate::watermark::{
    analyze_observations, normalize_text, sample_times, Region, RegionObservation,
    TesseractRecognizer, TextRecognizer, WatermarkReport,
};

/// Per-file results of a multi-input command
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub completed: Vec<T>,
    pub failed: Vec<(PathBuf, VidToolsError)>,
}

impl<T> BatchOutcome<T> {
    fn new() -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn record(&mut self, path: &Path, result: Result<T>) {
        match result {
            Ok(value) => {
                info!("Successfully processed: {}", path.display());
                self.completed.push(value);
            }
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                self.failed.push((path.to_path_buf(), e));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    /// Fails when any file of the batch failed. A batch of one hands back
    /// that file's own error so a tool's exit code survives.
    pub fn ensure_success(mut self) -> Result<()> {
        let total = self.total();
        match self.failed.len() {
            0 => Ok(()),
            1 if total == 1 => Err(self.failed.remove(0).1),
            failed => Err(VidToolsError::Batch { failed, total }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedFile {
    pub output: PathBuf,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionOutcome {
    pub subtitle_path: PathBuf,
    pub video_path: PathBuf,
    pub cues: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolStatus {
    pub name: &'static str,
    pub available: bool,
    pub detail: String,
}

fn progress_bar(len: usize, message: &'static str) -> ProgressBar {
    if len < 2 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})") {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message);
    pb
}

/// Derive the output for `file` and reserve it for this run. Two inputs with
/// the same name flattened into one `--output-dir` must not overwrite each other.
fn claim_output(
    claimed: &mut HashSet<PathBuf>,
    file: &DiscoveredFile,
    output_dir: Option<&Path>,
    conventional_dir: &str,
) -> Result<PathBuf> {
    let output = derived_output(file, output_dir, conventional_dir, &file_name(&file.path)?);
    if !claimed.insert(output.clone()) {
        return Err(VidToolsError::InvalidArgument(format!(
            "{} would overwrite {} written earlier in this run",
            file.path.display(),
            output.display()
        )));
    }
    Ok(output)
}

pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Box<dyn TranscriberTrait>,
    recognizer: Box<dyn TextRecognizer>,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let transcriber = TranscriberFactory::create_default(config.transcriber.clone());
        let recognizer = Box::new(TesseractRecognizer::new(config.ocr.clone()));

        Self::with_components(config, media, transcriber, recognizer)
    }

    pub fn with_components(
        config: Config,
        media: Box<dyn MediaProcessorTrait>,
        transcriber: Box<dyn TranscriberTrait>,
        recognizer: Box<dyn TextRecognizer>,
    ) -> Self {
        Self {
            config,
            media,
            transcriber,
            recognizer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn discover(&self, inputs: &[PathBuf]) -> Result<Vec<DiscoveredFile>> {
        let output = &self.config.output;
        let skip = [
            output.clean_dir.as_str(),
            output.tagged_dir.as_str(),
            output.audio_dir.as_str(),
            output.transcript_dir.as_str(),
            output.subtitle_dir.as_str(),
            output.burned_dir.as_str(),
        ];

        let files = discover_videos(inputs, &skip)?;
        if files.is_empty() {
            return Err(VidToolsError::InvalidArgument("No video files found in the given inputs".to_string()));
        }
        info!("Found {} video files to process", files.len());
        Ok(files)
    }

    /// Remove metadata and chapters from every input, writing copies to the clean directory
    pub async fn strip_metadata(&self, inputs: &[PathBuf], output_dir: Option<&Path>) -> Result<BatchOutcome<PathBuf>> {
        let files = self.discover(inputs)?;
        let mut outcome = BatchOutcome::new();
        let pb = progress_bar(files.len(), "Stripping metadata");
        let mut claimed = HashSet::new();

        for file in &files {
            let result = match claim_output(&mut claimed, file, output_dir, &self.config.output.clean_dir) {
                Ok(output) => self.strip_one(file, output).await,
                Err(e) => Err(e),
            };
            outcome.record(&file.path, result);
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(outcome)
    }

    async fn strip_one(&self, file: &DiscoveredFile, output: PathBuf) -> Result<PathBuf> {
        prepare_output(&file.path, &output).await?;

        self.media.strip_metadata(&file.path, &output).await?;
        Ok(output)
    }

    /// Rewrite the comment tag of every input. Without an explicit comment each
    /// file gets its own random UUID.
    pub async fn set_comment(
        &self,
        inputs: &[PathBuf],
        comment: Option<&str>,
        output_dir: Option<&Path>,
    ) -> Result<BatchOutcome<TaggedFile>> {
        let files = self.discover(inputs)?;
        let mut outcome = BatchOutcome::new();
        let pb = progress_bar(files.len(), "Rewriting comments");
        let mut claimed = HashSet::new();

        for file in &files {
            let comment = comment
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let result = match claim_output(&mut claimed, file, output_dir, &self.config.output.tagged_dir) {
                Ok(output) => self.comment_one(file, output, comment).await,
                Err(e) => Err(e),
            };
            outcome.record(&file.path, result);
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(outcome)
    }

    async fn comment_one(&self, file: &DiscoveredFile, output: PathBuf, comment: String) -> Result<TaggedFile> {
        prepare_output(&file.path, &output).await?;

        self.media.set_comment(&file.path, &output, &comment).await?;
        Ok(TaggedFile { output, comment })
    }

    /// Extract the audio track of `input`
    pub async fn extract_audio(&self, input: &Path, output: Option<&Path>, options: &AudioOptions) -> Result<PathBuf> {
        require_file(input)?;

        let output = match output {
            Some(path) => path.to_path_buf(),
            None => {
                let name = format!("{}.{}", file_stem(input)?, options.format.extension());
                sibling_output(input, &self.config.output.audio_dir, &name)
            }
        };
        prepare_output(input, &output).await?;

        self.media.extract_audio(input, &output, options).await?;
        Ok(output)
    }

    /// Run speech recognition on an audio file, or on a video's audio track via a temporary wav
    async fn transcribe_media(&self, input: &Path, options: &TranscribeOptions) -> Result<Transcription> {
        if !is_video(input) {
            return self.transcriber.transcribe(input, options).await;
        }

        let temp_dir = tempfile::tempdir()?;
        let audio = temp_dir.path().join(format!("{}.wav", file_stem(input)?));

        info!("Extracting audio for transcription");
        self.media
            .extract_audio(input, &audio, &AudioOptions::for_transcription())
            .await?;

        let transcription = self.transcriber.transcribe(&audio, options).await;
        if let Err(e) = temp_dir.close() {
            warn!("Failed to remove temporary audio: {}", e);
        }
        transcription
    }

    /// Transcribe `input` and write the transcript in `format`
    pub async fn transcribe(
        &self,
        input: &Path,
        output: Option<&Path>,
        format: TranscriptFormat,
        options: &TranscribeOptions,
    ) -> Result<PathBuf> {
        require_file(input)?;

        let transcription = self.transcribe_media(input, options).await?;
        if transcription.segments.is_empty() && transcription.text.trim().is_empty() {
            return Err(VidToolsError::Transcription(format!("No speech recognized in {}", input.display())));
        }

        let output = match output {
            Some(path) => path.to_path_buf(),
            None => {
                let name = format!("{}.{}", file_stem(input)?, format.extension());
                sibling_output(input, &self.config.output.transcript_dir, &name)
            }
        };
        prepare_output(input, &output).await?;

        write_transcript(&transcription, &output, format).await?;
        info!("Transcription saved to: {}", output.display());
        Ok(output)
    }

    /// Raw ffprobe JSON
    pub async fn probe_raw(&self, input: &Path) -> Result<String> {
        require_file(input)?;
        self.media.probe_raw(input).await
    }

    pub async fn probe(&self, input: &Path) -> Result<ProbeReport> {
        let json = self.probe_raw(input).await?;
        ProbeReport::parse(&json)
    }

    /// Per-stream checksums of every input
    pub async fn checksums(&self, inputs: &[PathBuf], algorithm: HashAlgorithm) -> Result<BatchOutcome<ChecksumReport>> {
        let files = self.discover(inputs)?;
        let mut outcome = BatchOutcome::new();
        let pb = progress_bar(files.len(), "Hashing streams");

        for file in &files {
            let result = self
                .media
                .stream_checksums(&file.path, algorithm)
                .await
                .map(|streams| ChecksumReport::new(file.path.clone(), algorithm, streams));
            outcome.record(&file.path, result);
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(outcome)
    }

    /// Look for recurring burned-in text in the corners of every input
    pub async fn detect_watermarks(&self, inputs: &[PathBuf], samples: Option<usize>) -> Result<BatchOutcome<WatermarkReport>> {
        let samples = samples.unwrap_or(self.config.ocr.samples);
        if samples == 0 {
            return Err(VidToolsError::InvalidArgument("--samples must be at least 1".to_string()));
        }

        let files = self.discover(inputs)?;
        let mut outcome = BatchOutcome::new();
        let pb = progress_bar(files.len(), "Scanning for watermarks");

        for file in &files {
            let result = self.detect_watermark(&file.path, samples).await;
            outcome.record(&file.path, result);
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(outcome)
    }

    async fn detect_watermark(&self, input: &Path, samples: usize) -> Result<WatermarkReport> {
        let ocr = &self.config.ocr;
        let report = self.probe(input).await?;
        if report.video_streams().next().is_none() {
            return Err(VidToolsError::Media(format!("No video stream in {}", input.display())));
        }
        let duration = report
            .duration_secs()
            .ok_or_else(|| VidToolsError::Media(format!("Cannot determine duration of {}", input.display())))?;

        let temp_dir = tempfile::tempdir()?;
        let mut observations = Vec::new();

        for (sample, at) in sample_times(duration, samples).into_iter().enumerate() {
            for region in Region::ALL {
                let image = temp_dir.path().join(format!("{:03}-{}.png", sample, region.name()));
                let crop = region.crop_filter(ocr.region_width, ocr.region_height);
                self.media.extract_frame(input, at, &crop, &image).await?;

                let raw = self.recognizer.recognize(&image).await?;
                if let Some(text) = normalize_text(&raw, ocr.min_text_len) {
                    observations.push(RegionObservation { region, sample, text });
                }
            }
        }

        let candidates = analyze_observations(&observations, samples, ocr.min_occurrence_ratio);
        Ok(WatermarkReport {
            file: input.to_path_buf(),
            samples,
            candidates,
        })
    }

    /// Burn a subtitle file into `input`. Without `subtitle` the file is looked up
    /// next to the video and in the subtitle/transcript directories.
    pub async fn burn_subtitles(
        &self,
        input: &Path,
        subtitle: Option<&Path>,
        output: Option<&Path>,
        style: &SubtitleStyle,
    ) -> Result<PathBuf> {
        require_file(input)?;

        let subtitle = match subtitle {
            Some(path) => path.to_path_buf(),
            None => locate_subtitles(input, &self.config.output)?,
        };
        let cues = validate_subtitle_file(&subtitle)?;
        info!("Using {} ({} cues)", subtitle.display(), cues);

        let output = self.burned_output(input, output)?;
        prepare_output(input, &output).await?;

        self.media.burn_subtitles(input, &subtitle, &output, style).await?;
        Ok(output)
    }

    fn burned_output(&self, input: &Path, output: Option<&Path>) -> Result<PathBuf> {
        Ok(match output {
            Some(path) => path.to_path_buf(),
            None => sibling_output(input, &self.config.output.burned_dir, &file_name(input)?),
        })
    }

    /// Extract audio, transcribe, write and validate the SRT, then burn it into the video
    pub async fn caption(
        &self,
        input: &Path,
        options: &TranscribeOptions,
        output: Option<&Path>,
        style: &SubtitleStyle,
    ) -> Result<CaptionOutcome> {
        require_file(input)?;
        if !is_video(input) {
            return Err(VidToolsError::UnsupportedFormat(format!("not a video file: {}", input.display())));
        }

        let transcription = self.transcribe_media(input, options).await?;

        let srt_name = format!("{}.srt", file_stem(input)?);
        let subtitle_path = sibling_output(input, &self.config.output.subtitle_dir, &srt_name);
        prepare_output(input, &subtitle_path).await?;
        write_transcript(&transcription, &subtitle_path, TranscriptFormat::Srt).await?;

        let cues = validate_subtitle_file(&subtitle_path)?;
        info!("Generated {} subtitle cues", cues);

        let video_path = self.burned_output(input, output)?;
        prepare_output(input, &video_path).await?;
        self.media.burn_subtitles(input, &subtitle_path, &video_path, style).await?;

        Ok(CaptionOutcome {
            subtitle_path,
            video_path,
            cues,
        })
    }

    /// Availability of every external tool
    pub async fn check_tools(&self) -> Vec<ToolStatus> {
        let status = |name, result: Result<String>| match result {
            Ok(detail) => ToolStatus { name, available: true, detail },
            Err(e) => ToolStatus { name, available: false, detail: e.to_string() },
        };

        vec![
            status("ffmpeg/ffprobe", self.media.get_version_info().await),
            status(
                "whisper",
                self.transcriber
                    .check_availability()
                    .map(|_| self.config.transcriber.binary_path.clone()),
            ),
            status(
                "tesseract",
                self.recognizer
                    .check_availability()
                    .map(|_| self.config.ocr.binary_path.clone()),
            ),
        ]
    }
}
