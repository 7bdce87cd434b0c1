//! Burned-in watermark detection.
//!
//! Frames are sampled evenly across the video, each corner region is cropped
//! and handed to an OCR engine, and text that keeps reappearing in the same
//! corner is reported as a watermark candidate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{Result, VidToolsError};
use crate::media::MediaCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::TopLeft,
        Region::TopRight,
        Region::BottomLeft,
        Region::BottomRight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Region::TopLeft => "top-left",
            Region::TopRight => "top-right",
            Region::BottomLeft => "bottom-left",
            Region::BottomRight => "bottom-right",
        }
    }

    /// ffmpeg crop filter selecting this corner, sized as fractions of the frame
    pub fn crop_filter(&self, width: f64, height: f64) -> String {
        let x = match self {
            Region::TopLeft | Region::BottomLeft => "0".to_string(),
            Region::TopRight | Region::BottomRight => format!("iw*{}", 1.0 - width),
        };
        let y = match self {
            Region::TopLeft | Region::TopRight => "0".to_string(),
            Region::BottomLeft | Region::BottomRight => format!("ih*{}", 1.0 - height),
        };
        format!("crop=iw*{}:ih*{}:{}:{}", width, height, x, y)
    }
}

/// OCR text seen in one region of one sampled frame
#[derive(Debug, Clone, PartialEq)]
pub struct RegionObservation {
    pub region: Region,
    pub sample: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkCandidate {
    pub region: Region,
    pub text: String,
    pub occurrences: usize,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkReport {
    pub file: PathBuf,
    pub samples: usize,
    pub candidates: Vec<WatermarkCandidate>,
}

impl WatermarkReport {
    pub fn detected(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn render(&self) -> String {
        if !self.detected() {
            return format!("{}: no watermark detected ({} samples)", self.file.display(), self.samples);
        }

        let mut lines = vec![format!("{}: watermark detected ({} samples)", self.file.display(), self.samples)];
        for candidate in &self.candidates {
            lines.push(format!(
                "  {:<12} \"{}\" in {}/{} frames ({:.0}%)",
                candidate.region.name(),
                candidate.text,
                candidate.occurrences,
                self.samples,
                candidate.ratio * 100.0
            ));
        }
        lines.join("\n")
    }
}

/// Evenly spaced sample timestamps, each at the middle of its slice
pub fn sample_times(duration: f64, samples: usize) -> Vec<f64> {
    (0..samples)
        .map(|i| (i as f64 + 0.5) * duration / samples as f64)
        .collect()
}

/// Lowercase alphanumeric words joined by single spaces; short results count as noise
pub fn normalize_text(raw: &str, min_len: usize) -> Option<String> {
    let normalized = raw
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    if normalized.chars().filter(|c| c.is_alphanumeric()).count() < min_len {
        None
    } else {
        Some(normalized)
    }
}

/// Group observations by region and text and keep the ones that recur often enough
pub fn analyze_observations(
    observations: &[RegionObservation],
    samples: usize,
    min_occurrence_ratio: f64,
) -> Vec<WatermarkCandidate> {
    if samples == 0 {
        return Vec::new();
    }

    // A text counts once per sample even if OCR repeats it
    let mut seen: HashMap<(Region, &str), Vec<usize>> = HashMap::new();
    for obs in observations {
        let hits = seen.entry((obs.region, obs.text.as_str())).or_default();
        if !hits.contains(&obs.sample) {
            hits.push(obs.sample);
        }
    }

    let mut candidates: Vec<WatermarkCandidate> = seen
        .into_iter()
        .map(|((region, text), hits)| WatermarkCandidate {
            region,
            text: text.to_string(),
            occurrences: hits.len(),
            ratio: hits.len() as f64 / samples as f64,
        })
        .filter(|c| c.ratio >= min_occurrence_ratio)
        .collect();

    candidates.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then(a.region.cmp(&b.region))
            .then(a.text.cmp(&b.text))
    });
    candidates
}

/// OCR engine seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in an image file
    async fn recognize(&self, image_path: &Path) -> Result<String>;

    /// Check if the OCR engine can be launched
    fn check_availability(&self) -> Result<()>;
}

/// OCR through the `tesseract` command line tool
pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn command(&self, image_path: &Path) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Text recognition")
            .path(image_path)
            .arg("stdout")
            .arg("--psm").arg("6")
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image_path: &Path) -> Result<String> {
        let text = self.command(image_path).execute_capture().await?;
        debug!("OCR {}: {:?}", image_path.display(), text.trim());
        Ok(text)
    }

    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .output()
            .map_err(|e| VidToolsError::Launch {
                tool: self.config.binary_path.clone(),
                source: e,
            })?;

        if output.status.success() {
            info!("OCR engine is available");
            Ok(())
        } else {
            Err(VidToolsError::Ocr(format!(
                "{} --version failed: {}",
                self.config.binary_path,
                String::from_utf8_lossy(&output.stderr)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(region: Region, sample: usize, text: &str) -> RegionObservation {
        RegionObservation {
            region,
            sample,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_sample_times_are_centered() {
        assert_eq!(sample_times(100.0, 4), vec![12.5, 37.5, 62.5, 87.5]);
        assert!(sample_times(10.0, 0).is_empty());
    }

    #[test]
    fn test_crop_filters() {
        assert_eq!(Region::TopLeft.crop_filter(0.25, 0.15), "crop=iw*0.25:ih*0.15:0:0");
        assert_eq!(Region::BottomRight.crop_filter(0.25, 0.5), "crop=iw*0.25:ih*0.5:iw*0.75:ih*0.5");
        assert_eq!(Region::TopRight.crop_filter(0.5, 0.5), "crop=iw*0.5:ih*0.5:iw*0.5:0");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  @Channel_Name\n\x0c", 3), Some("channel name".to_string()));
        assert_eq!(normalize_text("|| ~ .", 3), None);
        assert_eq!(normalize_text("ab", 3), None);
        assert_eq!(normalize_text("TV5", 3), Some("tv5".to_string()));
    }

    #[test]
    fn test_recurring_text_is_reported() {
        let observations = vec![
            obs(Region::TopRight, 0, "newsnet"),
            obs(Region::TopRight, 1, "newsnet"),
            obs(Region::TopRight, 2, "newsnet"),
            obs(Region::BottomLeft, 1, "breaking story"),
            obs(Region::TopRight, 3, "newsnet"),
        ];

        let candidates = analyze_observations(&observations, 4, 0.6);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].region, Region::TopRight);
        assert_eq!(candidates[0].text, "newsnet");
        assert_eq!(candidates[0].occurrences, 4);
        assert_eq!(candidates[0].ratio, 1.0);
    }

    #[test]
    fn test_duplicate_hits_in_one_sample_count_once() {
        let observations = vec![
            obs(Region::TopLeft, 0, "logo"),
            obs(Region::TopLeft, 0, "logo"),
            obs(Region::TopLeft, 0, "logo"),
        ];
        assert!(analyze_observations(&observations, 4, 0.5).is_empty());
    }

    #[test]
    fn test_same_text_in_different_regions_is_separate() {
        let observations = vec![
            obs(Region::TopLeft, 0, "logo"),
            obs(Region::BottomRight, 1, "logo"),
        ];
        assert!(analyze_observations(&observations, 2, 0.75).is_empty());
        assert_eq!(analyze_observations(&observations, 2, 0.5).len(), 2);
    }

    #[test]
    fn test_report_rendering() {
        let report = WatermarkReport {
            file: PathBuf::from("clip.mp4"),
            samples: 8,
            candidates: vec![WatermarkCandidate {
                region: Region::BottomRight,
                text: "studio".to_string(),
                occurrences: 6,
                ratio: 0.75,
            }],
        };
        assert!(report.detected());
        assert_eq!(
            report.render(),
            "clip.mp4: watermark detected (8 samples)\n  bottom-right \"studio\" in 6/8 frames (75%)"
        );

        let clean = WatermarkReport {
            candidates: Vec::new(),
            ..report
        };
        assert_eq!(clean.render(), "clip.mp4: no watermark detected (8 samples)");
    }

    #[test]
    fn test_tesseract_command() {
        let recognizer = TesseractRecognizer::new(OcrConfig::default());
        let cmd = recognizer.command(Path::new("frame.png"));
        assert_eq!(cmd.binary_path, "tesseract");
        assert_eq!(cmd.args, vec!["frame.png", "stdout", "--psm", "6"]);
    }
}
