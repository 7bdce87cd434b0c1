//! Subtitle burn-in support: styling, ffmpeg filter assembly, and locating
//! and validating the subtitle file to burn.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::OutputConfig;
use crate::error::{Result, VidToolsError};
use crate::subtitle::parse_srt;

/// Subtitle formats that can be burned, in lookup order
pub const SUBTITLE_EXTENSIONS: [&str; 3] = ["srt", "ass", "vtt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePosition {
    Bottom,
    Middle,
    Top,
}

impl SubtitlePosition {
    /// ASS numpad alignment, centered horizontally
    pub fn alignment(&self) -> u8 {
        match self {
            SubtitlePosition::Bottom => 2,
            SubtitlePosition::Middle => 5,
            SubtitlePosition::Top => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    pub font_name: String,
    pub font_size: u32,
    /// `#RRGGBB` or a color name
    pub primary_color: String,
    pub outline_color: String,
    pub outline: u32,
    pub position: SubtitlePosition,
    /// Vertical margin in pixels
    pub margin_v: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 24,
            primary_color: "white".to_string(),
            outline_color: "black".to_string(),
            outline: 2,
            position: SubtitlePosition::Bottom,
            margin_v: 20,
        }
    }
}

impl SubtitleStyle {
    /// The `force_style` value handed to libass
    pub fn force_style(&self) -> Result<String> {
        Ok(format!(
            "FontName={},FontSize={},PrimaryColour={},OutlineColour={},BorderStyle=1,Outline={},Alignment={},MarginV={}",
            self.font_name,
            self.font_size,
            ass_color(&self.primary_color)?,
            ass_color(&self.outline_color)?,
            self.outline,
            self.position.alignment(),
            self.margin_v
        ))
    }
}

/// Convert `#RRGGBB`/`RRGGBB` or a color name to ASS `&HAABBGGRR` (opaque)
pub fn ass_color(value: &str) -> Result<String> {
    let rgb = match value.trim().to_ascii_lowercase().as_str() {
        "white" => "ffffff".to_string(),
        "black" => "000000".to_string(),
        "yellow" => "ffff00".to_string(),
        "red" => "ff0000".to_string(),
        "green" => "00ff00".to_string(),
        "blue" => "0000ff".to_string(),
        "cyan" => "00ffff".to_string(),
        "magenta" => "ff00ff".to_string(),
        "gray" | "grey" => "808080".to_string(),
        other => other.trim_start_matches('#').to_string(),
    };

    if rgb.len() != 6 || !rgb.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(VidToolsError::InvalidArgument(format!("Invalid color: {}", value)));
    }

    let (r, g, b) = (&rgb[0..2], &rgb[2..4], &rgb[4..6]);
    Ok(format!("&H00{}{}{}", b, g, r).to_ascii_uppercase())
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a path for use as a filter option value inside a `-vf` graph.
///
/// ffmpeg unescapes twice: once when splitting the filtergraph and again
/// when parsing the filter's `key=value` options, so both levels are applied.
pub fn escape_filter_path(path: &Path) -> String {
    let option_value = escape_chars(&path.to_string_lossy(), &['\\', '\'', ':']);
    escape_chars(&option_value, &['\\', '\'', '[', ']', ',', ';'])
}

/// Complete `subtitles=` video filter for `subtitle_path`
pub fn subtitle_filter(subtitle_path: &Path, style: &SubtitleStyle) -> Result<String> {
    let filter = format!(
        "subtitles=filename={}:force_style='{}'",
        escape_filter_path(subtitle_path),
        style.force_style()?
    );
    debug!("Subtitle filter: {}", filter);
    Ok(filter)
}

/// Places a subtitle for `video` may live, most likely first
pub fn candidate_subtitle_paths(video: &Path, output: &OutputConfig) -> Vec<PathBuf> {
    let dir = video.parent().unwrap_or_else(|| Path::new(""));
    let stem = video.file_stem().unwrap_or_default().to_string_lossy();
    let stem = stem.as_ref();

    let dirs = [
        dir.to_path_buf(),
        dir.join(&output.subtitle_dir),
        dir.join(&output.transcript_dir),
    ];

    SUBTITLE_EXTENSIONS
        .iter()
        .flat_map(|ext| dirs.iter().map(move |d| d.join(format!("{}.{}", stem, ext))))
        .collect()
}

/// First existing candidate subtitle file
pub fn locate_subtitles(video: &Path, output: &OutputConfig) -> Result<PathBuf> {
    let candidates = candidate_subtitle_paths(video, output);

    candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .cloned()
        .ok_or_else(|| {
            let searched = candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            VidToolsError::Subtitle(format!(
                "No subtitle file found for {} (searched: {})",
                video.display(),
                searched
            ))
        })
}

/// Check that a subtitle file exists and holds at least one cue; returns the cue count
pub fn validate_subtitle_file(path: &Path) -> Result<usize> {
    if !path.is_file() {
        return Err(VidToolsError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Err(VidToolsError::Subtitle(format!("Subtitle file is empty: {}", path.display())));
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let cues = match extension.as_str() {
        "srt" => parse_srt(&content)?.len(),
        "vtt" => {
            if !content.trim_start_matches('\u{feff}').starts_with("WEBVTT") {
                return Err(VidToolsError::Subtitle(format!("Missing WEBVTT header: {}", path.display())));
            }
            content.lines().filter(|l| l.contains("-->")).count()
        }
        "ass" | "ssa" => {
            if !content.contains("[Events]") {
                return Err(VidToolsError::Subtitle(format!("Missing [Events] section: {}", path.display())));
            }
            content.lines().filter(|l| l.trim_start().starts_with("Dialogue:")).count()
        }
        other => return Err(VidToolsError::UnsupportedFormat(format!("subtitle extension {:?}", other))),
    };

    if cues == 0 {
        return Err(VidToolsError::Subtitle(format!("No subtitle cues in {}", path.display())));
    }

    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_ass_color_conversion() {
        assert_eq!(ass_color("white").unwrap(), "&H00FFFFFF");
        assert_eq!(ass_color("#FF8000").unwrap(), "&H000080FF");
        assert_eq!(ass_color("00ff00").unwrap(), "&H0000FF00");
        assert!(ass_color("#12345").is_err());
        assert!(ass_color("chartreuse").is_err());
    }

    #[test]
    fn test_default_force_style() {
        assert_eq!(
            SubtitleStyle::default().force_style().unwrap(),
            "FontName=Arial,FontSize=24,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BorderStyle=1,Outline=2,Alignment=2,MarginV=20"
        );
    }

    #[test]
    fn test_top_position_alignment() {
        let style = SubtitleStyle {
            position: SubtitlePosition::Top,
            ..SubtitleStyle::default()
        };
        assert!(style.force_style().unwrap().contains("Alignment=8"));
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("/media/a.srt")), "/media/a.srt");
        assert_eq!(
            escape_filter_path(Path::new("/media/it's here, [1]:x.srt")),
            r"/media/it\\\'s here\, \[1\]\\:x.srt"
        );
    }

    #[test]
    fn test_escape_filter_path_quote_and_colon() {
        // Graph level turns \\\' into \' and \\: into \:, option level then yields ' and :
        assert_eq!(escape_filter_path(Path::new("subtitles/Bob's talk.srt")), r"subtitles/Bob\\\'s talk.srt");
        assert_eq!(escape_filter_path(Path::new("C:/subs/a.srt")), r"C\\:/subs/a.srt");
        assert_eq!(escape_filter_path(Path::new(r"C:\subs\a.srt")), r"C\\:\\\\subs\\\\a.srt");

        let filter = subtitle_filter(Path::new("Bob's talk.srt"), &SubtitleStyle::default()).unwrap();
        assert!(filter.starts_with(r"subtitles=filename=Bob\\\'s talk.srt:force_style='FontName=Arial,"));
    }

    #[test]
    fn test_subtitle_filter() {
        let filter = subtitle_filter(Path::new("subs/a.srt"), &SubtitleStyle::default()).unwrap();
        assert!(filter.starts_with("subtitles=filename=subs/a.srt:force_style='FontName=Arial,"));
        assert!(filter.ends_with("MarginV=20'"));
    }

    #[test]
    fn test_candidate_order() {
        let candidates = candidate_subtitle_paths(Path::new("/v/movie.mp4"), &OutputConfig::default());
        assert_eq!(candidates.len(), 9);
        assert_eq!(candidates[0], PathBuf::from("/v/movie.srt"));
        assert_eq!(candidates[1], PathBuf::from("/v/subtitles/movie.srt"));
        assert_eq!(candidates[2], PathBuf::from("/v/transcripts/movie.srt"));
        assert_eq!(candidates[3], PathBuf::from("/v/movie.ass"));
    }

    #[test]
    fn test_locate_prefers_srt_in_subtitle_dir_over_sibling_vtt() {
        let dir = assert_fs::TempDir::new().unwrap();
        let video = dir.child("movie.mp4");
        video.touch().unwrap();
        dir.child("movie.vtt").write_str("WEBVTT\n").unwrap();
        dir.child("subtitles/movie.srt").write_str("1\n").unwrap();

        let found = locate_subtitles(video.path(), &OutputConfig::default()).unwrap();
        assert_eq!(found, dir.child("subtitles/movie.srt").path());
    }

    #[test]
    fn test_locate_reports_searched_paths() {
        let dir = assert_fs::TempDir::new().unwrap();
        let video = dir.child("movie.mp4");
        video.touch().unwrap();

        let err = locate_subtitles(video.path(), &OutputConfig::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("movie.srt"));
        assert!(message.contains("transcripts"));
    }

    #[test]
    fn test_validate_subtitle_files() {
        let dir = assert_fs::TempDir::new().unwrap();

        let srt = dir.child("a.srt");
        srt.write_str("1\n00:00:01,000 --> 00:00:02,000\nhi\n\n2\n00:00:03,000 --> 00:00:04,000\nyo\n").unwrap();
        assert_eq!(validate_subtitle_file(srt.path()).unwrap(), 2);

        let empty = dir.child("b.srt");
        empty.write_str("  \n").unwrap();
        assert!(validate_subtitle_file(empty.path()).is_err());

        let vtt = dir.child("c.vtt");
        vtt.write_str("WEBVTT\n\n00:00.000 --> 00:01.000\nhi\n").unwrap();
        assert_eq!(validate_subtitle_file(vtt.path()).unwrap(), 1);

        let ass = dir.child("d.ass");
        ass.write_str("[Script Info]\n[Events]\nFormat: Layer, Start\n").unwrap();
        assert!(validate_subtitle_file(ass.path()).is_err());

        let other = dir.child("e.sub");
        other.write_str("{1}{2}hi").unwrap();
        assert!(matches!(
            validate_subtitle_file(other.path()),
            Err(VidToolsError::UnsupportedFormat(_))
        ));

        assert!(matches!(
            validate_subtitle_file(&dir.path().join("missing.srt")),
            Err(VidToolsError::FileNotFound(_))
        ));
    }
}
