use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, VidToolsError};
use crate::transcribe::Transcription;

/// Transcript output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    Txt,
    Srt,
    Vtt,
    Json,
}

impl TranscriptFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TranscriptFormat::Txt => "txt",
            TranscriptFormat::Srt => "srt",
            TranscriptFormat::Vtt => "vtt",
            TranscriptFormat::Json => "json",
        }
    }
}

/// A cue read back from an SRT file
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub index: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Render a transcription in the requested format
pub fn render(transcription: &Transcription, format: TranscriptFormat) -> Result<String> {
    Ok(match format {
        TranscriptFormat::Txt => format!("{}\n", transcription.text.trim()),
        TranscriptFormat::Srt => render_srt(transcription),
        TranscriptFormat::Vtt => render_vtt(transcription),
        TranscriptFormat::Json => match &transcription.raw {
            Some(raw) => serde_json::to_string_pretty(raw)?,
            None => serde_json::to_string_pretty(transcription)?,
        },
    })
}

pub fn render_srt(transcription: &Transcription) -> String {
    let mut srt_content = String::new();

    for (index, segment) in transcription.segments.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(segment.start),
            format_srt_time(segment.end),
            segment.text.trim()
        ));
    }

    srt_content
}

pub fn render_vtt(transcription: &Transcription) -> String {
    let mut vtt_content = String::from("WEBVTT\n\n");

    for segment in &transcription.segments {
        vtt_content.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end),
            segment.text.trim()
        ));
    }

    vtt_content
}

/// Write a transcription to `output_path`
pub async fn write_transcript<P: AsRef<Path>>(
    transcription: &Transcription,
    output_path: P,
    format: TranscriptFormat,
) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing {} transcript: {}", format.extension(), output_path.display());

    let content = render(transcription, format)?;
    fs::write(output_path, content).await?;

    Ok(())
}

fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;
    (hours, minutes, secs, millis)
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
pub fn format_srt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Format time in seconds to WebVTT time format (HH:MM:SS.mmm)
pub fn format_vtt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Parse `HH:MM:SS,mmm` (or `.mmm`) into seconds
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let (clock, millis) = value.trim().split_once([',', '.'])?;
    let mut fields = clock.split(':');
    let hours: u64 = fields.next()?.parse().ok()?;
    let minutes: u64 = fields.next()?.parse().ok()?;
    let secs: u64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || minutes >= 60 || secs >= 60 || millis.len() != 3 {
        return None;
    }
    let millis: u64 = millis.parse().ok()?;

    let total_milliseconds = (hours * 3600 + minutes * 60 + secs) * 1000 + millis;
    Some(total_milliseconds as f64 / 1000.0)
}

/// Parse SRT content into cues
pub fn parse_srt(content: &str) -> Result<Vec<SubtitleCue>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut cues = Vec::new();

    for block in content.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let mut lines = block.lines();
        let index_line = lines.next().unwrap_or_default().trim();
        let index: u32 = index_line
            .parse()
            .map_err(|_| VidToolsError::Subtitle(format!("Invalid cue number: {:?}", index_line)))?;

        let timing = lines
            .next()
            .ok_or_else(|| VidToolsError::Subtitle(format!("Cue {} has no timing line", index)))?;
        let (start, end) = timing
            .split_once("-->")
            .ok_or_else(|| VidToolsError::Subtitle(format!("Cue {} has malformed timing: {}", index, timing)))?;
        let start = parse_timestamp(start)
            .ok_or_else(|| VidToolsError::Subtitle(format!("Cue {} has invalid start time", index)))?;
        // Position settings may follow the end time
        let end = end.split_whitespace().next().and_then(parse_timestamp)
            .ok_or_else(|| VidToolsError::Subtitle(format!("Cue {} has invalid end time", index)))?;
        if end < start {
            return Err(VidToolsError::Subtitle(format!("Cue {} ends before it starts", index)));
        }

        cues.push(SubtitleCue {
            index,
            start,
            end,
            text: lines.collect::<Vec<_>>().join("\n"),
        });
    }

    Ok(cues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::TranscriptionSegment;

    fn sample() -> Transcription {
        Transcription {
            text: " Hello there. General Kenobi. ".to_string(),
            segments: vec![
                TranscriptionSegment { id: 0, start: 0.0, end: 1.5, text: " Hello there.".to_string() },
                TranscriptionSegment { id: 1, start: 65.123, end: 3661.5, text: "General Kenobi. ".to_string() },
            ],
            language: Some("en".to_string()),
            raw: None,
        }
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
        // rounded to the nearest millisecond, not truncated
        assert_eq!(format_srt_time(1.9996), "00:00:02,000");
        assert_eq!(format_srt_time(1.9994), "00:00:01,999");
    }

    #[test]
    fn test_format_vtt_time() {
        assert_eq!(format_vtt_time(65.123), "00:01:05.123");
        assert_eq!(format_vtt_time(-1.0), "00:00:00.000");
    }

    #[test]
    fn test_render_srt() {
        let srt = render_srt(&sample());
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,500\nHello there.\n\n\
             2\n00:01:05,123 --> 01:01:01,500\nGeneral Kenobi.\n\n"
        );
    }

    #[test]
    fn test_render_vtt_has_header() {
        let vtt = render_vtt(&sample());
        assert!(vtt.starts_with("WEBVTT\n\n00:00:00.000 --> 00:00:01.500\nHello there.\n\n"));
    }

    #[test]
    fn test_render_txt_and_json() {
        assert_eq!(render(&sample(), TranscriptFormat::Txt).unwrap(), "Hello there. General Kenobi.\n");

        let json = render(&sample(), TranscriptFormat::Json).unwrap();
        let back: Transcription = serde_json::from_str(&json).unwrap();
        assert_eq!(back.segments.len(), 2);
    }

    #[test]
    fn test_json_format_writes_recognizer_output_verbatim() {
        let raw = serde_json::json!({
            "text": " Hello there.",
            "segments": [{"id": 0, "seek": 0, "start": 0.0, "end": 1.5, "text": " Hello there.",
                          "tokens": [50364], "temperature": 0.0, "avg_logprob": -0.2}],
            "language": "en"
        });
        let transcription = Transcription {
            raw: Some(raw.clone()),
            ..sample()
        };

        let json = render(&transcription, TranscriptFormat::Json).unwrap();
        let written: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(written, raw);
        assert!(json.contains("\n  \"language\": \"en\""));
    }

    #[test]
    fn test_parse_srt_reads_rendered_output() {
        let cues = parse_srt(&render_srt(&sample())).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].index, 2);
        assert_eq!(cues[1].start, 65.123);
        assert_eq!(cues[1].text, "General Kenobi.");
    }

    #[test]
    fn test_parse_srt_tolerates_bom_crlf_and_multiline_text() {
        let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000 X1:10\r\nline one\r\nline two\r\n\r\n";
        let cues = parse_srt(content).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "line one\nline two");
        assert_eq!(cues[0].end, 2.0);
    }

    #[test]
    fn test_parse_srt_rejects_broken_timing() {
        assert!(parse_srt("1\n00:00:01 --> 00:00:02,000\nhi\n").is_err());
        assert!(parse_srt("one\n00:00:01,000 --> 00:00:02,000\nhi\n").is_err());
        assert!(parse_srt("1\n00:00:05,000 --> 00:00:02,000\nhi\n").is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("01:01:01,500"), Some(3661.5));
        assert_eq!(parse_timestamp("00:00:02.250"), Some(2.25));
        assert_eq!(parse_timestamp("00:61:00,000"), None);
        assert_eq!(parse_timestamp("garbage"), None);
    }

    #[test]
    fn test_write_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.srt");
        tokio_test::block_on(write_transcript(&sample(), &path, TranscriptFormat::Srt)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("1\n00:00:00,000"));
    }
}
