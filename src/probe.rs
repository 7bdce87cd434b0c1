//! Typed view of ffprobe's JSON output and the human-readable report
//! printed by `info` and `parse-metadata`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Result, VidToolsError};

// ffprobe output is rendered as found: values may be strings, numbers or null.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeReport {
    #[serde(deserialize_with = "null_as_default")]
    pub format: FormatInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatInfo {
    pub format_name: Option<Value>,
    pub format_long_name: Option<Value>,
    pub duration: Option<Value>,
    pub size: Option<Value>,
    pub bit_rate: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    pub index: Option<Value>,
    pub codec_type: Option<Value>,
    pub codec_name: Option<Value>,
    pub codec_long_name: Option<Value>,
    pub width: Option<Value>,
    pub height: Option<Value>,
    pub r_frame_rate: Option<Value>,
    pub bit_rate: Option<Value>,
    pub sample_rate: Option<Value>,
    pub channels: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Strings print bare, everything else as JSON
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn na(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(v) => scalar(v),
    }
}

impl StreamInfo {
    pub fn codec_type(&self) -> Option<&str> {
        self.codec_type.as_ref().and_then(Value::as_str)
    }
}

impl ProbeReport {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| VidToolsError::Media(format!("Error parsing ffprobe JSON: {}", e)))
    }

    /// Container duration in seconds, when ffprobe could determine one
    pub fn duration_secs(&self) -> Option<f64> {
        let duration = match self.format.duration.as_ref()? {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        };
        duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams
            .iter()
            .filter(|s| s.codec_type() == Some("video"))
    }

    pub fn render(&self) -> String {
        let format = &self.format;
        let mut lines = vec![
            format!("Format name: {}", na(&format.format_name)),
            format!("Format long name: {}", na(&format.format_long_name)),
            format!("Duration: {} seconds", na(&format.duration)),
            format!("Size: {} bytes", na(&format.size)),
            format!("Bitrate: {} bps", na(&format.bit_rate)),
            String::new(),
        ];

        if !format.tags.is_empty() {
            lines.push("--- Metadata Tags ---".to_string());
            for (key, value) in &format.tags {
                lines.push(format!("{}: {}", key, scalar(value)));
            }
            lines.push(String::new());
        }

        if !self.streams.is_empty() {
            lines.push("--- Stream Information ---".to_string());
            for (i, stream) in self.streams.iter().enumerate() {
                let codec_type = match &stream.codec_type {
                    None | Some(Value::Null) => "unknown".to_string(),
                    Some(v) => scalar(v),
                };
                lines.push(format!("Stream #{} ({}):", i, codec_type));
                lines.push(format!(
                    "  Codec: {} ({})",
                    na(&stream.codec_name),
                    na(&stream.codec_long_name)
                ));
                match codec_type.as_str() {
                    "video" => {
                        lines.push(format!("  Resolution: {}x{}", na(&stream.width), na(&stream.height)));
                        lines.push(format!("  Frame rate: {}", na(&stream.r_frame_rate)));
                        lines.push(format!("  Bitrate: {} bps", na(&stream.bit_rate)));
                    }
                    "audio" => {
                        lines.push(format!("  Sample rate: {} Hz", na(&stream.sample_rate)));
                        lines.push(format!("  Channels: {}", na(&stream.channels)));
                        lines.push(format!("  Bitrate: {} bps", na(&stream.bit_rate)));
                    }
                    _ => {}
                }
                lines.push(String::new());
            }
        }

        lines.join("\n")
    }
}
