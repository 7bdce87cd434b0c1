use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidToolsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to execute {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{description} failed ({tool}, exit code {}): {stderr}", exit_label(.code))]
    Tool {
        tool: String,
        description: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Subtitle error: {0}")]
    Subtitle(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{failed} of {total} files failed")]
    Batch { failed: usize, total: usize },
}

impl VidToolsError {
    /// Process exit code for this error. A failing external tool hands its
    /// own exit code through; everything else is a usage/validation failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            VidToolsError::Tool { code: Some(code), .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

pub type Result<T> = std::result::Result<T, VidToolsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_exit_code_is_propagated() {
        let err = VidToolsError::Tool {
            tool: "ffmpeg".to_string(),
            description: "Metadata stripping".to_string(),
            code: Some(69),
            stderr: "boom".to_string(),
        };
        assert_eq!(err.exit_code(), 69);
        assert!(err.to_string().contains("exit code 69"));
    }

    #[test]
    fn test_signal_terminated_tool_maps_to_one() {
        let err = VidToolsError::Tool {
            tool: "ffmpeg".to_string(),
            description: "Audio extraction".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_validation_errors_map_to_one() {
        assert_eq!(VidToolsError::FileNotFound("a.mp4".into()).exit_code(), 1);
        assert_eq!(VidToolsError::Batch { failed: 1, total: 3 }.exit_code(), 1);
    }
}
