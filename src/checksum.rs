use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, VidToolsError};

/// Hash functions understood by ffmpeg's `streamhash` muxer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Crc32,
    Adler32,
    Murmur3,
}

impl HashAlgorithm {
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Crc32 => "crc32",
            HashAlgorithm::Adler32 => "adler32",
            HashAlgorithm::Murmur3 => "murmur3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChecksum {
    pub index: u32,
    /// Stream type as reported by ffmpeg: video, audio, subtitle, data, attachment
    pub kind: String,
    pub algorithm: String,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksumReport {
    pub file: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub algorithm: HashAlgorithm,
    pub streams: Vec<StreamChecksum>,
}

impl ChecksumReport {
    pub fn new(file: PathBuf, algorithm: HashAlgorithm, streams: Vec<StreamChecksum>) -> Self {
        Self {
            file,
            generated_at: Utc::now(),
            algorithm,
            streams,
        }
    }

    /// One line per stream: `<file>  #<index> <kind>  <ALG>=<digest>`
    pub fn render(&self) -> String {
        self.streams
            .iter()
            .map(|s| {
                format!(
                    "{}  #{} {:<8} {}={}",
                    self.file.display(),
                    s.index,
                    s.kind,
                    s.algorithm,
                    s.digest
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn stream_kind(code: &str) -> &str {
    match code {
        "v" => "video",
        "a" => "audio",
        "s" => "subtitle",
        "d" => "data",
        "t" => "attachment",
        other => other,
    }
}

/// Parse `streamhash` output, e.g. `0,v,MD5=5d41402abc4b2a76b9719d911017c592`
pub fn parse_stream_hashes(output: &str) -> Result<Vec<StreamChecksum>> {
    let mut checksums = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let malformed = || VidToolsError::Media(format!("Unexpected streamhash line: {}", line));

        let mut parts = line.splitn(3, ',');
        let index = parts
            .next()
            .and_then(|i| i.parse::<u32>().ok())
            .ok_or_else(malformed)?;
        let kind = parts.next().ok_or_else(malformed)?;
        let (algorithm, digest) = parts
            .next()
            .and_then(|h| h.split_once('='))
            .ok_or_else(malformed)?;

        checksums.push(StreamChecksum {
            index,
            kind: stream_kind(kind).to_string(),
            algorithm: algorithm.to_string(),
            digest: digest.to_string(),
        });
    }

    Ok(checksums)
}
