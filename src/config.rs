//! YAML stream configuration
//!
//! A stream is described by a small YAML document:
//!
//! ```yaml
//! title: front-door
//! poll_interval_ms: 10
//! video:
//!   name: cam
//!   codec_id: V_MPEG4/ISO/AVC
//!   width: 1280
//!   height: 720
//!   codec_private: 0142c01fffe1
//! audio:
//!   name: mic
//!   codec_id: A_AAC
//!   frequency: 44100
//!   channels: 2
//!   codec_private: "1210"
//! ```
//!
//! `codec_private` values are hex strings. Only `video` is required for a
//! usable stream; [`StreamBuffer::from_config`](crate::StreamBuffer::from_config)
//! rejects a document without it.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{AudioTrackInfo, VideoTrackInfo};
use crate::{Result, StreamError};

const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Track and consumer settings for one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Segment title; the generator default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// How often an idle consumer polls for new frames
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub video: Option<VideoTrackInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTrackInfo>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            title: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            video: None,
            audio: None,
        }
    }
}

impl StreamConfig {
    pub fn new(video: VideoTrackInfo, audio: Option<AudioTrackInfo>) -> Self {
        Self { video: Some(video), audio, ..Self::default() }
    }

    /// Parse a configuration document.
    ///
    /// Control characters other than whitespace are stripped before parsing.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cleaned = strip_control_characters(yaml);
        if cleaned.trim().is_empty() {
            return Err(StreamError::Config {
                context: "YAML stream config".to_string(),
                details: "document is empty".to_string(),
            });
        }

        let config: StreamConfig = serde_yaml_ng::from_str(&cleaned)?;
        debug!(
            has_video = config.video.is_some(),
            has_audio = config.audio.is_some(),
            poll_interval_ms = config.poll_interval_ms,
            "Parsed stream config"
        );
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| StreamError::Config {
            context: format!("reading {}", path.display()),
            details: e.to_string(),
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn strip_control_characters(yaml: &str) -> String {
    yaml.chars()
        .filter(|&ch| !matches!(ch, '\x00'..='\x08' | '\x0B'..='\x0C' | '\x0E'..='\x1F'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
title: front-door
poll_interval_ms: 25
video:
  name: cam
  codec_id: V_MPEG4/ISO/AVC
  width: 1280
  height: 720
  codec_private: 0142c01fffe1
audio:
  name: mic
  codec_id: A_AAC
  frequency: 44100
  channels: 2
  codec_private: "1210"
"#;

    #[test]
    fn parses_full_document() {
        let config = StreamConfig::from_yaml_str(FULL).unwrap();
        assert_eq!(config.title.as_deref(), Some("front-door"));
        assert_eq!(config.poll_interval(), Duration::from_millis(25));

        let video = config.video.unwrap();
        assert_eq!(video.width, 1280);
        assert_eq!(video.codec_private, vec![0x01, 0x42, 0xC0, 0x1F, 0xFF, 0xE1]);

        let audio = config.audio.unwrap();
        assert_eq!(audio.frequency, 44100);
        assert_eq!(audio.bits_per_sample, 0);
        assert_eq!(audio.codec_private, vec![0x12, 0x10]);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = StreamConfig::from_yaml_str("title: lobby\n").unwrap();
        assert!(config.video.is_none());
        assert!(config.audio.is_none());
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn invalid_hex_is_a_config_error() {
        let yaml = "video:\n  name: cam\n  codec_id: V_VP8\n  width: 1\n  height: 1\n  codec_private: zz\n";
        assert!(matches!(StreamConfig::from_yaml_str(yaml), Err(StreamError::Config { .. })));
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(matches!(StreamConfig::from_yaml_str(" \n\x01"), Err(StreamError::Config { .. })));
    }

    #[test]
    fn control_characters_are_stripped() {
        let yaml = "title: lob\x07by\npoll_interval_ms: 5\n";
        let config = StreamConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.title.as_deref(), Some("lobby"));
    }

    #[test]
    fn yaml_round_trip_preserves_tracks() {
        let config = StreamConfig::from_yaml_str(FULL).unwrap();
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(StreamConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = StreamConfig::load("/nonexistent/mkvqueue/stream.yaml");
        assert!(matches!(result, Err(StreamError::Config { .. })));
    }
}
