//! Track descriptors for stream configuration

use serde::{Deserialize, Serialize};

use crate::{Result, StreamError};

/// Media track a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Video,
    Audio,
}

impl TrackType {
    /// Matroska track number used in SimpleBlock headers.
    pub const fn track_number(self) -> u8 {
        match self {
            TrackType::Video => 1,
            TrackType::Audio => 2,
        }
    }

    /// Matroska TrackType element value.
    pub const fn mkv_track_type(self) -> u8 {
        match self {
            TrackType::Video => 0x01,
            TrackType::Audio => 0x02,
        }
    }
}

/// Video track descriptor.
///
/// Every stream has exactly one video track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTrackInfo {
    /// Track name (truncated to 15 bytes in the container header)
    pub name: String,
    /// Matroska codec id, e.g. `V_MPEG4/ISO/AVC`
    pub codec_id: String,
    /// Pixel width
    pub width: u16,
    /// Pixel height
    pub height: u16,
    /// Codec private data (avcC for H.264); empty when absent
    #[serde(default, with = "hex")]
    pub codec_private: Vec<u8>,
}

impl VideoTrackInfo {
    pub fn new(name: impl Into<String>, codec_id: impl Into<String>, width: u16, height: u16) -> Self {
        Self {
            name: name.into(),
            codec_id: codec_id.into(),
            width,
            height,
            codec_private: Vec::new(),
        }
    }

    pub fn with_codec_private(mut self, codec_private: Vec<u8>) -> Self {
        self.codec_private = codec_private;
        self
    }

    /// Reject descriptors the header generator cannot describe.
    pub fn validate(&self) -> Result<()> {
        if self.codec_id.is_empty() {
            return Err(StreamError::invalid_argument("video track has an empty codec id"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(StreamError::invalid_argument(format!(
                "video track dimensions must be non-zero (got {}x{})",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Audio track descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrackInfo {
    /// Track name (truncated to 15 bytes in the container header)
    pub name: String,
    /// Matroska codec id, e.g. `A_AAC` or `A_MS/ACM`
    pub codec_id: String,
    /// Sampling frequency in Hz
    pub frequency: u32,
    /// Channel count
    pub channels: u8,
    /// Bits per sample; 0 omits the BitDepth element
    #[serde(default)]
    pub bits_per_sample: u8,
    /// Codec private data; empty when absent
    #[serde(default, with = "hex")]
    pub codec_private: Vec<u8>,
}

impl AudioTrackInfo {
    pub fn new(
        name: impl Into<String>,
        codec_id: impl Into<String>,
        frequency: u32,
        channels: u8,
    ) -> Self {
        Self {
            name: name.into(),
            codec_id: codec_id.into(),
            frequency,
            channels,
            bits_per_sample: 0,
            codec_private: Vec::new(),
        }
    }

    pub fn with_bits_per_sample(mut self, bits_per_sample: u8) -> Self {
        self.bits_per_sample = bits_per_sample;
        self
    }

    pub fn with_codec_private(mut self, codec_private: Vec<u8>) -> Self {
        self.codec_private = codec_private;
        self
    }

    /// Reject descriptors the header generator cannot describe.
    pub fn validate(&self) -> Result<()> {
        if self.codec_id.is_empty() {
            return Err(StreamError::invalid_argument("audio track has an empty codec id"));
        }
        if self.frequency == 0 {
            return Err(StreamError::invalid_argument("audio track frequency must be non-zero"));
        }
        if self.channels == 0 {
            return Err(StreamError::invalid_argument("audio track channel count must be non-zero"));
        }
        Ok(())
    }
}
