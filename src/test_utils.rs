//! Shared fixtures for unit tests and benchmarks
//!
//! Track descriptors, payload builders and collaborator doubles used across
//! the crate's tests.

#![cfg(any(test, feature = "benchmark"))]

use async_trait::async_trait;

use crate::header::{BlockHeader, HeaderGenerator};
use crate::sink::FrameSink;
use crate::types::{AudioTrackInfo, ClusterType, FrameContent, VideoTrackInfo};
use crate::{Result, StreamError};

/// avcC record for a 1280x720 baseline H.264 stream.
pub const SAMPLE_AVCC: [u8; 23] = [
    0x01, 0x42, 0xC0, 0x1F, 0xFF, 0xE1, 0x00, 0x08, 0x67, 0x42, 0xC0, 0x1F, 0xDA, 0x01, 0x40,
    0x16, 0x01, 0x00, 0x04, 0x68, 0xCE, 0x3C, 0x80,
];

/// H.264 video track with codec private data.
pub fn sample_video_track() -> VideoTrackInfo {
    VideoTrackInfo::new("cam", "V_MPEG4/ISO/AVC", 1280, 720).with_codec_private(SAMPLE_AVCC.to_vec())
}

/// AAC-LC 44.1 kHz stereo audio track.
pub fn sample_audio_track() -> AudioTrackInfo {
    AudioTrackInfo::new("mic", "A_AAC", 44100, 2).with_codec_private(vec![0x12, 0x10])
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

/// Generator that supports no cluster types and builds an empty header.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectingGenerator;

impl HeaderGenerator for RejectingGenerator {
    fn build_top_level_header(
        &self,
        _video: &VideoTrackInfo,
        _audio: Option<&AudioTrackInfo>,
    ) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn cluster_header_len(&self, _cluster_type: ClusterType) -> usize {
        0
    }

    fn render_cluster_header(&self, _buf: &mut [u8], _block: &BlockHeader) {}
}

/// Generator whose top-level header build always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingGenerator;

impl HeaderGenerator for FailingGenerator {
    fn build_top_level_header(
        &self,
        _video: &VideoTrackInfo,
        _audio: Option<&AudioTrackInfo>,
    ) -> Result<Vec<u8>> {
        Err(StreamError::header_generation_failed("generator unavailable"))
    }

    fn cluster_header_len(&self, _cluster_type: ClusterType) -> usize {
        1
    }

    fn render_cluster_header(&self, _buf: &mut [u8], _block: &BlockHeader) {}
}

/// Frame captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    pub header: Vec<u8>,
    pub payload: Vec<u8>,
}

/// Sink that keeps copies of everything it is sent.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub header: Vec<u8>,
    pub header_sends: usize,
    pub frames: Vec<RecordedFrame>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    /// Accept `accepted` frames, then fail every later send.
    pub fn failing_after(accepted: usize) -> Self {
        Self { fail_after: Some(accepted), ..Self::default() }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("connection reset after {0} frames")]
struct RecordingSinkError(usize);

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_header(&mut self, header: &[u8]) -> Result<()> {
        self.header = header.to_vec();
        self.header_sends += 1;
        Ok(())
    }

    async fn send_frame(&mut self, frame: FrameContent<'_, '_>) -> Result<()> {
        if self.fail_after.is_some_and(|limit| self.frames.len() >= limit) {
            return Err(StreamError::sink_failed_with_source(
                "recording sink closed",
                Box::new(RecordingSinkError(self.frames.len())),
            ));
        }
        self.frames.push(RecordedFrame {
            header: frame.header.to_vec(),
            payload: frame.payload.to_vec(),
        });
        Ok(())
    }
}
