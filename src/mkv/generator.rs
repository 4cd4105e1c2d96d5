//! Matroska header generator
//!
//! Produces the stream preamble (EBML header, Segment, Info, Tracks) once per
//! stream and a Cluster and/or SimpleBlock header per frame.
//!
//! ## Per-frame layouts
//!
//! Cluster header (18 bytes):
//!
//! | offset | bytes | field                          |
//! |--------|-------|--------------------------------|
//! | 0      | 4     | Cluster id                     |
//! | 4      | 1     | unknown size (`0xFF`)          |
//! | 5      | 2     | Timestamp id + 8-byte size     |
//! | 7      | 8     | absolute timestamp, ms, BE     |
//! | 15     | 3     | Position = 0                   |
//!
//! SimpleBlock header (13 bytes):
//!
//! | offset | bytes | field                                |
//! |--------|-------|--------------------------------------|
//! | 0      | 1     | SimpleBlock id                       |
//! | 1      | 8     | size = 4 + payload length            |
//! | 9      | 1     | track number (`0x80 \| n`)           |
//! | 10     | 2     | delta timestamp, ms, BE              |
//! | 12     | 1     | flags (`0x80` = key frame)           |

use tracing::{debug, trace, warn};

use super::ebml::{self, SIZE_MARKER_1};
use crate::header::{BlockHeader, HeaderGenerator};
use crate::types::{AudioTrackInfo, ClusterType, TrackType, VideoTrackInfo};
use crate::{Result, StreamError};

/// Length of a Cluster header.
pub const CLUSTER_HEADER_LEN: usize = 18;
/// Length of a SimpleBlock header.
pub const SIMPLE_BLOCK_HEADER_LEN: usize = 13;

const CLUSTER_TIMESTAMP_OFFSET: usize = 7;
const SIMPLE_BLOCK_SIZE_OFFSET: usize = 1;
const SIMPLE_BLOCK_TRACK_NUMBER_OFFSET: usize = 9;
const SIMPLE_BLOCK_DELTA_OFFSET: usize = 10;
const SIMPLE_BLOCK_FLAGS_OFFSET: usize = 12;
// Track number, delta timestamp and flags precede the frame data
const SIMPLE_BLOCK_PREFIX_LEN: u64 = 4;
const KEY_FRAME_FLAG: u8 = 0x80;

const EBML_HEADER_LEN: usize = 40;
const SEGMENT_HEADER_LEN: usize = 5;
const INFO_LEN: usize = 94;
const INFO_BODY_LEN: usize = 88;
const TRACKS_HEADER_LEN: usize = 8;
const TRACK_ENTRY_HEADER_LEN: usize = 5;

const TIMESTAMP_SCALE_NS: u64 = 1_000_000;
const VIDEO_TRACK_UID: u64 = 1;
const AUDIO_TRACK_UID: u64 = 2;

/// Default Segment title and application names.
pub const DEFAULT_APP_NAME: &str = "mkvqueue";

const CLUSTER_TEMPLATE: [u8; CLUSTER_HEADER_LEN] = [
    ebml::CLUSTER[0],
    ebml::CLUSTER[1],
    ebml::CLUSTER[2],
    ebml::CLUSTER[3],
    ebml::UNKNOWN_SIZE,
    ebml::TIMESTAMP,
    0x88, // len = 8
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // absolute timestamp
    ebml::POSITION,
    0x81, // len = 1
    0x00,
];

/// Matroska implementation of [`HeaderGenerator`].
#[derive(Debug, Clone)]
pub struct MkvHeaderGenerator {
    segment_uid: Option<[u8; 16]>,
    title: String,
    muxing_app: String,
    writing_app: String,
}

impl Default for MkvHeaderGenerator {
    fn default() -> Self {
        Self {
            segment_uid: None,
            title: DEFAULT_APP_NAME.to_string(),
            muxing_app: DEFAULT_APP_NAME.to_string(),
            writing_app: DEFAULT_APP_NAME.to_string(),
        }
    }
}

impl MkvHeaderGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed Segment UID instead of a random one per stream.
    pub fn with_segment_uid(mut self, uid: [u8; 16]) -> Self {
        self.segment_uid = Some(uid);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set both MuxingApp and WritingApp.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.muxing_app = name.clone();
        self.writing_app = name;
        self
    }

    fn segment_uid(&self) -> [u8; 16] {
        self.segment_uid.unwrap_or_else(|| uuid::Uuid::new_v4().into_bytes())
    }

    fn push_info(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&ebml::INFO);
        out.extend_from_slice(&(ebml::SIZE_MARKER_2 | INFO_BODY_LEN as u16).to_be_bytes());

        out.extend_from_slice(&ebml::SEGMENT_UID);
        out.push(SIZE_MARKER_1 | 16);
        out.extend_from_slice(&self.segment_uid());

        out.extend_from_slice(&ebml::TIMESTAMP_SCALE);
        out.push(SIZE_MARKER_1 | 8);
        out.extend_from_slice(&TIMESTAMP_SCALE_NS.to_be_bytes());

        ebml::push_fixed_string(out, &ebml::TITLE, &self.title);
        ebml::push_fixed_string(out, &ebml::MUXING_APP, &self.muxing_app);
        ebml::push_fixed_string(out, &ebml::WRITING_APP, &self.writing_app);
    }
}

impl HeaderGenerator for MkvHeaderGenerator {
    fn build_top_level_header(
        &self,
        video: &VideoTrackInfo,
        audio: Option<&AudioTrackInfo>,
    ) -> Result<Vec<u8>> {
        let video_entry = video_track_entry(video)?;
        let audio_entry = audio.map(audio_track_entry).transpose()?;

        let tracks_len = video_entry.len() + audio_entry.as_ref().map_or(0, Vec::len);
        if tracks_len > ebml::MAX_SIZE_4 {
            return Err(StreamError::header_generation_failed(format!(
                "track entries too large ({} bytes)",
                tracks_len
            )));
        }

        let total =
            EBML_HEADER_LEN + SEGMENT_HEADER_LEN + INFO_LEN + TRACKS_HEADER_LEN + tracks_len;
        let mut out = Vec::new();
        out.try_reserve_exact(total)
            .map_err(|e| StreamError::resource_exhausted("top-level header", total, e))?;

        push_ebml_header(&mut out);

        out.extend_from_slice(&ebml::SEGMENT);
        out.push(ebml::UNKNOWN_SIZE);

        self.push_info(&mut out);

        out.extend_from_slice(&ebml::TRACKS);
        ebml::push_size_4(&mut out, tracks_len);
        out.extend_from_slice(&video_entry);
        if let Some(entry) = &audio_entry {
            out.extend_from_slice(entry);
        }

        debug_assert_eq!(out.len(), total);
        debug!(
            header_len = out.len(),
            has_audio = audio.is_some(),
            video_codec = %video.codec_id,
            "Built Matroska top-level header"
        );
        Ok(out)
    }

    fn cluster_header_len(&self, cluster_type: ClusterType) -> usize {
        match cluster_type {
            ClusterType::Cluster => CLUSTER_HEADER_LEN + SIMPLE_BLOCK_HEADER_LEN,
            ClusterType::SimpleBlock => SIMPLE_BLOCK_HEADER_LEN,
        }
    }

    fn render_cluster_header(&self, buf: &mut [u8], block: &BlockHeader) {
        let expected = self.cluster_header_len(block.cluster_type);
        if buf.len() < expected {
            warn!(len = buf.len(), expected, "Header buffer too small, not rendering");
            return;
        }

        let simple_block = match block.cluster_type {
            ClusterType::Cluster => {
                let (cluster, rest) = buf.split_at_mut(CLUSTER_HEADER_LEN);
                cluster.copy_from_slice(&CLUSTER_TEMPLATE);
                ebml::write_u64_be(cluster, CLUSTER_TIMESTAMP_OFFSET, block.timestamp_ms);
                rest
            }
            ClusterType::SimpleBlock => buf,
        };

        simple_block[0] = ebml::SIMPLE_BLOCK;
        ebml::write_u64_be(
            simple_block,
            SIMPLE_BLOCK_SIZE_OFFSET,
            ebml::SIZE_MARKER_8 | (SIMPLE_BLOCK_PREFIX_LEN + block.payload_len as u64),
        );
        simple_block[SIMPLE_BLOCK_TRACK_NUMBER_OFFSET] =
            SIZE_MARKER_1 | block.track_type.track_number();
        ebml::write_u16_be(simple_block, SIMPLE_BLOCK_DELTA_OFFSET, block.delta_ms);
        simple_block[SIMPLE_BLOCK_FLAGS_OFFSET] =
            if block.is_key_frame { KEY_FRAME_FLAG } else { 0 };

        trace!(
            cluster_type = ?block.cluster_type,
            timestamp_ms = block.timestamp_ms,
            delta_ms = block.delta_ms,
            "Rendered frame header"
        );
    }
}

fn push_ebml_header(out: &mut Vec<u8>) {
    out.extend_from_slice(&ebml::EBML);
    out.push(SIZE_MARKER_1 | (EBML_HEADER_LEN - 5) as u8);
    ebml::push_uint_1(out, &ebml::EBML_VERSION, 1);
    ebml::push_uint_1(out, &ebml::EBML_READ_VERSION, 1);
    ebml::push_uint_1(out, &ebml::EBML_MAX_ID_LENGTH, 4);
    ebml::push_uint_1(out, &ebml::EBML_MAX_SIZE_LENGTH, 8);
    out.extend_from_slice(&ebml::DOC_TYPE);
    out.push(SIZE_MARKER_1 | 8);
    out.extend_from_slice(b"matroska");
    ebml::push_uint_1(out, &ebml::DOC_TYPE_VERSION, 2);
    ebml::push_uint_1(out, &ebml::DOC_TYPE_READ_VERSION, 2);
}

fn push_track_entry_prefix(out: &mut Vec<u8>, track: TrackType, uid: u64, name: &str) {
    out.push(ebml::TRACK_ENTRY);
    // Patched once the entry length is known
    ebml::push_size_4(out, 0);
    ebml::push_uint_1(out, &[ebml::TRACK_NUMBER], track.track_number());
    out.extend_from_slice(&ebml::TRACK_UID);
    out.push(SIZE_MARKER_1 | 8);
    out.extend_from_slice(&uid.to_be_bytes());
    ebml::push_uint_1(out, &[ebml::TRACK_TYPE], track.mkv_track_type());
    ebml::push_fixed_string(out, &ebml::NAME, name);
}

fn push_codec_id(out: &mut Vec<u8>, codec_id: &str) -> Result<()> {
    if codec_id.len() > ebml::MAX_SIZE_2 {
        return Err(StreamError::header_generation_failed(format!(
            "codec id too long ({} bytes)",
            codec_id.len()
        )));
    }
    out.push(ebml::CODEC_ID);
    ebml::push_size_2(out, codec_id.len());
    out.extend_from_slice(codec_id.as_bytes());
    Ok(())
}

fn push_codec_private(out: &mut Vec<u8>, codec_private: &[u8]) -> Result<()> {
    if codec_private.is_empty() {
        return Ok(());
    }
    if codec_private.len() > ebml::MAX_SIZE_4 {
        return Err(StreamError::header_generation_failed(format!(
            "codec private data too large ({} bytes)",
            codec_private.len()
        )));
    }
    out.extend_from_slice(&ebml::CODEC_PRIVATE);
    ebml::push_size_4(out, codec_private.len());
    out.extend_from_slice(codec_private);
    Ok(())
}

fn finish_track_entry(entry: &mut [u8]) {
    let body_len = entry.len() - TRACK_ENTRY_HEADER_LEN;
    ebml::patch_size_4(entry, 1, body_len);
}

fn video_track_entry(video: &VideoTrackInfo) -> Result<Vec<u8>> {
    let mut entry = Vec::new();
    push_track_entry_prefix(&mut entry, TrackType::Video, VIDEO_TRACK_UID, &video.name);
    push_codec_id(&mut entry, &video.codec_id)?;

    entry.push(ebml::VIDEO);
    ebml::push_size_4(&mut entry, 8);
    entry.push(ebml::PIXEL_WIDTH);
    entry.push(SIZE_MARKER_1 | 2);
    entry.extend_from_slice(&video.width.to_be_bytes());
    entry.push(ebml::PIXEL_HEIGHT);
    entry.push(SIZE_MARKER_1 | 2);
    entry.extend_from_slice(&video.height.to_be_bytes());

    push_codec_private(&mut entry, &video.codec_private)?;
    finish_track_entry(&mut entry);
    Ok(entry)
}

fn audio_track_entry(audio: &AudioTrackInfo) -> Result<Vec<u8>> {
    let mut entry = Vec::new();
    push_track_entry_prefix(&mut entry, TrackType::Audio, AUDIO_TRACK_UID, &audio.name);
    push_codec_id(&mut entry, &audio.codec_id)?;

    // SamplingFrequency (10) + Channels (3), plus BitDepth (4) when present
    let has_bit_depth = audio.bits_per_sample > 0;
    let audio_len = if has_bit_depth { 17 } else { 13 };
    entry.push(ebml::AUDIO);
    ebml::push_size_4(&mut entry, audio_len);
    entry.push(ebml::SAMPLING_FREQUENCY);
    entry.push(SIZE_MARKER_1 | 8);
    entry.extend_from_slice(&f64::from(audio.frequency).to_be_bytes());
    ebml::push_uint_1(&mut entry, &[ebml::CHANNELS], audio.channels);
    if has_bit_depth {
        ebml::push_uint_1(&mut entry, &ebml::BIT_DEPTH, audio.bits_per_sample);
    }

    push_codec_private(&mut entry, &audio.codec_private)?;
    finish_track_entry(&mut entry);
    Ok(entry)
}
