//! Timestamp-ordered frame buffer
//!
//! [`StreamBuffer`] sits between a media producer and a network uploader. Each
//! pushed frame gets a container header rendered at push time and is kept in
//! a pending sequence sorted by timestamp; the consumer pops frames in that
//! order and writes header + payload to the wire.
//!
//! ## Cluster timestamps
//!
//! Container headers encode continuation frames as a 16-bit delta against the
//! most recent cluster-starting frame. The buffer tracks the timestamp of the
//! last *popped* cluster start (the cluster cursor). On push, the delta
//! baseline starts at the cursor and advances over every pending cluster start
//! that precedes the insertion point. Deltas are not recomputed when later
//! pushes change the cluster structure in front of a frame.
//!
//! ## Example
//!
//! ```rust
//! use mkvqueue::{FrameDescriptor, StreamBuffer, TrackType, VideoTrackInfo};
//!
//! # fn main() -> mkvqueue::Result<()> {
//! let key_frame = vec![0u8; 4096];
//! let delta_frame = vec![0u8; 512];
//!
//! let video = VideoTrackInfo::new("cam", "V_MPEG4/ISO/AVC", 1280, 720);
//! let buffer = StreamBuffer::new(video, None)?;
//!
//! buffer.push(FrameDescriptor::cluster_start(TrackType::Video, 0, &key_frame))?;
//! buffer.push(FrameDescriptor::continuation(TrackType::Video, 40, &delta_frame))?;
//!
//! while let Some(frame) = buffer.pop()? {
//!     let content = frame.content();
//!     assert!(!content.header.is_empty());
//!     frame.release();
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::StreamConfig;
use crate::header::{BlockHeader, HeaderGenerator};
use crate::mkv::MkvHeaderGenerator;
use crate::types::{
    AudioTrackInfo, ClusterType, DataFrame, FrameDescriptor, FrameInfo, TrackType, VideoTrackInfo,
};
use crate::{Result, StreamError};

/// Receipt returned by [`StreamBuffer::push`].
///
/// The node itself stays owned by the buffer until it is popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PushedFrame {
    pub timestamp_ms: u64,
    pub track_type: TrackType,
    pub cluster_type: ClusterType,
    /// Delta written into the SimpleBlock header
    pub delta_ms: u16,
    /// Position in the pending sequence at insertion time
    pub index: usize,
    pub header_len: usize,
}

/// Point-in-time snapshot of the pending sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    pub pending_frames: usize,
    pub video_frames: usize,
    pub audio_frames: usize,
    pub cluster_frames: usize,
    pub header_bytes: usize,
    pub payload_bytes: usize,
    pub memory_footprint: usize,
    pub cluster_timestamp_ms: u64,
    pub head_timestamp_ms: Option<u64>,
    pub tail_timestamp_ms: Option<u64>,
}

#[derive(Debug, Default)]
struct PendingState<'p> {
    frames: VecDeque<DataFrame<'p>>,
    /// Timestamp of the most recently popped cluster-starting frame
    cluster_timestamp_ms: u64,
    /// Cursor value before the last pop moved it
    previous_cluster_timestamp_ms: u64,
}

impl PendingState<'_> {
    /// Insertion index for `timestamp_ms` and the delta baseline in effect there.
    ///
    /// New frames go after every pending frame with an equal timestamp.
    fn insertion_point(&self, timestamp_ms: u64) -> (usize, u64) {
        let mut baseline = self.cluster_timestamp_ms;
        for (index, existing) in self.frames.iter().enumerate() {
            if timestamp_ms < existing.timestamp_ms {
                return (index, baseline);
            }
            if existing.cluster_type.starts_cluster() {
                baseline = existing.timestamp_ms;
            }
        }
        (self.frames.len(), baseline)
    }

    fn frames_footprint(&self) -> usize {
        self.frames.iter().map(DataFrame::footprint).sum()
    }
}

/// Thread-safe, timestamp-ordered buffer of frames awaiting upload.
///
/// `'p` is the lifetime of the producer's payload memory. Payloads are never
/// copied; the borrow checker keeps them alive until every frame referencing
/// them has been popped and released or the buffer is gone.
///
/// All operations take `&self` and serialize on a single internal mutex, so a
/// buffer can be shared between producer and consumer threads via `Arc` or
/// scoped threads.
#[derive(Debug)]
pub struct StreamBuffer<'p, G: HeaderGenerator = MkvHeaderGenerator> {
    generator: G,
    top_level_header: Vec<u8>,
    has_video_track: bool,
    has_audio_track: bool,
    state: Mutex<PendingState<'p>>,
}

impl<'p> StreamBuffer<'p, MkvHeaderGenerator> {
    /// Create a buffer producing Matroska headers.
    pub fn new(video: VideoTrackInfo, audio: Option<AudioTrackInfo>) -> Result<Self> {
        Self::with_generator(MkvHeaderGenerator::default(), video, audio)
    }

    /// Create a buffer from a parsed [`StreamConfig`].
    ///
    /// A configuration without a video section is rejected with
    /// [`StreamError::InvalidArgument`].
    pub fn from_config(config: &StreamConfig) -> Result<Self> {
        let mut generator = MkvHeaderGenerator::default();
        if let Some(title) = &config.title {
            generator = generator.with_title(title.clone());
        }
        Self::with_config(generator, config)
    }
}

impl<'p, G: HeaderGenerator> StreamBuffer<'p, G> {
    /// Fixed bookkeeping size of the buffer, excluding header and frame bytes.
    pub const FIXED_OVERHEAD: usize = std::mem::size_of::<Self>();

    /// Create a buffer with a custom header generator.
    pub fn with_generator(
        generator: G,
        video: VideoTrackInfo,
        audio: Option<AudioTrackInfo>,
    ) -> Result<Self> {
        video.validate()?;
        if let Some(audio) = &audio {
            audio.validate()?;
        }

        let top_level_header = generator.build_top_level_header(&video, audio.as_ref())?;

        debug!(
            video_codec = %video.codec_id,
            width = video.width,
            height = video.height,
            audio_codec = audio.as_ref().map(|a| a.codec_id.as_str()),
            header_len = top_level_header.len(),
            "Created stream buffer"
        );

        Ok(Self {
            generator,
            top_level_header,
            has_video_track: true,
            has_audio_track: audio.is_some(),
            state: Mutex::new(PendingState::default()),
        })
    }

    /// Create a buffer with a custom header generator from a [`StreamConfig`].
    pub fn with_config(generator: G, config: &StreamConfig) -> Result<Self> {
        let video = config
            .video
            .clone()
            .ok_or_else(|| StreamError::invalid_argument("stream config has no video track"))?;
        Self::with_generator(generator, video, config.audio.clone())
    }

    /// Tear down the buffer.
    ///
    /// Pending frames are dropped with it; their payloads are untouched.
    pub fn destroy(self) {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        if state.frames.is_empty() {
            debug!("Destroyed stream buffer");
        } else {
            warn!(pending_frames = state.frames.len(), "Destroyed stream buffer with pending frames");
        }
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, PendingState<'p>>> {
        self.state.lock().map_err(|_| {
            warn!(operation, "Stream buffer lock poisoned");
            StreamError::lock_failed(operation)
        })
    }

    /// The stream-lifetime container header, sent once before any frame.
    pub fn top_level_header(&self) -> Result<&[u8]> {
        if self.top_level_header.is_empty() {
            return Err(StreamError::NotInitialized { what: "top-level header" });
        }
        Ok(&self.top_level_header)
    }

    pub fn has_video_track(&self) -> bool {
        self.has_video_track
    }

    pub fn has_audio_track(&self) -> bool {
        self.has_audio_track
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Insert a frame in timestamp order and render its container header.
    ///
    /// Frames with equal timestamps keep their push order. A failed push
    /// leaves the pending sequence unchanged.
    pub fn push(&self, frame: FrameDescriptor<'p>) -> Result<PushedFrame> {
        if frame.track_type == TrackType::Audio && !self.has_audio_track {
            return Err(StreamError::invalid_argument(
                "audio frame pushed to a stream without an audio track",
            ));
        }

        let header_len = self.generator.cluster_header_len(frame.cluster_type);
        if header_len == 0 {
            return Err(StreamError::UnsupportedClusterType { cluster_type: frame.cluster_type });
        }

        let mut header = Vec::new();
        header
            .try_reserve_exact(header_len)
            .map_err(|e| StreamError::resource_exhausted("frame header", header_len, e))?;
        header.resize(header_len, 0);

        let mut state = self.lock("push")?;
        state.frames.try_reserve(1).map_err(|e| {
            StreamError::resource_exhausted("pending frame slot", DataFrame::FIXED_OVERHEAD, e)
        })?;

        let (index, baseline) = state.insertion_point(frame.timestamp_ms);
        let full_delta = frame.timestamp_ms.wrapping_sub(baseline);
        if full_delta > u64::from(u16::MAX) {
            warn!(
                timestamp_ms = frame.timestamp_ms,
                baseline_ms = baseline,
                "Frame delta does not fit in 16 bits, truncating"
            );
        }
        let delta_ms = full_delta as u16;

        self.generator.render_cluster_header(
            &mut header,
            &BlockHeader {
                cluster_type: frame.cluster_type,
                payload_len: frame.payload.len(),
                track_type: frame.track_type,
                is_key_frame: frame.is_key_frame,
                timestamp_ms: frame.timestamp_ms,
                delta_ms,
            },
        );

        state.frames.insert(
            index,
            DataFrame {
                track_type: frame.track_type,
                cluster_type: frame.cluster_type,
                is_key_frame: frame.is_key_frame,
                timestamp_ms: frame.timestamp_ms,
                delta_ms,
                payload: frame.payload,
                header,
            },
        );

        trace!(
            timestamp_ms = frame.timestamp_ms,
            track = ?frame.track_type,
            cluster_type = ?frame.cluster_type,
            delta_ms,
            index,
            pending = state.frames.len(),
            "Pushed frame"
        );

        Ok(PushedFrame {
            timestamp_ms: frame.timestamp_ms,
            track_type: frame.track_type,
            cluster_type: frame.cluster_type,
            delta_ms,
            index,
            header_len,
        })
    }

    /// Remove the earliest pending frame.
    ///
    /// Popping a cluster-starting frame moves the cluster cursor to its
    /// timestamp. Returns `Ok(None)` when nothing is pending.
    pub fn pop(&self) -> Result<Option<DataFrame<'p>>> {
        let mut state = self.lock("pop")?;
        let Some(frame) = state.frames.pop_front() else {
            return Ok(None);
        };

        if frame.cluster_type.starts_cluster() {
            state.previous_cluster_timestamp_ms = state.cluster_timestamp_ms;
            state.cluster_timestamp_ms = frame.timestamp_ms;
        }

        trace!(
            timestamp_ms = frame.timestamp_ms,
            cluster_type = ?frame.cluster_type,
            remaining = state.frames.len(),
            "Popped frame"
        );
        Ok(Some(frame))
    }

    /// Put a popped frame back at the head of the pending sequence.
    ///
    /// Used when a consumer could not deliver the frame. If it was the last
    /// cluster start popped, the cluster cursor moves back to its previous
    /// value so later pushes in front of it get the same baseline as before
    /// the pop. The frame's rendered header is kept as is.
    pub fn requeue(&self, frame: DataFrame<'p>) -> Result<()> {
        let mut state = self.lock("requeue")?;
        state.frames.try_reserve(1).map_err(|e| {
            StreamError::resource_exhausted("pending frame slot", DataFrame::FIXED_OVERHEAD, e)
        })?;

        if frame.cluster_type.starts_cluster()
            && state.cluster_timestamp_ms == frame.timestamp_ms
        {
            state.cluster_timestamp_ms = state.previous_cluster_timestamp_ms;
        }

        debug!(
            timestamp_ms = frame.timestamp_ms,
            cluster_type = ?frame.cluster_type,
            pending = state.frames.len() + 1,
            "Requeued frame"
        );
        state.frames.push_front(frame);
        Ok(())
    }

    /// Metadata of the earliest pending frame, without removing it.
    pub fn peek(&self) -> Result<Option<FrameInfo>> {
        self.peek_with(DataFrame::info)
    }

    /// Run `f` on the earliest pending frame while the buffer is locked.
    ///
    /// `f` must not call back into this buffer.
    pub fn peek_with<R>(&self, f: impl FnOnce(&DataFrame<'p>) -> R) -> Result<Option<R>> {
        let state = self.lock("peek")?;
        Ok(state.frames.front().map(f))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock("is_empty")?.frames.is_empty())
    }

    /// Number of pending frames.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock("len")?.frames.len())
    }

    /// Whether any pending frame belongs to `track_type`.
    pub fn has_data_for_track(&self, track_type: TrackType) -> Result<bool> {
        let state = self.lock("has_data_for_track")?;
        Ok(state.frames.iter().any(|f| f.track_type == track_type))
    }

    /// Bytes attributed to the buffer: its fixed overhead, the top-level
    /// header, and every pending frame's overhead, header and payload.
    pub fn memory_footprint(&self) -> Result<usize> {
        let state = self.lock("memory_footprint")?;
        Ok(Self::FIXED_OVERHEAD + self.top_level_header.len() + state.frames_footprint())
    }

    /// Timestamp of the most recently popped cluster-starting frame.
    pub fn cluster_timestamp_cursor(&self) -> Result<u64> {
        Ok(self.lock("cluster_timestamp_cursor")?.cluster_timestamp_ms)
    }

    pub fn stats(&self) -> Result<BufferStats> {
        let state = self.lock("stats")?;

        let mut stats = BufferStats {
            pending_frames: state.frames.len(),
            cluster_timestamp_ms: state.cluster_timestamp_ms,
            head_timestamp_ms: state.frames.front().map(DataFrame::timestamp_ms),
            tail_timestamp_ms: state.frames.back().map(DataFrame::timestamp_ms),
            ..BufferStats::default()
        };
        for frame in &state.frames {
            match frame.track_type {
                TrackType::Video => stats.video_frames += 1,
                TrackType::Audio => stats.audio_frames += 1,
            }
            if frame.cluster_type.starts_cluster() {
                stats.cluster_frames += 1;
            }
            stats.header_bytes += frame.header.len();
            stats.payload_bytes += frame.payload.len();
        }
        stats.memory_footprint =
            Self::FIXED_OVERHEAD + self.top_level_header.len() + state.frames_footprint();

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::{
        FailingGenerator, RejectingGenerator, sample_audio_track, sample_video_track,
    };
    use proptest::prelude::*;

    type MkvBuffer = StreamBuffer<'static, MkvHeaderGenerator>;

    static PAYLOAD: [u8; 64] = [0xAB; 64];

    fn video_only() -> StreamBuffer<'static> {
        StreamBuffer::new(sample_video_track(), None).unwrap()
    }

    fn video_cluster(ts: u64) -> FrameDescriptor<'static> {
        FrameDescriptor::cluster_start(TrackType::Video, ts, &PAYLOAD)
    }

    fn video_block(ts: u64) -> FrameDescriptor<'static> {
        FrameDescriptor::continuation(TrackType::Video, ts, &PAYLOAD)
    }

    fn pending_timestamps(buffer: &StreamBuffer<'_>) -> Vec<u64> {
        buffer.state.lock().unwrap().frames.iter().map(|f| f.timestamp_ms).collect()
    }

    fn poison(buffer: &StreamBuffer<'_>) {
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = buffer.state.lock().unwrap();
                    panic!("poisoning stream buffer lock");
                })
                .join();
        });
    }

    #[test]
    fn new_buffer_is_empty_with_header() {
        let buffer = video_only();
        assert!(buffer.is_empty().unwrap());
        assert_eq!(buffer.len().unwrap(), 0);
        assert!(buffer.has_video_track());
        assert!(!buffer.has_audio_track());
        assert_eq!(&buffer.top_level_header().unwrap()[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 0);
        assert!(buffer.pop().unwrap().is_none());
        assert!(buffer.peek().unwrap().is_none());
    }

    #[test]
    fn audio_track_is_recorded() {
        let buffer = StreamBuffer::new(sample_video_track(), Some(sample_audio_track())).unwrap();
        assert!(buffer.has_audio_track());
    }

    #[test]
    fn invalid_tracks_are_rejected() {
        let bad_video = VideoTrackInfo::new("cam", "V_MPEG4/ISO/AVC", 0, 720);
        assert!(matches!(
            StreamBuffer::new(bad_video, None),
            Err(StreamError::InvalidArgument { .. })
        ));

        let bad_audio = AudioTrackInfo::new("mic", "A_AAC", 0, 2);
        assert!(matches!(
            StreamBuffer::new(sample_video_track(), Some(bad_audio)),
            Err(StreamError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn missing_video_in_config_is_rejected() {
        let config = StreamConfig::default();
        assert!(matches!(
            StreamBuffer::from_config(&config),
            Err(StreamError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn header_generation_failure_propagates() {
        let result = StreamBuffer::<'static, _>::with_generator(
            FailingGenerator,
            sample_video_track(),
            None,
        );
        assert!(matches!(result, Err(StreamError::HeaderGenerationFailed { .. })));
    }

    #[test]
    fn empty_top_level_header_is_not_initialized() {
        let buffer =
            StreamBuffer::<'static, _>::with_generator(RejectingGenerator, sample_video_track(), None)
                .unwrap();
        assert!(matches!(
            buffer.top_level_header(),
            Err(StreamError::NotInitialized { .. })
        ));
    }

    #[test]
    fn unsupported_cluster_type_leaves_buffer_unchanged() {
        let buffer =
            StreamBuffer::with_generator(RejectingGenerator, sample_video_track(), None).unwrap();
        let result = buffer.push(video_cluster(0));
        assert!(matches!(
            result,
            Err(StreamError::UnsupportedClusterType { cluster_type: ClusterType::Cluster })
        ));
        assert!(buffer.is_empty().unwrap());
    }

    #[test]
    fn audio_frame_without_audio_track_is_rejected() {
        let buffer = video_only();
        let result = buffer.push(FrameDescriptor::continuation(TrackType::Audio, 0, &PAYLOAD));
        assert!(matches!(result, Err(StreamError::InvalidArgument { .. })));
        assert!(buffer.is_empty().unwrap());
    }

    #[test]
    fn video_cluster_then_continuation() {
        let buffer = video_only();
        buffer.push(video_cluster(0)).unwrap();
        buffer.push(video_block(40)).unwrap();

        let first = buffer.pop().unwrap().unwrap();
        assert_eq!(first.cluster_type(), ClusterType::Cluster);
        assert_eq!(first.timestamp_ms(), 0);
        assert_eq!(first.delta_ms(), 0);
        assert_eq!(first.header().len(), 31);

        let second = buffer.pop().unwrap().unwrap();
        assert_eq!(second.cluster_type(), ClusterType::SimpleBlock);
        assert_eq!(second.delta_ms(), 40);
        assert_eq!(&second.header()[10..12], &40u16.to_be_bytes());

        assert!(buffer.is_empty().unwrap());
    }

    #[test]
    fn out_of_order_pushes_are_sorted_with_local_baselines() {
        let buffer = video_only();
        let cluster = buffer.push(video_cluster(100)).unwrap();
        let early = buffer.push(video_block(50)).unwrap();
        let late = buffer.push(video_block(150)).unwrap();

        assert_eq!((cluster.index, cluster.delta_ms), (0, 100));
        assert_eq!((early.index, early.delta_ms), (0, 50));
        assert_eq!((late.index, late.delta_ms), (2, 50));

        let order: Vec<u64> = std::iter::from_fn(|| buffer.pop().unwrap())
            .map(|f| f.timestamp_ms())
            .collect();
        assert_eq!(order, vec![50, 100, 150]);
    }

    #[test]
    fn equal_timestamps_keep_push_order() {
        let buffer = StreamBuffer::new(sample_video_track(), Some(sample_audio_track())).unwrap();
        buffer.push(video_cluster(10)).unwrap();
        let audio = buffer
            .push(FrameDescriptor::continuation(TrackType::Audio, 10, &PAYLOAD))
            .unwrap();
        assert_eq!(audio.index, 1);

        assert_eq!(buffer.pop().unwrap().unwrap().track_type(), TrackType::Video);
        assert_eq!(buffer.pop().unwrap().unwrap().track_type(), TrackType::Audio);
    }

    #[test]
    fn pop_moves_cursor_only_for_cluster_frames() {
        let buffer = video_only();
        buffer.push(video_block(5)).unwrap();
        buffer.push(video_cluster(20)).unwrap();
        buffer.push(video_block(30)).unwrap();

        buffer.pop().unwrap();
        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 0);
        buffer.pop().unwrap();
        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 20);
        buffer.pop().unwrap();
        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 20);
    }

    #[test]
    fn deltas_use_cursor_after_cluster_is_popped() {
        let buffer = video_only();
        buffer.push(video_cluster(1_000)).unwrap();
        buffer.pop().unwrap();

        let pushed = buffer.push(video_block(1_040)).unwrap();
        assert_eq!(pushed.delta_ms, 40);
    }

    #[test]
    fn oversized_delta_wraps() {
        let buffer = video_only();
        let pushed = buffer.push(video_block(70_000)).unwrap();
        assert_eq!(pushed.delta_ms, (70_000u64 % 65_536) as u16);

        buffer.push(video_cluster(80_000)).unwrap();
        buffer.pop().unwrap();
        buffer.pop().unwrap();
        let behind = buffer.push(video_block(79_999)).unwrap();
        assert_eq!(behind.delta_ms, u16::MAX);
    }

    #[test]
    fn peek_does_not_remove_or_move_cursor() {
        let buffer = video_only();
        buffer.push(video_cluster(500)).unwrap();

        let peeked = buffer.peek().unwrap().unwrap();
        assert_eq!(peeked.timestamp_ms, 500);
        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 0);
        assert_eq!(buffer.len().unwrap(), 1);

        let header_len = buffer.peek_with(|f| f.content().header.len()).unwrap();
        assert_eq!(header_len, Some(31));

        let popped = buffer.pop().unwrap().unwrap();
        assert_eq!(popped.info(), peeked);
    }

    #[test]
    fn requeue_restores_head_and_cursor() {
        let buffer = video_only();
        buffer.push(video_cluster(100)).unwrap();
        buffer.pop().unwrap().unwrap().release();
        buffer.push(video_cluster(1000)).unwrap();
        buffer.push(video_block(1040)).unwrap();

        let popped = buffer.pop().unwrap().unwrap();
        let header = popped.content().header.to_vec();
        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 1000);

        buffer.requeue(popped).unwrap();
        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 100);
        assert_eq!(buffer.len().unwrap(), 2);

        // A late frame in front of the requeued cluster uses the restored baseline
        let late = buffer.push(video_block(160)).unwrap();
        assert_eq!(late.index, 0);
        assert_eq!(late.delta_ms, 60);

        buffer.pop().unwrap().unwrap();
        let again = buffer.pop().unwrap().unwrap();
        assert_eq!(again.timestamp_ms(), 1000);
        assert_eq!(again.content().header, header.as_slice());
        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 1000);
    }

    #[test]
    fn requeue_continuation_keeps_cursor() {
        let buffer = video_only();
        buffer.push(video_cluster(0)).unwrap();
        buffer.push(video_block(40)).unwrap();
        buffer.pop().unwrap().unwrap();

        let block = buffer.pop().unwrap().unwrap();
        buffer.requeue(block).unwrap();

        assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), 0);
        assert_eq!(buffer.peek().unwrap().map(|f| f.timestamp_ms), Some(40));
    }

    #[test]
    fn track_presence_follows_pending_frames() {
        let buffer = StreamBuffer::new(sample_video_track(), Some(sample_audio_track())).unwrap();
        assert!(!buffer.has_data_for_track(TrackType::Video).unwrap());

        buffer.push(FrameDescriptor::continuation(TrackType::Audio, 0, &PAYLOAD)).unwrap();
        assert!(buffer.has_data_for_track(TrackType::Audio).unwrap());
        assert!(!buffer.has_data_for_track(TrackType::Video).unwrap());

        buffer.pop().unwrap();
        assert!(!buffer.has_data_for_track(TrackType::Audio).unwrap());
    }

    #[test]
    fn memory_footprint_counts_headers_and_payloads() {
        let buffer = video_only();
        let base = MkvBuffer::FIXED_OVERHEAD + buffer.top_level_header().unwrap().len();
        assert_eq!(buffer.memory_footprint().unwrap(), base);

        buffer.push(video_cluster(0)).unwrap();
        buffer.push(video_block(40)).unwrap();
        let frames = 2 * (DataFrame::FIXED_OVERHEAD + PAYLOAD.len()) + 31 + 13;
        assert_eq!(buffer.memory_footprint().unwrap(), base + frames);

        let stats = buffer.stats().unwrap();
        assert_eq!(stats.memory_footprint, base + frames);
        assert_eq!(stats.pending_frames, 2);
        assert_eq!(stats.video_frames, 2);
        assert_eq!(stats.cluster_frames, 1);
        assert_eq!(stats.header_bytes, 44);
        assert_eq!(stats.payload_bytes, 128);
        assert_eq!(stats.head_timestamp_ms, Some(0));
        assert_eq!(stats.tail_timestamp_ms, Some(40));
    }

    #[test]
    fn poisoned_lock_fails_operations() {
        let buffer = video_only();
        poison(&buffer);

        assert!(matches!(
            buffer.push(video_cluster(0)),
            Err(StreamError::LockFailed { operation: "push" })
        ));
        assert!(matches!(buffer.pop(), Err(StreamError::LockFailed { operation: "pop" })));
        assert!(buffer.peek().is_err());
        assert!(buffer.is_empty().is_err());
        assert!(buffer.has_data_for_track(TrackType::Video).is_err());
        assert!(buffer.memory_footprint().is_err());
        assert!(buffer.top_level_header().is_ok());
        buffer.destroy();
    }

    #[test]
    fn destroy_with_pending_frames() {
        let payload = vec![1u8; 16];
        let buffer = StreamBuffer::new(sample_video_track(), None).unwrap();
        buffer.push(FrameDescriptor::cluster_start(TrackType::Video, 0, &payload)).unwrap();
        buffer.destroy();
        assert_eq!(payload.len(), 16);
    }

    fn frame_strategy() -> impl Strategy<Value = Vec<(u64, bool)>> {
        proptest::collection::vec((0u64..200_000, any::<bool>()), 0..64)
    }

    proptest! {
        #[test]
        fn prop_pending_sequence_stays_sorted(frames in frame_strategy()) {
            let buffer = video_only();
            for (ts, cluster) in frames {
                let frame = if cluster { video_cluster(ts) } else { video_block(ts) };
                buffer.push(frame).unwrap();
                let pending = pending_timestamps(&buffer);
                prop_assert!(pending.windows(2).all(|w| w[0] <= w[1]));
            }
        }

        #[test]
        fn prop_pop_drains_in_order(frames in frame_strategy()) {
            let buffer = video_only();
            for &(ts, cluster) in &frames {
                let frame = if cluster { video_cluster(ts) } else { video_block(ts) };
                buffer.push(frame).unwrap();
            }

            let mut last = None;
            for _ in 0..frames.len() {
                let frame = buffer.pop().unwrap().unwrap();
                if let Some(prev) = last {
                    prop_assert!(prev <= frame.timestamp_ms());
                }
                last = Some(frame.timestamp_ms());
            }
            prop_assert!(buffer.is_empty().unwrap());
        }

        #[test]
        fn prop_cursor_tracks_last_popped_cluster(frames in frame_strategy()) {
            let buffer = video_only();
            for &(ts, cluster) in &frames {
                let frame = if cluster { video_cluster(ts) } else { video_block(ts) };
                buffer.push(frame).unwrap();
            }

            let mut expected = 0;
            while let Some(frame) = buffer.pop().unwrap() {
                if frame.cluster_type().starts_cluster() {
                    expected = frame.timestamp_ms();
                }
                prop_assert_eq!(buffer.cluster_timestamp_cursor().unwrap(), expected);
            }
        }

        #[test]
        fn prop_delta_is_truncated_distance_to_baseline(baseline in 0u64..1_000_000, offset in 0u64..1_000_000) {
            let buffer = video_only();
            buffer.push(video_cluster(baseline)).unwrap();
            buffer.pop().unwrap();

            let pushed = buffer.push(video_block(baseline + offset)).unwrap();
            prop_assert_eq!(pushed.delta_ms, offset as u16);
        }

        #[test]
        fn prop_footprint_matches_pending_frames(frames in frame_strategy()) {
            let buffer = video_only();
            for &(ts, cluster) in &frames {
                let frame = if cluster { video_cluster(ts) } else { video_block(ts) };
                buffer.push(frame).unwrap();
            }

            let clusters = frames.iter().filter(|(_, c)| *c).count();
            let expected = MkvBuffer::FIXED_OVERHEAD
                + buffer.top_level_header().unwrap().len()
                + frames.len() * (DataFrame::FIXED_OVERHEAD + PAYLOAD.len() + 13)
                + clusters * 18;
            prop_assert_eq!(buffer.memory_footprint().unwrap(), expected);
        }
    }
}
