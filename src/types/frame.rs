//! Frame types moved through the stream buffer

use serde::{Deserialize, Serialize};

use super::TrackType;
use crate::StreamError;

/// Whether a frame opens a new cluster or continues the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ClusterType {
    /// Continuation frame: only a SimpleBlock header
    SimpleBlock = 0,
    /// Cluster-starting frame: Cluster header followed by a SimpleBlock header
    Cluster = 1,
}

impl ClusterType {
    pub const fn starts_cluster(self) -> bool {
        matches!(self, ClusterType::Cluster)
    }
}

impl TryFrom<u8> for ClusterType {
    type Error = StreamError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ClusterType::SimpleBlock),
            1 => Ok(ClusterType::Cluster),
            _ => Err(StreamError::UnknownClusterType { value }),
        }
    }
}

/// Producer-side description of a frame to push.
///
/// The payload is borrowed: the buffer never copies it, and the borrow
/// keeps it alive until every node referencing it has been released.
#[derive(Debug, Clone, Copy)]
pub struct FrameDescriptor<'p> {
    pub track_type: TrackType,
    pub cluster_type: ClusterType,
    pub timestamp_ms: u64,
    pub is_key_frame: bool,
    pub payload: &'p [u8],
}

impl<'p> FrameDescriptor<'p> {
    /// A key frame that starts a new cluster.
    pub fn cluster_start(track_type: TrackType, timestamp_ms: u64, payload: &'p [u8]) -> Self {
        Self {
            track_type,
            cluster_type: ClusterType::Cluster,
            timestamp_ms,
            is_key_frame: true,
            payload,
        }
    }

    /// A non-key frame continuing the current cluster.
    pub fn continuation(track_type: TrackType, timestamp_ms: u64, payload: &'p [u8]) -> Self {
        Self {
            track_type,
            cluster_type: ClusterType::SimpleBlock,
            timestamp_ms,
            is_key_frame: false,
            payload,
        }
    }

    pub fn with_key_frame(mut self, is_key_frame: bool) -> Self {
        self.is_key_frame = is_key_frame;
        self
    }
}

/// Metadata snapshot of a buffered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    pub track_type: TrackType,
    pub cluster_type: ClusterType,
    pub is_key_frame: bool,
    pub timestamp_ms: u64,
    /// Cluster-relative delta encoded in the header at push time
    pub delta_ms: u16,
    pub header_len: usize,
    pub payload_len: usize,
}

/// Borrowed views of a frame's generated header and its payload.
#[derive(Debug, Clone, Copy)]
pub struct FrameContent<'a, 'p> {
    pub header: &'a [u8],
    pub payload: &'p [u8],
}

impl FrameContent<'_, '_> {
    /// Bytes a sink writes for this frame.
    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A buffered frame: copied metadata, its owned container header and a
/// borrowed payload.
///
/// Created by [`StreamBuffer::push`](crate::StreamBuffer::push) and handed to
/// the consumer by [`StreamBuffer::pop`](crate::StreamBuffer::pop). The header
/// is freed when the frame is released or dropped; the payload never is.
#[derive(Debug)]
pub struct DataFrame<'p> {
    pub(crate) track_type: TrackType,
    pub(crate) cluster_type: ClusterType,
    pub(crate) is_key_frame: bool,
    pub(crate) timestamp_ms: u64,
    pub(crate) delta_ms: u16,
    pub(crate) payload: &'p [u8],
    pub(crate) header: Vec<u8>,
}

impl<'p> DataFrame<'p> {
    /// Fixed bookkeeping size of a node, excluding header and payload bytes.
    pub const FIXED_OVERHEAD: usize = std::mem::size_of::<DataFrame<'static>>();

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    pub fn cluster_type(&self) -> ClusterType {
        self.cluster_type
    }

    pub fn is_key_frame(&self) -> bool {
        self.is_key_frame
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn delta_ms(&self) -> u16 {
        self.delta_ms
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn payload(&self) -> &'p [u8] {
        self.payload
    }

    /// Header and payload views, in the order a sink writes them.
    pub fn content(&self) -> FrameContent<'_, 'p> {
        FrameContent { header: &self.header, payload: self.payload }
    }

    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            track_type: self.track_type,
            cluster_type: self.cluster_type,
            is_key_frame: self.is_key_frame,
            timestamp_ms: self.timestamp_ms,
            delta_ms: self.delta_ms,
            header_len: self.header.len(),
            payload_len: self.payload.len(),
        }
    }

    /// Bytes attributed to this node by the buffer's memory accounting.
    ///
    /// Payload bytes count even though the node does not own them.
    pub fn footprint(&self) -> usize {
        Self::FIXED_OVERHEAD + self.header.len() + self.payload.len()
    }

    /// Release the node's header storage. Payload memory is untouched.
    pub fn release(self) {
        tracing::trace!(timestamp_ms = self.timestamp_ms, "Releasing data frame");
    }
}
