//! Header generator trait for container formats

use crate::Result;
use crate::types::{AudioTrackInfo, ClusterType, TrackType, VideoTrackInfo};

/// Per-frame inputs for rendering a cluster/block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub cluster_type: ClusterType,
    pub payload_len: usize,
    pub track_type: TrackType,
    pub is_key_frame: bool,
    /// Absolute timestamp, written into Cluster headers
    pub timestamp_ms: u64,
    /// Timestamp relative to the frame's cluster, truncated to 16 bits
    pub delta_ms: u16,
}

/// Trait for container header generators
///
/// Generators are pure: the same inputs always produce the same bytes, and
/// they share no state with the stream buffer. The buffer calls them while
/// holding its lock, so implementations must not block.
pub trait HeaderGenerator: Send + Sync {
    /// Build the stream-lifetime header from the track configuration.
    ///
    /// Returns:
    /// - `Ok(bytes)` - Header bytes, owned by the caller
    /// - `Err(e)` - The configuration cannot be described
    fn build_top_level_header(
        &self,
        video: &VideoTrackInfo,
        audio: Option<&AudioTrackInfo>,
    ) -> Result<Vec<u8>>;

    /// Length of the header rendered for `cluster_type`.
    ///
    /// Returns 0 when the cluster type is not supported.
    fn cluster_header_len(&self, cluster_type: ClusterType) -> usize;

    /// Render a header into `buf`, which is exactly
    /// `cluster_header_len(block.cluster_type)` bytes long.
    fn render_cluster_header(&self, buf: &mut [u8], block: &BlockHeader);
}
