//! Core types for buffered media frames.
//!
//! ## Architecture
//!
//! - [`VideoTrackInfo`] / [`AudioTrackInfo`] describe the stream's tracks and
//!   feed the top-level container header
//! - [`FrameDescriptor`] is what a producer pushes: metadata plus a borrowed
//!   payload slice
//! - [`DataFrame`] is the buffered node: copied metadata, an owned container
//!   header and the same borrowed payload
//! - [`FrameContent`] and [`FrameInfo`] are borrowed and copied views of a node
//!
//! ## Usage Example
//!
//! ```rust
//! use mkvqueue::types::{ClusterType, FrameDescriptor, TrackType};
//!
//! let payload = vec![0u8; 1024];
//! let frame = FrameDescriptor::cluster_start(TrackType::Video, 0, &payload);
//! assert_eq!(frame.cluster_type, ClusterType::Cluster);
//! assert!(frame.is_key_frame);
//! ```

mod frame;
mod track;

pub use frame::{ClusterType, DataFrame, FrameContent, FrameDescriptor, FrameInfo};
pub use track::{AudioTrackInfo, TrackType, VideoTrackInfo};
