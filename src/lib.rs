//! Timestamp-ordered Matroska frame buffer for live media uploads.
//!
//! `mkvqueue` sits between a media producer (camera, encoder) and a network
//! uploader. Producers push encoded frames with their timestamps; the buffer
//! keeps them sorted, renders the Matroska Cluster/SimpleBlock header for each
//! one at push time, and hands them to the consumer in timestamp order.
//!
//! # Features
//!
//! - **Ordered**: out-of-order pushes are inserted in timestamp order
//! - **Zero-copy payloads**: frames borrow producer memory for their lifetime
//! - **Thread-safe**: one buffer, any number of producer and consumer threads
//! - **Async drain**: a `futures::Stream` and a [`pump`] into any [`FrameSink`]
//!
//! # Quick Start
//!
//! ```rust
//! use mkvqueue::{FrameDescriptor, StreamBuffer, TrackType, VideoTrackInfo};
//!
//! # fn main() -> mkvqueue::Result<()> {
//! let key_frame = vec![0u8; 2048];
//! let buffer = StreamBuffer::new(
//!     VideoTrackInfo::new("cam", "V_MPEG4/ISO/AVC", 640, 480),
//!     None,
//! )?;
//!
//! let mut upload = buffer.top_level_header()?.to_vec();
//! buffer.push(FrameDescriptor::cluster_start(TrackType::Video, 0, &key_frame))?;
//!
//! while let Some(frame) = buffer.pop()? {
//!     let content = frame.content();
//!     upload.extend_from_slice(content.header);
//!     upload.extend_from_slice(content.payload);
//! }
//! assert_eq!(&upload[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
//! # Ok(())
//! # }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Buffer and container headers
mod buffer;
pub mod config;
pub mod header;
pub mod mkv;

// Consumer surface
pub mod sink;
pub mod stream;

// Core exports
pub use buffer::{BufferStats, PushedFrame, StreamBuffer};
pub use error::*;
pub use types::*;

// Header exports
pub use header::{BlockHeader, HeaderGenerator};
pub use mkv::MkvHeaderGenerator;

// Config and consumer exports
pub use config::StreamConfig;
pub use sink::{FrameSink, PumpReport, pump};
pub use stream::DrainStream;
