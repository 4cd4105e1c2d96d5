//! Matroska (MKV) container support
//!
//! [`MkvHeaderGenerator`] is the default [`HeaderGenerator`](crate::HeaderGenerator)
//! used by [`StreamBuffer`](crate::StreamBuffer). The [`codec_private`] helpers
//! build the CodecPrivate payloads that track descriptors carry.

pub mod codec_private;
mod ebml;
mod generator;

pub use codec_private::{Mpeg4AudioObjectType, PcmFormat};
pub use generator::{
    CLUSTER_HEADER_LEN, DEFAULT_APP_NAME, MkvHeaderGenerator, SIMPLE_BLOCK_HEADER_LEN,
};
