//! Async consumer surface over [`StreamBuffer`](crate::StreamBuffer)

mod drain;

pub use drain::DrainStream;
