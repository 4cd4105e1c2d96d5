//! Consumer-side frame delivery
//!
//! A [`FrameSink`] is wherever popped frames go: an HTTP upload body, a file,
//! an in-memory buffer. [`pump`] connects a [`StreamBuffer`] to a sink: it
//! writes the top-level header once, then every frame as header + payload in
//! timestamp order until cancelled.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::header::HeaderGenerator;
use crate::types::FrameContent;
use crate::{Result, StreamBuffer};

/// Destination for container bytes.
#[async_trait]
pub trait FrameSink: Send {
    /// Write the stream-lifetime header. Called once, before any frame.
    async fn send_header(&mut self, header: &[u8]) -> Result<()>;

    /// Write one frame: its generated header followed by its payload.
    async fn send_frame(&mut self, frame: FrameContent<'_, '_>) -> Result<()>;
}

/// Accumulates the container byte stream in memory.
#[async_trait]
impl FrameSink for Vec<u8> {
    async fn send_header(&mut self, header: &[u8]) -> Result<()> {
        self.extend_from_slice(header);
        Ok(())
    }

    async fn send_frame(&mut self, frame: FrameContent<'_, '_>) -> Result<()> {
        self.reserve(frame.len());
        self.extend_from_slice(frame.header);
        self.extend_from_slice(frame.payload);
        Ok(())
    }
}

/// Totals reported by [`pump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpReport {
    pub header_bytes: usize,
    pub frames: usize,
    /// Frame bytes (headers + payloads), excluding the top-level header
    pub bytes: usize,
}

/// Deliver the buffer's contents to `sink` until `cancel` fires.
///
/// Frames are released as soon as the sink accepts them. A sink error stops
/// the pump; the frame that failed is requeued at the head of the buffer so a
/// later pump resends it first. A buffer failure ends the pump with that
/// error.
pub async fn pump<G, S>(
    buffer: &StreamBuffer<'_, G>,
    sink: &mut S,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Result<PumpReport>
where
    G: HeaderGenerator,
    S: FrameSink + ?Sized,
{
    let header = buffer.top_level_header()?;
    sink.send_header(header).await?;

    let mut report = PumpReport { header_bytes: header.len(), ..PumpReport::default() };
    info!(header_bytes = report.header_bytes, "Stream header sent");

    let mut frames = std::pin::pin!(buffer.drain(poll_interval, cancel));
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        let content = frame.content();
        let len = content.len();
        if let Err(e) = sink.send_frame(content).await {
            warn!(
                timestamp_ms = frame.timestamp_ms(),
                error = %e,
                "Sink rejected frame, requeueing"
            );
            buffer.requeue(frame)?;
            return Err(e);
        }

        report.frames += 1;
        report.bytes += len;
        debug!(
            timestamp_ms = frame.timestamp_ms(),
            track = ?frame.track_type(),
            bytes = len,
            "Frame sent"
        );
        frame.release();
    }

    info!(frames = report.frames, bytes = report.bytes, "Pump stopped");
    Ok(report)
}
