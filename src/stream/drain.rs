//! Polling drain stream

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, warn};

use crate::header::HeaderGenerator;
use crate::types::DataFrame;
use crate::{Result, StreamBuffer};

impl<'p, G: HeaderGenerator> StreamBuffer<'p, G> {
    /// Pop frames as an async stream.
    ///
    /// When the buffer is empty the stream waits `poll_interval` before
    /// checking again. It ends when `cancel` fires. A buffer failure is
    /// yielded once as an `Err` item, after which the stream ends.
    pub fn drain(
        &self,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> DrainStream<'_, 'p, G> {
        DrainStream::new(self, poll_interval, cancel)
    }
}

pin_project! {
    /// Stream of frames popped from a [`StreamBuffer`] in timestamp order
    pub struct DrainStream<'b, 'p, G: HeaderGenerator> {
        buffer: &'b StreamBuffer<'p, G>,
        interval: Interval,
        #[pin]
        cancelled: WaitForCancellationFutureOwned,
        finished: bool,
    }
}

impl<'b, 'p, G: HeaderGenerator> DrainStream<'b, 'p, G> {
    pub fn new(
        buffer: &'b StreamBuffer<'p, G>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let mut interval = interval(poll_interval);
        // Set missed tick behavior to delay (don't burst)
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { buffer, interval, cancelled: cancel.cancelled_owned(), finished: false }
    }
}

impl<'p, G: HeaderGenerator> Stream for DrainStream<'_, 'p, G> {
    type Item = Result<DataFrame<'p>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        if this.cancelled.as_mut().poll(cx).is_ready() {
            debug!("Drain cancelled");
            *this.finished = true;
            return Poll::Ready(None);
        }

        loop {
            match this.buffer.pop() {
                Ok(Some(frame)) => return Poll::Ready(Some(Ok(frame))),
                Ok(None) => {
                    // Idle: wait for the next tick, then look again
                    ready!(this.interval.poll_tick(cx));
                }
                Err(e) => {
                    warn!(error = %e, "Stopping drain after buffer failure");
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }
        }
    }
}
