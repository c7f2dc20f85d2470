// apsort-camera/src/stream.rs
use crate::{BgrFrame, Capture, Result};
use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// back‑pressure: appsink → channel → consumer
const DEPTH: usize = 4;

/// Pull frames on a dedicated thread. The stream ends at end-of-stream,
/// after the first error, or when the consumer drops it.
pub fn frame_stream(mut cap: Capture) -> impl Stream<Item = Result<BgrFrame>> + Unpin {
    let (tx, rx) = mpsc::channel(DEPTH);

    std::thread::spawn(move || {
        loop {
            match cap.next_frame_blocking() {
                Ok(Some(f)) => {
                    if tx.blocking_send(Ok(f)).is_err() {
                        break; // consumer dropped
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        }
    });

    ReceiverStream::new(rx)
}
