use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::TailError;
use crate::reader::ReverseTailReader;

/// Adapts a [`ReverseTailReader`] to an async byte stream.
///
/// A blocking pump task steps the reader and pushes each chunk through a
/// bounded channel of capacity 1, so the reader never runs more than one chunk
/// ahead of the consumer. Dropping the stream (for example on client
/// disconnect) fails the pump's next send; the pump then stops and drops the
/// reader, which closes the file handle. No reads happen after cancellation
/// is observed.
pub struct LineStream {
    rx: mpsc::Receiver<Result<Bytes, TailError>>,
}

impl LineStream {
    pub fn spawn(mut reader: ReverseTailReader) -> Self {
        let (tx, rx) = mpsc::channel(1);
        tokio::task::spawn_blocking(move || loop {
            match reader.next_chunk() {
                Ok(Some(chunk)) => {
                    if tx.blocking_send(Ok(chunk)).is_err() {
                        tracing::debug!("tail consumer went away, stopping read");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "tail read failed mid-stream");
                    // Receiver may already be gone; nothing more to do either way.
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Pull the next chunk. Used directly by tests; HTTP consumers go through
    /// the `Stream` impl.
    pub async fn recv(&mut self) -> Option<Result<Bytes, TailError>> {
        self.rx.recv().await
    }
}

impl futures_core::Stream for LineStream {
    type Item = Result<Bytes, TailError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
