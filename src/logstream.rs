//! Readable handle over a pod's log output
//!
//! A `LogStream` is fed by a forwarder task that owns the log connection.
//! The forwarder stops as soon as the handle is dropped, which is how a
//! follow stream gets closed.

use futures::{AsyncRead, AsyncReadExt, Stream};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

const CHUNK_SIZE: usize = 8 * 1024;
const CHANNEL_CAPACITY: usize = 16;

type Chunk = io::Result<Vec<u8>>;

/// Incrementally readable log output from a pod
///
/// Yields raw byte chunks in the order the pod produced them. A read error
/// is delivered as the final item. Drop the stream to release the
/// underlying connection.
///
/// # Example
///
/// ```ignore
/// let mut stream = scope.logs(&Selector::name("web-0"), true).await?;
/// while let Some(chunk) = stream.next_chunk().await {
///     print!("{}", String::from_utf8_lossy(&chunk?));
/// }
/// ```
#[derive(Debug)]
pub struct LogStream {
    chunks: mpsc::Receiver<Chunk>,
}

impl LogStream {
    pub(crate) fn channel() -> (mpsc::Sender<Chunk>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (tx, Self { chunks: rx })
    }

    /// A finished stream holding exactly `bytes`
    ///
    /// Useful for fake `ClusterApi` implementations in caller tests.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let (tx, rx) = mpsc::channel(1);
        if !bytes.is_empty() {
            // Capacity 1 and a fresh channel: cannot be full
            let _ = tx.try_send(Ok(bytes));
        }
        Self { chunks: rx }
    }

    /// Wait for the next chunk, `None` at end of stream
    pub async fn next_chunk(&mut self) -> Option<io::Result<Vec<u8>>> {
        self.chunks.recv().await
    }

    /// Read until end of stream
    ///
    /// On a follow stream this only returns once the pod terminates.
    pub async fn read_to_end(mut self) -> io::Result<Vec<u8>> {
        let mut output = Vec::new();
        while let Some(chunk) = self.chunks.recv().await {
            output.extend_from_slice(&chunk?);
        }
        Ok(output)
    }

    /// Read until end of stream, decoding as UTF-8 (lossy)
    pub async fn read_to_string(self) -> io::Result<String> {
        let bytes = self.read_to_end().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Stream for LogStream {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.chunks.poll_recv(cx)
    }
}

/// Copy `reader` into `tx` until EOF, a read error, or the receiver is gone
///
/// A follow stream can sit in a read for as long as the pod stays quiet, so
/// each read races the receiver going away.
pub(crate) async fn forward<R>(reader: R, tx: mpsc::Sender<Chunk>)
where
    R: AsyncRead,
{
    let mut reader = Box::pin(reader);
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let read = tokio::select! {
            read = reader.read(&mut buf) => read,
            () = tx.closed() => {
                debug!("Log stream dropped while waiting for output");
                break;
            }
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Ok(buf[..n].to_vec())).await.is_err() {
                    debug!("Log stream closed by reader");
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}
