//! Byte stream helpers shared by adapters.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::traits::{ByteStream, StorageError, StorageResult};

/// Wrap a stream so that it yields `Cancelled` and ends once `cancel` fires.
///
/// The inner stream (and whatever handle it owns) is dropped as soon as the
/// cancellation is observed.
pub fn cancellable<S>(inner: S, cancel: CancellationToken, key: String) -> ByteStream
where
    S: Stream<Item = StorageResult<Bytes>> + Send + 'static,
{
    let inner: ByteStream = Box::pin(inner);
    let stream = futures::stream::unfold(Some((inner, cancel, key)), |state| async move {
        let (mut inner, cancel, key) = state?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Some((
                Err(StorageError::Cancelled(format!("read of {} cancelled", key))),
                None,
            )),
            item = inner.next() => match item {
                Some(Ok(chunk)) => Some((Ok(chunk), Some((inner, cancel, key)))),
                Some(Err(e)) => Some((Err(e), None)),
                None => None,
            },
        }
    });
    Box::pin(stream)
}

/// Stream over an in-memory buffer, used when a caller hands bytes to a
/// streaming interface.
pub fn from_bytes(data: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Drain a stream into memory. Intended for small objects and tests.
pub async fn collect(mut stream: ByteStream) -> StorageResult<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}
