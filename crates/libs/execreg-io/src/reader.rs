//! Bounded, cancellable reads from byte streams.

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::Mutex,
};
use tracing::trace;

use crate::{prelude::*, scope::Scope};

/// Perform a single bounded read from `reader`.
///
/// Returns up to `chunk_size` bytes of newly available data. The read is raced
/// against `scope`: whichever completes first determines the result. The
/// pending read is dropped when the scope wins, which is safe because
/// `AsyncRead::read` does not consume data it has not returned.
///
/// A scope that is already expired fails with [`Error::Timeout`] without
/// touching the stream.
///
/// # Arguments
///
/// * `reader` - Stream to read from
/// * `scope` - Cancellation scope bounding the read
/// * `chunk_size` - Maximum number of bytes to return; `0` reads one byte
///
/// # Returns
///
/// Returns the bytes read, [`Error::Eof`] if the stream is closed,
/// [`Error::Timeout`] if the scope expired first, or [`Error::IO`].
///
/// # Examples
///
/// ```rust
/// use execreg_io::{reader::read_chunk, scope::Scope};
///
/// #[tokio::main]
/// async fn main() {
///     let mut data: &[u8] = b"hello world";
///     let chunk = read_chunk(&mut data, &Scope::unbounded(), 5).await.unwrap();
///     assert_eq!(chunk, b"hello");
/// }
/// ```
pub async fn read_chunk<R>(reader: &mut R, scope: &Scope, chunk_size: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if scope.is_expired() {
        return Err(Error::Timeout);
    }

    let mut buffer = vec![0; chunk_size.max(1)];
    tokio::select! {
        biased;
        _ = scope.expired() => Err(Error::Timeout),
        read = reader.read(&mut buffer) => match read {
            Ok(0) => Err(Error::Eof),
            Ok(n) => {
                trace!("Read {} bytes", n);
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(err) => Err(Error::IO(err)),
        },
    }
}

/// Perform a single bounded read from a stream shared behind a mutex.
///
/// Waiting for the lock is part of the race against `scope`, so a caller
/// queued behind another reader still gives up when its scope expires.
pub async fn read_chunk_locked<R>(
    reader: &Mutex<R>,
    scope: &Scope,
    chunk_size: usize,
) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    if scope.is_expired() {
        return Err(Error::Timeout);
    }

    let mut guard = tokio::select! {
        biased;
        _ = scope.expired() => return Err(Error::Timeout),
        guard = reader.lock() => guard,
    };
    read_chunk(&mut *guard, scope, chunk_size).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncWriteExt, duplex};

    use super::*;

    #[tokio::test]
    async fn returns_available_bytes_up_to_chunk_size() {
        let (mut tx, mut rx) = duplex(1024);
        tx.write_all(b"0123456789").await.unwrap();

        let scope = Scope::unbounded();
        assert_eq!(read_chunk(&mut rx, &scope, 4).await.unwrap(), b"0123");
        assert_eq!(read_chunk(&mut rx, &scope, 4).await.unwrap(), b"4567");
        assert_eq!(read_chunk(&mut rx, &scope, 4).await.unwrap(), b"89");
    }

    #[tokio::test]
    async fn zero_chunk_size_reads_one_byte() {
        let mut data: &[u8] = b"ab";
        let chunk = read_chunk(&mut data, &Scope::unbounded(), 0).await.unwrap();
        assert_eq!(chunk, b"a");
    }

    #[tokio::test]
    async fn closed_stream_is_eof() {
        let (tx, mut rx) = duplex(64);
        drop(tx);

        let result = read_chunk(&mut rx, &Scope::unbounded(), 16).await;
        assert!(matches!(result, Err(Error::Eof)));
    }

    #[tokio::test]
    async fn expired_scope_fails_without_reading() {
        let (mut tx, mut rx) = duplex(64);
        tx.write_all(b"pending").await.unwrap();

        let scope = Scope::unbounded();
        scope.cancel();
        assert!(matches!(
            read_chunk(&mut rx, &scope, 16).await,
            Err(Error::Timeout)
        ));

        // The data is still there for a live scope.
        let chunk = read_chunk(&mut rx, &Scope::unbounded(), 16).await.unwrap();
        assert_eq!(chunk, b"pending");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_stream_times_out() {
        let (_tx, mut rx) = duplex(64);
        let scope = Scope::with_timeout(Duration::from_secs(1));

        let result = read_chunk(&mut rx, &scope, 16).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert!(scope.is_expired());
    }

    #[tokio::test]
    async fn timed_out_read_loses_no_data() {
        let (mut tx, mut rx) = duplex(64);
        let scope = Scope::with_timeout(Duration::from_millis(20));
        assert!(matches!(
            read_chunk(&mut rx, &scope, 16).await,
            Err(Error::Timeout)
        ));

        tx.write_all(b"late").await.unwrap();
        let chunk = read_chunk(&mut rx, &Scope::unbounded(), 16).await.unwrap();
        assert_eq!(chunk, b"late");
    }

    #[tokio::test]
    async fn queued_reader_honours_its_scope() {
        let (_tx, rx) = duplex(64);
        let shared = Mutex::new(rx);
        let _held = shared.lock().await;

        let scope = Scope::with_timeout(Duration::from_millis(20));
        let result = read_chunk_locked(&shared, &scope, 16).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }
}
