//! Throughput test engine
//!
//! A download is a stream of filler chunks no larger than the configured
//! chunk size. Socket backpressure and the stall deadline are enforced where
//! the chunks are written, see `transport::http::deadline`.

use std::{convert::Infallible, time::Duration};

use axum::body::Bytes;
use futures::{Stream, stream};

/// Size of a download when the client does not ask for one
pub const DEFAULT_DOWNLOAD_SIZE: u64 = 1024 * 1024;

/// Largest single write of the download
pub const MAX_CHUNK_SIZE: usize = 4096;

pub const DEFAULT_CHUNK_SIZE: usize = MAX_CHUNK_SIZE;

pub const FILL_BYTE: u8 = 0xAA;

pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(5);

/// How a download is streamed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    pub chunk_size: usize,
    pub fill: u8,
    /// Longest a write may wait for the peer to make room
    pub stall_timeout: Duration,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fill: FILL_BYTE,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }
}

/// Download size for an optional `size` query value
pub fn requested_size(param: Option<&str>) -> u64 {
    param.map_or(DEFAULT_DOWNLOAD_SIZE, parse_size)
}

/// Best-effort integer parse
///
/// Skips leading whitespace, accepts an optional sign and reads the longest
/// digit prefix. No digits yields 0, negative values yield 0 and overflow
/// saturates.
pub fn parse_size(value: &str) -> u64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let size = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, d| {
            acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
        });

    if negative { 0 } else { size }
}

/// Filler chunks adding up to exactly `total` bytes
#[derive(Debug, Clone)]
pub struct FillerChunks {
    chunk: Bytes,
    remaining: u64,
}

impl FillerChunks {
    pub fn new(total: u64, policy: &TransferPolicy) -> Self {
        Self {
            chunk: Bytes::from(vec![policy.fill; policy.chunk_size.max(1)]),
            remaining: total,
        }
    }
}

impl Iterator for FillerChunks {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.remaining == 0 {
            return None;
        }

        let len = usize::try_from(self.remaining)
            .map_or(self.chunk.len(), |r| r.min(self.chunk.len()));
        self.remaining -= len as u64;
        Some(self.chunk.slice(..len))
    }
}

/// Response body stream for a download of `total` bytes
pub fn filler_stream(
    total: u64,
    policy: &TransferPolicy,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream::iter(FillerChunks::new(total, policy).map(Ok))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_requested_size() {
        assert_eq!(requested_size(None), 1_048_576);
        assert_eq!(requested_size(Some("100")), 100);
        assert_eq!(requested_size(Some("abc")), 0);
        assert_eq!(requested_size(Some("")), 0);
    }

    #[test]
    fn test_parse_size_best_effort() {
        assert_eq!(parse_size("4096"), 4096);
        assert_eq!(parse_size("  42"), 42);
        assert_eq!(parse_size("+7"), 7);
        assert_eq!(parse_size("12kb"), 12);
        assert_eq!(parse_size("-5"), 0);
        assert_eq!(parse_size("x12"), 0);
        assert_eq!(parse_size("99999999999999999999999"), u64::MAX);
    }

    #[test]
    fn test_exact_size_in_bounded_chunks() {
        let chunks: Vec<Bytes> = FillerChunks::new(10_000, &TransferPolicy::default()).collect();

        let sizes: Vec<usize> = chunks.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![4096, 4096, 1808]);
        assert!(chunks.iter().flatten().all(|&b| b == FILL_BYTE));
    }

    #[test]
    fn test_default_size() {
        let chunks = FillerChunks::new(requested_size(None), &TransferPolicy::default());

        let sizes: Vec<usize> = chunks.map(|c| c.len()).collect();
        assert_eq!(sizes.len(), 256);
        assert_eq!(sizes.iter().sum::<usize>(), 1_048_576);
        assert!(sizes.iter().all(|&n| n <= MAX_CHUNK_SIZE));
    }

    #[test]
    fn test_zero_size_sends_nothing() {
        assert_eq!(FillerChunks::new(0, &TransferPolicy::default()).count(), 0);
    }

    #[test]
    fn test_custom_chunk_size() {
        let policy = TransferPolicy {
            chunk_size: 1000,
            fill: 0x55,
            ..Default::default()
        };
        let chunks: Vec<Bytes> = FillerChunks::new(2500, &policy).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 500);
        assert!(chunks.iter().flatten().all(|&b| b == 0x55));
    }

    #[tokio::test]
    async fn test_filler_stream_yields_every_byte() {
        let body: Vec<u8> = filler_stream(100_000, &TransferPolicy::default())
            .map(|chunk| chunk.unwrap_or_default().to_vec())
            .concat()
            .await;

        assert_eq!(body.len(), 100_000);
        assert!(body.iter().all(|&b| b == FILL_BYTE));
    }
}
