//! Progress deadlines on a connection's byte stream

use std::{
    future::Future,
    io::{self, ErrorKind},
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Sleep, sleep};

use crate::core::error::TransportError;

/// Stream wrapper that fails I/O which makes no progress in time
///
/// A write that cannot proceed for `stall_timeout` fails with
/// [`TransportError::TransferStalled`]; a read that waits longer than
/// `read_timeout` fails with [`TransportError::RequestTimeout`]. Both are
/// carried as the inner error of an [`ErrorKind::TimedOut`] I/O error. Any
/// progress in either direction rearms both deadlines.
#[derive(Debug)]
pub struct DeadlineStream<S> {
    inner: S,
    read_timeout: Duration,
    stall_timeout: Duration,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
    written: u64,
}

impl<S> DeadlineStream<S> {
    pub fn new(inner: S, read_timeout: Duration, stall_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
            stall_timeout,
            read_deadline: None,
            write_deadline: None,
            written: 0,
        }
    }

    /// Bytes accepted by the underlying stream so far
    pub fn written(&self) -> u64 {
        self.written
    }

    fn progress(&mut self) {
        self.read_deadline = None;
        self.write_deadline = None;
    }
}

/// Poll `deadline`, arming it first; true once it has expired
fn expired(deadline: &mut Option<Pin<Box<Sleep>>>, after: Duration, cx: &mut Context<'_>) -> bool {
    deadline
        .get_or_insert_with(|| Box::pin(sleep(after)))
        .as_mut()
        .poll(cx)
        .is_ready()
}

impl<S: AsyncRead + Unpin> AsyncRead for DeadlineStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.progress();
                Poll::Ready(result)
            }
            Poll::Pending if expired(&mut this.read_deadline, this.read_timeout, cx) => {
                Poll::Ready(Err(io::Error::new(
                    ErrorKind::TimedOut,
                    TransportError::RequestTimeout,
                )))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for DeadlineStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                this.written += n as u64;
                this.progress();
                Poll::Ready(Ok(n))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending if expired(&mut this.write_deadline, this.stall_timeout, cx) => {
                Poll::Ready(Err(io::Error::new(
                    ErrorKind::TimedOut,
                    TransportError::TransferStalled {
                        sent: this.written,
                        stalled_for: this.stall_timeout,
                    },
                )))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// The deadline error carried by `error`, if any
pub fn deadline_error(error: &io::Error) -> Option<TransportError> {
    match error.get_ref()?.downcast_ref::<TransportError>()? {
        TransportError::RequestTimeout => Some(TransportError::RequestTimeout),
        TransportError::TransferStalled { sent, stalled_for } => {
            Some(TransportError::TransferStalled {
                sent: *sent,
                stalled_for: *stalled_for,
            })
        }
        _ => None,
    }
}
