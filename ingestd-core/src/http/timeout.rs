//! Per-operation socket timeout
//!
//! [`TimedIo`] wraps a stream so that any read, or any write/flush/shutdown,
//! that stays pending for longer than the timeout fails with
//! [`io::ErrorKind::TimedOut`]. The timeout measures inactivity: progress in
//! either direction restarts both clocks. hyper keeps a read pending while it
//! writes a response body, and a slow but steady download must not trip it.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Sleep;

#[derive(Debug)]
pub struct TimedIo<T> {
    inner: T,
    timeout: Duration,
    read_deadline: Option<Pin<Box<Sleep>>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
}

impl<T> TimedIo<T> {
    pub fn new(inner: T, timeout: Duration) -> Self {
        Self { inner, timeout, read_deadline: None, write_deadline: None }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Push back any armed deadline after bytes moved.
    fn touch(&mut self) {
        let next = tokio::time::Instant::now() + self.timeout;
        for deadline in [&mut self.read_deadline, &mut self.write_deadline] {
            if let Some(sleep) = deadline.as_mut() {
                sleep.as_mut().reset(next);
            }
        }
    }
}

/// Resolve a pending operation against its deadline, arming it on first use.
fn poll_deadline<R>(
    deadline: &mut Option<Pin<Box<Sleep>>>,
    timeout: Duration,
    cx: &mut Context<'_>,
    what: &'static str,
) -> Poll<io::Result<R>> {
    let sleep = deadline.get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
    match sleep.as_mut().poll(cx) {
        Poll::Ready(()) => {
            *deadline = None;
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("socket {} timed out after {:?}", what, timeout),
            )))
        }
        Poll::Pending => Poll::Pending,
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for TimedIo<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.read_deadline = None;
                if result.is_ok() && buf.filled().len() > before {
                    this.touch();
                }
                Poll::Ready(result)
            }
            Poll::Pending => poll_deadline(&mut this.read_deadline, this.timeout, cx, "read"),
        }
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for TimedIo<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                if matches!(result, Ok(n) if n > 0) {
                    this.touch();
                }
                Poll::Ready(result)
            }
            Poll::Pending => poll_deadline(&mut this.write_deadline, this.timeout, cx, "write"),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => poll_deadline(&mut this.write_deadline, this.timeout, cx, "flush"),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_shutdown(cx) {
            Poll::Ready(result) => {
                this.write_deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => poll_deadline(&mut this.write_deadline, this.timeout, cx, "shutdown"),
        }
    }
}

/// True if `err` or anything in its source chain is an I/O timeout
pub fn is_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::TimedOut {
                return true;
            }
            // io::Error::source skips the wrapped error itself
            if let Some(inner) = io_err.get_ref() {
                if is_timeout(inner) {
                    return true;
                }
            }
        }
        current = e.source();
    }
    false
}
