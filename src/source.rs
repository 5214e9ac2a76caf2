//! Lazy pull-based video sequences.
//!
//! Everything the merge engine consumes, remote pagination and cache
//! walks alike, is a [`VideoSource`]: a sequence that produces one element
//! per pull and does no work ahead of the consumer. [`Bounded`] decorates
//! any source with a hard cap on how many elements may ever be pulled,
//! which is what keeps both API quota usage and cache reads proportional
//! to the requested feed size.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Video;

/// A lazy, ordered sequence of videos.
///
/// `next` either produces the next element, signals exhaustion with `None`,
/// or yields an error. An error terminates the sequence: implementations
/// return `None` on every pull after yielding `Err`. Implementations must
/// not read ahead of the consumer; a caller that stops pulling stops all
/// upstream I/O.
#[async_trait]
pub trait VideoSource: Send {
    async fn next(&mut self) -> Option<Result<Video>>;
}

#[async_trait]
impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    async fn next(&mut self) -> Option<Result<Video>> {
        (**self).next().await
    }
}

/// Caps consumption of an inner source at a fixed number of elements.
///
/// Once the cap is reached the inner source is never polled again, so a
/// wrapped paginator issues no further page requests and a wrapped cache
/// walk reads no further rows. A cap of zero never touches the inner
/// source at all.
pub struct Bounded<S> {
    inner: S,
    remaining: usize,
}

impl<S: VideoSource> Bounded<S> {
    pub fn new(limit: usize, inner: S) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

#[async_trait]
impl<S: VideoSource> VideoSource for Bounded<S> {
    async fn next(&mut self) -> Option<Result<Video>> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.inner.next().await?;
        self.remaining -= 1;
        Some(item)
    }
}
