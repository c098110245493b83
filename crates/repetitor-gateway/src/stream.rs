//! Delta stream over a framed byte stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;

use crate::{Error, EventDecoder, Frame, Result};

/// Lifecycle of a [`DeltaStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Reading from the underlying byte stream.
    Streaming,
    /// Ended by the sentinel or a clean close.
    Done,
    /// Ended by an error event, a transport error or a timeout.
    Failed,
}

pin_project! {
    /// Stream of assistant text deltas decoded from an event stream.
    ///
    /// Yields every delta in arrival order. A failure is yielded once, after
    /// the deltas decoded before it, and ends the stream. Once the stream has
    /// ended the underlying byte stream is no longer polled.
    pub struct DeltaStream<S> {
        #[pin]
        inner: S,
        decoder: EventDecoder,
        queue: VecDeque<String>,
        failure: Option<Error>,
        state: StreamState,
    }
}

impl<S> DeltaStream<S> {
    /// Wraps a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: EventDecoder::new(),
            queue: VecDeque::new(),
            failure: None,
            state: StreamState::Streaming,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }
}

impl<S> std::fmt::Debug for DeltaStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaStream")
            .field("state", &self.state)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl<S> Stream for DeltaStream<S>
where
    S: Stream<Item = Result<Bytes>>,
{
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(delta) = this.queue.pop_front() {
                return Poll::Ready(Some(Ok(delta)));
            }

            if let Some(error) = this.failure.take() {
                return Poll::Ready(Some(Err(error)));
            }

            if *this.state != StreamState::Streaming {
                return Poll::Ready(None);
            }

            let frames = match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.decoder.decode(&chunk),
                Some(Err(error)) => {
                    *this.state = StreamState::Failed;
                    *this.failure = Some(error);
                    continue;
                }
                None => this.decoder.finish(),
            };

            for frame in frames {
                match frame {
                    Frame::Delta(delta) => this.queue.push_back(delta),
                    Frame::Done => {
                        *this.state = StreamState::Done;
                        break;
                    }
                    Frame::Error(message) => {
                        *this.state = StreamState::Failed;
                        *this.failure = Some(Error::Stream(message));
                        break;
                    }
                }
            }

            if this.decoder.is_closed() && *this.state == StreamState::Streaming {
                *this.state = StreamState::Done;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use futures::stream;

    use super::*;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes>> + use<> {
        let items: Vec<Result<Bytes>> = parts
            .iter()
            .map(|part| Ok(Bytes::copy_from_slice(part.as_bytes())))
            .collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn yields_deltas_until_done() -> anyhow::Result<()> {
        let inner = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Пер\"}}]}\n\ndata: {\"choi",
            "ces\":[{\"delta\":{\"content\":\"вый\"}}]}\n\ndata: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lost\"}}]}\n",
        ]);
        let mut stream = DeltaStream::new(inner);

        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            text.push_str(&delta?);
        }

        assert_eq!(text, "Первый");
        assert_eq!(stream.state(), StreamState::Done);
        Ok(())
    }

    #[tokio::test]
    async fn clean_close_without_sentinel_is_done() -> anyhow::Result<()> {
        let inner = chunks(&["data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}"]);
        let mut stream = DeltaStream::new(inner);

        assert_eq!(stream.next().await.transpose()?, Some("a".to_owned()));
        assert!(stream.next().await.is_none());
        assert_eq!(stream.state(), StreamState::Done);
        Ok(())
    }

    #[tokio::test]
    async fn error_event_after_deltas() {
        let inner = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: {\"error\":\"overloaded\"}\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        ]);
        let mut stream = DeltaStream::new(inner);

        assert!(matches!(stream.next().await, Some(Ok(ref d)) if d == "a"));
        assert!(matches!(stream.next().await, Some(Err(Error::Stream(ref m))) if m == "overloaded"));
        assert!(stream.next().await.is_none());
        assert_eq!(stream.state(), StreamState::Failed);
    }

    #[tokio::test]
    async fn transport_error_is_terminal() {
        let items: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            )),
            Err(Error::Timeout(std::time::Duration::from_secs(1))),
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
            )),
        ];
        let mut stream = DeltaStream::new(stream::iter(items));

        assert!(matches!(stream.next().await, Some(Ok(_))));
        assert!(matches!(stream.next().await, Some(Err(Error::Timeout(_)))));
        assert!(stream.next().await.is_none());
    }
}
