use crate::encoder::Encoder;
use bytes::{Buf, Bytes};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

pin_project! {
    /// A response body that may be compressed.
    ///
    /// Responses ruled out before their body was touched pass straight
    /// through. Everything else runs through an [`Encoder`], which is the
    /// identity encoder when the decision went against compression.
    #[project = CompressionBodyProj]
    #[allow(missing_docs)]
    pub enum CompressionBody<B> {
        /// Body encoded frame by frame.
        Encoded {
            inner: Pin<Box<B>>,
            state: EncodedBody,
        },
        /// Body left untouched.
        Passthrough {
            #[pin]
            inner: B,
        },
    }
}

/// Encoder and replay state for a body whose first frame was already read.
pub(crate) struct EncodedBody {
    encoder: Encoder,
    first: Option<Result<Frame<Bytes>, io::Error>>,
    state: EncodeState,
    pending_trailers: Option<http::HeaderMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EncodeState {
    /// More frames are expected from the inner body.
    Streaming,
    /// The encoder is finished; buffered trailers go out next.
    Trailers,
    Done,
}

impl EncodedBody {
    #[cfg(test)]
    pub(crate) fn state(&self) -> EncodeState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    fn poll_encoded<B>(
        &mut self,
        cx: &mut Context<'_>,
        inner: &mut Pin<Box<B>>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if let Some(first) = self.first.take() {
            return Poll::Ready(Some(first));
        }

        loop {
            match self.state {
                EncodeState::Done => return Poll::Ready(None),

                EncodeState::Trailers => {
                    self.state = EncodeState::Done;
                    let trailers = self.pending_trailers.take();
                    return Poll::Ready(trailers.map(|t| Ok(Frame::trailers(t))));
                }

                EncodeState::Streaming => match ready!(inner.as_mut().poll_frame(cx)) {
                    None => {
                        // The body ended without flagging its last data frame.
                        self.state = EncodeState::Done;
                        return Poll::Ready(self.finish());
                    }
                    Some(Err(e)) => {
                        self.state = EncodeState::Done;
                        return Poll::Ready(Some(Err(io::Error::other(e.into()))));
                    }
                    Some(Ok(frame)) => match frame.into_data() {
                        Ok(mut data) => {
                            let chunk = data.copy_to_bytes(data.remaining());
                            let is_last = inner.is_end_stream();
                            if is_last {
                                self.state = EncodeState::Done;
                            }
                            return match self.encoder.feed_bytes(chunk, is_last) {
                                Ok(encoded) => Poll::Ready(Some(Ok(Frame::data(encoded)))),
                                Err(e) => {
                                    // A failed codec ends the body.
                                    self.state = EncodeState::Done;
                                    Poll::Ready(Some(Err(e.into())))
                                }
                            };
                        }
                        Err(frame) => {
                            if let Ok(trailers) = frame.into_trailers() {
                                self.pending_trailers = Some(trailers);
                                self.state = EncodeState::Trailers;
                                if let Some(result) = self.finish() {
                                    return Poll::Ready(Some(result));
                                }
                            }
                        }
                    },
                },
            }
        }
    }

    /// Finalizes the encoder, returning its remaining output if there is any.
    fn finish(&mut self) -> Option<Result<Frame<Bytes>, io::Error>> {
        if self.encoder.is_finished() {
            return None;
        }
        match self.encoder.feed(&[], true) {
            Ok(tail) if tail.is_empty() => None,
            Ok(tail) => Some(Ok(Frame::data(tail))),
            Err(e) => {
                self.state = EncodeState::Done;
                Some(Err(e.into()))
            }
        }
    }

    fn size_hint(&self, inner: SizeHint) -> SizeHint {
        let first_len = match &self.first {
            Some(Ok(frame)) => frame.data_ref().map_or(0, |d| d.len() as u64),
            _ => 0,
        };

        if self.state == EncodeState::Done {
            return SizeHint::with_exact(first_len);
        }
        if !self.encoder.is_identity() {
            return SizeHint::default();
        }

        let mut hint = SizeHint::new();
        if let Some(upper) = inner.upper() {
            hint.set_upper(upper + first_len);
        }
        hint.set_lower(inner.lower() + first_len);
        hint
    }
}

impl<B> CompressionBody<B> {
    /// Creates a passthrough body without compression.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }

    /// Creates a body that replays an already encoded first frame, then
    /// encodes the rest of `inner`.
    pub(crate) fn encoded(
        inner: Pin<Box<B>>,
        encoder: Encoder,
        first: Option<Result<Frame<Bytes>, io::Error>>,
        done: bool,
    ) -> Self {
        Self::Encoded {
            inner,
            state: EncodedBody {
                encoder,
                first,
                state: if done {
                    EncodeState::Done
                } else {
                    EncodeState::Streaming
                },
                pending_trailers: None,
            },
        }
    }

    /// Returns whether the body runs through a compressing encoder.
    pub fn is_compressed(&self) -> bool {
        match self {
            CompressionBody::Encoded { state, .. } => !state.encoder.is_identity(),
            CompressionBody::Passthrough { .. } => false,
        }
    }
}

impl<B> Body for CompressionBody<B>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            CompressionBodyProj::Passthrough { inner } => {
                match ready!(inner.poll_frame(cx)) {
                    None => Poll::Ready(None),
                    Some(Ok(frame)) => Poll::Ready(Some(Ok(
                        frame.map_data(|mut data| data.copy_to_bytes(data.remaining()))
                    ))),
                    Some(Err(e)) => Poll::Ready(Some(Err(io::Error::other(e.into())))),
                }
            }
            CompressionBodyProj::Encoded { inner, state } => state.poll_encoded(cx, inner),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            CompressionBody::Passthrough { inner } => inner.is_end_stream(),
            CompressionBody::Encoded { state, .. } => {
                state.first.is_none() && state.state == EncodeState::Done
            }
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            CompressionBody::Passthrough { inner } => inner.size_hint(),
            CompressionBody::Encoded { inner, state } => state.size_hint(inner.size_hint()),
        }
    }
}
