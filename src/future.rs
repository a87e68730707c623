use crate::body::CompressionBody;
use crate::codec::Codec;
use crate::encoder::Encoder;
use crate::headers::HeaderView;
use crate::negotiate::{Negotiator, media_type};
use bytes::{Buf, Bytes};
use http::response::Parts;
use http::{HeaderMap, HeaderValue, Response, header};
use http_body::{Body, Frame};
use pin_project_lite::pin_project;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

pin_project! {
    /// Future for compression service responses.
    ///
    /// Resolves once the compression decision is made, which for eligible
    /// responses means after the first body frame has been read.
    pub struct ResponseFuture<F, B> {
        #[pin]
        kind: Kind<F, B>,
    }
}

pin_project! {
    #[project = KindProj]
    enum Kind<F, B> {
        AwaitingStart {
            #[pin]
            inner: F,
            codec: Option<Codec>,
            negotiator: Arc<Negotiator>,
        },
        AwaitingFirstBody {
            pending: Option<PendingStart<B>>,
        },
    }
}

impl<F, B> ResponseFuture<F, B> {
    pub(crate) fn new(inner: F, codec: Option<Codec>, negotiator: Arc<Negotiator>) -> Self {
        Self {
            kind: Kind::AwaitingStart {
                inner,
                codec,
                negotiator,
            },
        }
    }
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Output = Result<Response<CompressionBody<B>>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            let mut kind = self.as_mut().project().kind;
            match kind.as_mut().project() {
                KindProj::AwaitingStart {
                    inner,
                    codec,
                    negotiator,
                } => {
                    let response = ready!(inner.poll(cx))?;
                    match start(response, *codec, negotiator) {
                        Start::Decided(response) => return Poll::Ready(Ok(response)),
                        Start::Deferred(pending) => kind.set(Kind::AwaitingFirstBody {
                            pending: Some(pending),
                        }),
                    }
                }
                KindProj::AwaitingFirstBody { pending } => {
                    let Some(mut held) = pending.take() else {
                        panic!("ResponseFuture polled after completion");
                    };
                    match held.body.as_mut().poll_frame(cx) {
                        Poll::Pending => {
                            *pending = Some(held);
                            return Poll::Pending;
                        }
                        Poll::Ready(first) => return Poll::Ready(Ok(held.commit(first))),
                    }
                }
            }
        }
    }
}

enum Start<B> {
    Decided(Response<CompressionBody<B>>),
    Deferred(PendingStart<B>),
}

/// Response head held back until the first body frame arrives.
struct PendingStart<B> {
    parts: Parts,
    body: Pin<Box<B>>,
    codec: Codec,
    negotiator: Arc<Negotiator>,
    media_type: String,
    declared_length: Option<usize>,
    flush: bool,
}

/// Rules out what can be decided from the response head alone.
fn start<B: Body>(
    response: Response<B>,
    codec: Option<Codec>,
    negotiator: &Arc<Negotiator>,
) -> Start<B> {
    let (mut parts, body) = response.into_parts();

    let Some(codec) = codec else {
        return passthrough(parts, body);
    };
    if body.is_end_stream() {
        return passthrough(parts, body);
    }

    let view = HeaderView::new(&mut parts.headers);
    if has_content_encoding(&view) {
        tracing::trace!("response already encoded, skipping compression");
        return passthrough(parts, body);
    }
    if view.contains(header::CONTENT_RANGE) {
        tracing::trace!("range response, skipping compression");
        return passthrough(parts, body);
    }

    let media_type = view
        .get(header::CONTENT_TYPE)
        .map(media_type)
        .unwrap_or_default()
        .to_owned();
    let declared_length = declared_length(&view);
    let flush = wants_flush(&view, &media_type);

    // A declared length is final; without one only the media type is known yet.
    if !negotiator.should_compress(
        Some(codec),
        &media_type,
        declared_length,
        declared_length.is_none(),
    ) {
        return passthrough(parts, body);
    }

    Start::Deferred(PendingStart {
        parts,
        body: Box::pin(body),
        codec,
        negotiator: Arc::clone(negotiator),
        media_type,
        declared_length,
        flush,
    })
}

fn passthrough<B>(parts: Parts, body: B) -> Start<B> {
    Start::Decided(Response::from_parts(parts, CompressionBody::passthrough(body)))
}

impl<B> PendingStart<B>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    /// Makes the compression decision from the first frame and releases the head.
    fn commit(
        mut self,
        first: Option<Result<Frame<B::Data>, B::Error>>,
    ) -> Response<CompressionBody<B>> {
        let frame = match first {
            None => return self.identity(None, true),
            Some(Err(e)) => {
                tracing::debug!("response body failed before compression decision");
                return self.identity(Some(Err(io::Error::other(e.into()))), true);
            }
            Some(Ok(frame)) => frame,
        };

        let mut data = match frame.into_data() {
            Ok(data) => data,
            Err(frame) => {
                let frame = frame.map_data(|mut d| d.copy_to_bytes(d.remaining()));
                return self.identity(Some(Ok(frame)), false);
            }
        };
        let chunk = data.copy_to_bytes(data.remaining());
        let more = !self.body.is_end_stream();
        let streamed = more && self.declared_length.is_none();
        let length = self.declared_length.or((!more).then_some(chunk.len()));

        if !self
            .negotiator
            .should_compress(Some(self.codec), &self.media_type, length, streamed)
        {
            return self.identity(Some(Ok(Frame::data(chunk))), !more);
        }

        let mut encoder = match self.codec.encoder(&self.media_type) {
            Ok(encoder) => encoder.with_flush(self.flush),
            Err(e) => {
                tracing::warn!(encoding = %self.codec, error = %e, "failed to create encoder");
                return self.identity(Some(Ok(Frame::data(chunk))), !more);
            }
        };
        let encoded = match encoder.feed(&chunk, !more) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(encoding = %self.codec, error = %e, "failed to encode first chunk");
                return self.identity(Some(Ok(Frame::data(chunk))), !more);
            }
        };

        tracing::debug!(encoding = %self.codec, streamed = more, "compressing response");
        rewrite_headers(&mut self.parts.headers, &encoder, more);

        let first = Some(Ok(Frame::data(encoded)));
        Response::from_parts(
            self.parts,
            CompressionBody::encoded(self.body, encoder, first, !more),
        )
    }

    /// Releases the head untouched, replaying `first` ahead of the rest of the body.
    fn identity(
        self,
        first: Option<Result<Frame<Bytes>, io::Error>>,
        done: bool,
    ) -> Response<CompressionBody<B>> {
        let mut encoder = Encoder::identity();
        if done {
            encoder.finish_identity();
        }
        Response::from_parts(
            self.parts,
            CompressionBody::encoded(self.body, encoder, first, done),
        )
    }
}

/// Rewrites the response head for a compressed body.
fn rewrite_headers(headers: &mut HeaderMap, encoder: &Encoder, streamed: bool) {
    let Some(codec) = encoder.codec() else {
        return;
    };
    let mut view = HeaderView::new(headers);
    view.set(
        header::CONTENT_ENCODING,
        HeaderValue::from_static(codec.content_encoding()),
    );

    // Ranges of the uncompressed representation no longer apply.
    view.delete(header::ACCEPT_RANGES);

    if let Err(e) = view.append_vary("accept-encoding") {
        tracing::warn!(error = %e, "failed to update vary header");
    }

    if streamed {
        view.delete(header::CONTENT_LENGTH);
    } else {
        view.set(
            header::CONTENT_LENGTH,
            HeaderValue::from(encoder.content_length()),
        );
    }
}

/// Checks for a Content-Encoding other than `identity`.
fn has_content_encoding(headers: &HeaderView<'_>) -> bool {
    headers
        .get_all(header::CONTENT_ENCODING)
        .any(|v| v.map_or(true, |v| !v.trim().eq_ignore_ascii_case("identity")))
}

fn declared_length(headers: &HeaderView<'_>) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.trim().parse::<usize>().ok())
}

/// Checks if the response asks for every chunk to be flushed (e.g., streaming).
fn wants_flush(headers: &HeaderView<'_>, media_type: &str) -> bool {
    let unbuffered = headers
        .get("x-accel-buffering")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("no"));

    let media_type = media_type.to_ascii_lowercase();
    unbuffered
        || media_type == "text/event-stream"
        || media_type.starts_with("application/grpc-web")
}
