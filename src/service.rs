use crate::accept::AcceptEncoding;
use crate::body::CompressionBody;
use crate::future::ResponseFuture;
use crate::headers::HeaderView;
use crate::negotiate::Negotiator;
use http::{Request, Response};
use http_body::Body;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that compresses HTTP response bodies.
#[derive(Debug, Clone)]
pub struct CompressionService<S> {
    inner: S,
    negotiator: Arc<Negotiator>,
}

impl<S> CompressionService<S> {
    /// Creates a new compression service with the default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_negotiator(inner, Arc::new(Negotiator::new()))
    }

    pub(crate) fn with_negotiator(inner: S, negotiator: Arc<Negotiator>) -> Self {
        Self { inner, negotiator }
    }

    /// Returns the negotiation settings in use.
    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CompressionService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Body,
    ResBody::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<CompressionBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let accepted = AcceptEncoding::from_headers(&HeaderView::new(req.headers_mut()));
        let codec = self.negotiator.select_codec(&accepted);
        if codec.is_none() {
            tracing::trace!("no acceptable encoding for request");
        }

        let inner = self.inner.call(req);

        ResponseFuture::new(inner, codec, Arc::clone(&self.negotiator))
    }
}
