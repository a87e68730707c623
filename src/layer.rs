use crate::codec::Codec;
use crate::mime::MediaTypes;
use crate::negotiate::Negotiator;
use crate::service::CompressionService;
use std::sync::Arc;
use tower::Layer;

pub use crate::negotiate::DEFAULT_MIN_SIZE;

/// A Tower layer that compresses HTTP response bodies.
///
/// This layer wraps services and automatically compresses response bodies
/// based on the client's Accept-Encoding header. Every service it builds
/// shares one read-only copy of the configuration.
#[derive(Debug, Clone, Default)]
pub struct CompressionLayer {
    negotiator: Arc<Negotiator>,
}

impl CompressionLayer {
    /// Creates a new compression layer with default settings.
    ///
    /// The default minimum size for compression is 500 bytes, every codec
    /// compiled into the build is offered, and the built-in table of
    /// compressible media types is used.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum body size required for compression.
    ///
    /// Responses with a known length smaller than this value will not be
    /// compressed. Streamed responses of unknown length always qualify.
    pub fn min_size(mut self, size: usize) -> Self {
        Arc::make_mut(&mut self.negotiator).set_min_size(size);
        self
    }

    /// Replaces the set of compressible media types.
    pub fn compressible_types<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        *Arc::make_mut(&mut self.negotiator).media_types_mut() = MediaTypes::new(types);
        self
    }

    /// Adds one media type to the compressible set.
    pub fn add_compressible_type(mut self, media_type: &str) -> Self {
        Arc::make_mut(&mut self.negotiator)
            .media_types_mut()
            .insert(media_type);
        self
    }

    /// Sets the codecs on offer, in server preference order.
    ///
    /// Codecs whose Cargo feature is disabled are dropped.
    pub fn codecs<I>(mut self, codecs: I) -> Self
    where
        I: IntoIterator<Item = Codec>,
    {
        Arc::make_mut(&mut self.negotiator).set_codecs(codecs);
        self
    }

    /// Returns the negotiation settings this layer hands to its services.
    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }
}

impl<S> Layer<S> for CompressionLayer {
    type Service = CompressionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CompressionService::with_negotiator(inner, Arc::clone(&self.negotiator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let layer = CompressionLayer::new();
        assert_eq!(layer.negotiator().min_size(), DEFAULT_MIN_SIZE);
        assert_eq!(layer.negotiator().codecs(), Codec::available().as_slice());
        assert!(layer.negotiator().media_types().contains("text/html"));
    }

    #[test]
    fn test_builder() {
        let layer = CompressionLayer::new()
            .min_size(10)
            .compressible_types(["only_this_mime"])
            .add_compressible_type("text/x-extra");

        let negotiator = layer.negotiator();
        assert_eq!(negotiator.min_size(), 10);
        assert!(negotiator.media_types().contains("only_this_mime"));
        assert!(negotiator.media_types().contains("text/x-extra"));
        assert!(!negotiator.media_types().contains("text/html"));
    }

    #[test]
    #[cfg(all(feature = "gzip", feature = "deflate"))]
    fn test_codecs_order() {
        let layer = CompressionLayer::new().codecs([Codec::Deflate, Codec::Gzip]);
        assert_eq!(layer.negotiator().codecs(), &[Codec::Deflate, Codec::Gzip]);
    }

    #[test]
    fn test_services_share_configuration() {
        let layer = CompressionLayer::new().min_size(42);
        let a = layer.layer(());
        let b = layer.layer(());
        assert_eq!(a.negotiator().min_size(), 42);
        assert!(std::ptr::eq(a.negotiator(), b.negotiator()));
    }

    #[test]
    fn test_builder_does_not_affect_clones() {
        let base = CompressionLayer::new();
        let tuned = base.clone().min_size(1);
        assert_eq!(base.negotiator().min_size(), DEFAULT_MIN_SIZE);
        assert_eq!(tuned.negotiator().min_size(), 1);
    }
}
