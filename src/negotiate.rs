use crate::accept::AcceptEncoding;
use crate::codec::Codec;
use crate::mime::MediaTypes;

/// Default minimum body size for compression.
pub const DEFAULT_MIN_SIZE: usize = 500;

/// Chooses a codec for a request and decides whether a response gets it.
///
/// Holds the server's codec preference, the size threshold and the set of
/// compressible media types. Read-only once built and shared by every
/// request.
#[derive(Debug, Clone)]
pub struct Negotiator {
    codecs: Vec<Codec>,
    min_size: usize,
    media_types: MediaTypes,
}

impl Negotiator {
    /// Creates a negotiator with every available codec and the default table.
    pub fn new() -> Self {
        Self {
            codecs: Codec::available(),
            min_size: DEFAULT_MIN_SIZE,
            media_types: MediaTypes::default(),
        }
    }

    /// Server preference order of the codecs in use.
    pub fn codecs(&self) -> &[Codec] {
        &self.codecs
    }

    /// Minimum size of a response with a known length.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Media types eligible for compression.
    pub fn media_types(&self) -> &MediaTypes {
        &self.media_types
    }

    pub(crate) fn set_codecs<I>(&mut self, codecs: I)
    where
        I: IntoIterator<Item = Codec>,
    {
        self.codecs.clear();
        for codec in codecs {
            if !codec.is_available() {
                tracing::debug!(
                    encoding = codec.content_encoding(),
                    "codec not available, skipping"
                );
                continue;
            }
            if !self.codecs.contains(&codec) {
                self.codecs.push(codec);
            }
        }
    }

    pub(crate) fn set_min_size(&mut self, min_size: usize) {
        self.min_size = min_size;
    }

    pub(crate) fn media_types_mut(&mut self) -> &mut MediaTypes {
        &mut self.media_types
    }

    /// Picks the first codec, in server preference order, that the client accepts.
    ///
    /// Client quality values only matter as far as `q=0` rules a codec out.
    /// `None` means this request gets no compression at all.
    pub fn select_codec(&self, accepted: &AcceptEncoding) -> Option<Codec> {
        self.codecs
            .iter()
            .copied()
            .find(|codec| accepted.accepts(codec.content_encoding()))
    }

    /// Decides whether a response is compressed with the selected codec.
    ///
    /// `length` is the declared or actual body length when known. Streamed
    /// responses of unknown length skip the size check.
    pub fn should_compress(
        &self,
        codec: Option<Codec>,
        media_type: &str,
        length: Option<usize>,
        streamed: bool,
    ) -> bool {
        if codec.is_none() {
            return false;
        }
        if !self.media_types.contains(media_type) {
            tracing::trace!(media_type, "media type not compressible");
            return false;
        }
        if length == Some(0) {
            return false;
        }
        if !streamed && length.is_some_and(|len| len < self.min_size) {
            tracing::trace!(?length, min_size = self.min_size, "response below minimum size");
            return false;
        }
        true
    }
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the media type of a `content-type` value, without parameters.
pub fn media_type(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(media_type, _)| media_type)
        .trim()
}
