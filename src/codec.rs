use crate::encoder::Encoder;
use crate::error::CompressionError;

/// Supported compression codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Brotli compression.
    Brotli,
    /// Zstd compression.
    Zstd,
    /// Gzip compression.
    Gzip,
    /// Deflate compression (zlib framing).
    Deflate,
}

impl Codec {
    /// Every codec, in the default server preference order.
    pub const ALL: [Codec; 4] = [Codec::Brotli, Codec::Zstd, Codec::Gzip, Codec::Deflate];

    /// Returns the Content-Encoding header value for this codec.
    pub fn content_encoding(&self) -> &'static str {
        match self {
            Codec::Brotli => "br",
            Codec::Zstd => "zstd",
            Codec::Gzip => "gzip",
            Codec::Deflate => "deflate",
        }
    }

    /// Maps an Accept-Encoding token to a codec. Matching is case-insensitive.
    pub fn from_token(token: &str) -> Option<Codec> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("br") || token.eq_ignore_ascii_case("brotli") {
            Some(Codec::Brotli)
        } else if token.eq_ignore_ascii_case("zstd") {
            Some(Codec::Zstd)
        } else if token.eq_ignore_ascii_case("gzip") || token.eq_ignore_ascii_case("x-gzip") {
            Some(Codec::Gzip)
        } else if token.eq_ignore_ascii_case("deflate") {
            Some(Codec::Deflate)
        } else {
            None
        }
    }

    /// Returns whether the codec's feature is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            Codec::Brotli => cfg!(feature = "brotli"),
            Codec::Zstd => cfg!(feature = "zstd"),
            Codec::Gzip => cfg!(feature = "gzip"),
            Codec::Deflate => cfg!(feature = "deflate"),
        }
    }

    /// Returns the codecs available in this build, in default preference order.
    pub fn available() -> Vec<Codec> {
        Codec::ALL
            .into_iter()
            .filter(Codec::is_available)
            .collect()
    }

    /// Creates a fresh encoder for one response of the given media type.
    pub fn encoder(&self, media_type: &str) -> Result<Encoder, CompressionError> {
        Encoder::new(*self, media_type)
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.content_encoding())
    }
}

/// Content hint used by codecs that tune themselves to the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    /// Arbitrary binary data.
    Generic,
    /// UTF-8 text such as HTML, JSON or JavaScript.
    Text,
    /// WOFF 2.0 and other font data.
    Font,
}

impl ContentMode {
    /// Picks the mode for a media type (the `content-type` without parameters).
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = media_type.to_ascii_lowercase();
        if ["text", "javascript", "json", "xml"]
            .iter()
            .any(|hint| media_type.contains(hint))
        {
            ContentMode::Text
        } else if media_type.contains("font") {
            ContentMode::Font
        } else {
            ContentMode::Generic
        }
    }
}
