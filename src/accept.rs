use crate::codec::Codec;
use crate::headers::HeaderView;
use http::header;
use std::collections::HashMap;

/// Encodings a client listed in `Accept-Encoding`, with their quality values.
///
/// Tokens are stored lowercased. A quality of `None` means the client gave
/// no usable `q` parameter, which counts as full acceptance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptEncoding {
    encodings: HashMap<String, Option<f32>>,
}

impl AcceptEncoding {
    /// Parses an Accept-Encoding header value.
    ///
    /// The header value is expected to be comma-separated encodings with optional
    /// quality values (e.g., "gzip, br;q=1.0, zstd;q=0.8"). Parsing never fails:
    /// empty entries are skipped and the first entry for a token wins.
    pub fn parse(header: &str) -> Self {
        let mut encodings = HashMap::new();
        for part in header.split(',') {
            let (token, quality) = parse_encoding_with_quality(part);
            if token.is_empty() {
                continue;
            }
            let token = match Codec::from_token(token) {
                Some(codec) => codec.content_encoding().to_owned(),
                None => token.to_ascii_lowercase(),
            };
            encodings.entry(token).or_insert(quality);
        }
        Self { encodings }
    }

    /// Collects every `Accept-Encoding` line of a request.
    pub fn from_headers(headers: &HeaderView<'_>) -> Self {
        let joined = headers
            .get_all(header::ACCEPT_ENCODING)
            .filter_map(Result::ok)
            .collect::<Vec<_>>()
            .join(",");
        Self::parse(&joined)
    }

    /// Returns the quality listed for `token`: `None` if the token is absent,
    /// `Some(None)` if it is listed without a usable quality.
    pub fn quality(&self, token: &str) -> Option<Option<f32>> {
        self.encodings.get(&token.to_ascii_lowercase()).copied()
    }

    /// Returns whether the client accepts `token`.
    ///
    /// `q=0` marks a token as unacceptable. A token that is not listed is
    /// accepted only through a `*` entry with a non-zero quality.
    pub fn accepts(&self, token: &str) -> bool {
        match self.quality(token) {
            Some(quality) => is_acceptable(quality),
            None => self.quality("*").is_some_and(is_acceptable),
        }
    }

    /// Returns whether the header listed no encodings at all.
    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }
}

fn is_acceptable(quality: Option<f32>) -> bool {
    quality.is_none_or(|q| q > 0.0)
}

/// Parses an encoding entry like "gzip" or "br;q=0.8" into (encoding, quality).
fn parse_encoding_with_quality(s: &str) -> (&str, Option<f32>) {
    let mut parts = s.split(';');
    let encoding = parts.next().unwrap_or("").trim();

    let quality = parts
        .filter_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("q")
                .then(|| value.trim())
        })
        .next()
        .and_then(|q| q.parse::<f32>().ok())
        .filter(|q| (0.0..=1.0).contains(q));

    (encoding, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue};

    #[test]
    fn test_parse_simple() {
        let accepted = AcceptEncoding::parse("gzip, br");
        assert_eq!(accepted.quality("gzip"), Some(None));
        assert_eq!(accepted.quality("br"), Some(None));
        assert_eq!(accepted.quality("zstd"), None);
        assert!(accepted.accepts("gzip"));
        assert!(!accepted.accepts("zstd"));
    }

    #[test]
    fn test_parse_with_quality() {
        let accepted = AcceptEncoding::parse("gzip;q=1.0, br;q=0.5");
        assert_eq!(accepted.quality("gzip"), Some(Some(1.0)));
        assert_eq!(accepted.quality("br"), Some(Some(0.5)));
    }

    #[test]
    fn test_quality_zero_not_accepted() {
        let accepted = AcceptEncoding::parse("gzip;q=0, br;q=0.000");
        assert!(!accepted.accepts("gzip"));
        assert!(!accepted.accepts("br"));
    }

    #[test]
    fn test_malformed_quality_accepts() {
        let accepted = AcceptEncoding::parse("gzip;q=high, br;q=7, zstd;q=");
        assert_eq!(accepted.quality("gzip"), Some(None));
        assert_eq!(accepted.quality("br"), Some(None));
        assert_eq!(accepted.quality("zstd"), Some(None));
        assert!(accepted.accepts("gzip"));
        assert!(accepted.accepts("br"));
        assert!(accepted.accepts("zstd"));
    }

    #[test]
    fn test_quality_among_other_params() {
        let accepted = AcceptEncoding::parse("gzip;level=1;Q=0");
        assert!(!accepted.accepts("gzip"));
    }

    #[test]
    fn test_tokens_case_insensitive() {
        let accepted = AcceptEncoding::parse("GZip");
        assert!(accepted.accepts("gzip"));
        assert!(accepted.accepts("GZIP"));
    }

    #[test]
    fn test_aliases() {
        let accepted = AcceptEncoding::parse("x-gzip, brotli");
        assert!(accepted.accepts("gzip"));
        assert!(accepted.accepts("br"));
    }

    #[test]
    fn test_wildcard() {
        let accepted = AcceptEncoding::parse("*, gzip;q=0");
        assert!(accepted.accepts("br"));
        assert!(!accepted.accepts("gzip"));

        let accepted = AcceptEncoding::parse("*;q=0");
        assert!(!accepted.accepts("br"));
    }

    #[test]
    fn test_first_entry_wins() {
        let accepted = AcceptEncoding::parse("gzip;q=0, gzip");
        assert!(!accepted.accepts("gzip"));
    }

    #[test]
    fn test_empty_header() {
        assert!(AcceptEncoding::parse("").is_empty());
        assert!(AcceptEncoding::parse(" , ,").is_empty());
    }

    #[test]
    fn test_from_headers_merges_lines() {
        let mut headers = HeaderMap::new();
        headers.append(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.append(header::ACCEPT_ENCODING, HeaderValue::from_static("br;q=0.5"));
        let accepted = AcceptEncoding::from_headers(&HeaderView::new(&mut headers));
        assert!(accepted.accepts("gzip"));
        assert_eq!(accepted.quality("br"), Some(Some(0.5)));
    }

    #[test]
    fn test_from_headers_missing() {
        let mut headers = HeaderMap::new();
        assert!(AcceptEncoding::from_headers(&HeaderView::new(&mut headers)).is_empty());
    }
}
