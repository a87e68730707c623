//! Media types eligible for compression.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

/// Compressible media types, as flagged by the mime-db project.
pub const DEFAULT_COMPRESSIBLE_TYPES: &[&str] = &[
    "application/atom+xml",
    "application/calendar+json",
    "application/calendar+xml",
    "application/cbor",
    "application/ccxml+xml",
    "application/cdmi-capability",
    "application/cdmi-container",
    "application/cdmi-domain",
    "application/cdmi-object",
    "application/cdmi-queue",
    "application/csvm+json",
    "application/dart",
    "application/davmount+xml",
    "application/dicom",
    "application/dssc+xml",
    "application/ecmascript",
    "application/emma+xml",
    "application/epp+xml",
    "application/fhir+json",
    "application/fhir+xml",
    "application/geo+json",
    "application/gml+xml",
    "application/gpx+xml",
    "application/graphql+json",
    "application/hal+json",
    "application/hal+xml",
    "application/javascript",
    "application/jf2feed+json",
    "application/jrd+json",
    "application/json",
    "application/json-patch+json",
    "application/jsonml+json",
    "application/ld+json",
    "application/lost+xml",
    "application/mads+xml",
    "application/manifest+json",
    "application/marcxml+xml",
    "application/mathml+xml",
    "application/merge-patch+json",
    "application/metalink+xml",
    "application/metalink4+xml",
    "application/mets+xml",
    "application/mods+xml",
    "application/msword",
    "application/ogg",
    "application/omdoc+xml",
    "application/pdf",
    "application/pls+xml",
    "application/postscript",
    "application/problem+json",
    "application/problem+xml",
    "application/raml+yaml",
    "application/rdf+xml",
    "application/reginfo+xml",
    "application/rls-services+xml",
    "application/rsd+xml",
    "application/rss+xml",
    "application/rtf",
    "application/sbml+xml",
    "application/scim+json",
    "application/shf+xml",
    "application/smil+xml",
    "application/soap+xml",
    "application/sparql-results+xml",
    "application/srgs+xml",
    "application/ssml+xml",
    "application/tar",
    "application/toml",
    "application/ttml+xml",
    "application/vnd.api+json",
    "application/vnd.google-earth.kml+xml",
    "application/vnd.mozilla.xul+xml",
    "application/vnd.ms-excel",
    "application/vnd.ms-fontobject",
    "application/vnd.ms-opentype",
    "application/vnd.ms-powerpoint",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.visio",
    "application/wasm",
    "application/wsdl+xml",
    "application/x-bash",
    "application/x-httpd-php",
    "application/x-javascript",
    "application/x-latex",
    "application/x-mpegurl",
    "application/x-perl",
    "application/x-sh",
    "application/x-tar",
    "application/x-tex",
    "application/x-virtualbox-vdi",
    "application/x-web-app-manifest+json",
    "application/x-www-form-urlencoded",
    "application/xhtml+xml",
    "application/xml",
    "application/xml-dtd",
    "application/xslt+xml",
    "application/yaml",
    "font/otf",
    "font/ttf",
    "image/bmp",
    "image/svg+xml",
    "image/vnd.adobe.photoshop",
    "image/vnd.microsoft.icon",
    "image/x-icon",
    "image/x-ms-bmp",
    "message/rfc822",
    "model/gltf+json",
    "model/obj",
    "model/stl",
    "model/x3d+xml",
    "text/cache-manifest",
    "text/calendar",
    "text/css",
    "text/csv",
    "text/event-stream",
    "text/html",
    "text/javascript",
    "text/markdown",
    "text/mathml",
    "text/n3",
    "text/plain",
    "text/richtext",
    "text/rtf",
    "text/tab-separated-values",
    "text/troff",
    "text/turtle",
    "text/uri-list",
    "text/vcard",
    "text/vnd.wap.wml",
    "text/vtt",
    "text/x-component",
    "text/x-java-source",
    "text/x-markdown",
    "text/x-python",
    "text/x-script",
    "text/x-vcard",
    "text/xml",
    "text/yaml",
];

static DEFAULT_MEDIA_TYPES: LazyLock<MediaTypes> =
    LazyLock::new(|| MediaTypes::new(DEFAULT_COMPRESSIBLE_TYPES.iter().copied()));

/// Set of media types eligible for compression.
///
/// Membership is exact and case-insensitive; parameters such as `charset`
/// must be stripped before lookup. Clones share storage.
#[derive(Debug, Clone)]
pub struct MediaTypes(Arc<HashSet<String>>);

impl MediaTypes {
    /// Builds a set from media type strings.
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(Arc::new(
            types
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .collect(),
        ))
    }

    /// Adds one media type.
    pub fn insert(&mut self, media_type: &str) {
        Arc::make_mut(&mut self.0).insert(media_type.trim().to_ascii_lowercase());
    }

    /// Returns whether `media_type` is in the set.
    pub fn contains(&self, media_type: &str) -> bool {
        if media_type.bytes().any(|b| b.is_ascii_uppercase()) {
            self.0.contains(&media_type.to_ascii_lowercase())
        } else {
            self.0.contains(media_type)
        }
    }

    /// Number of media types in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MediaTypes {
    fn default() -> Self {
        DEFAULT_MEDIA_TYPES.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let types = MediaTypes::default();
        assert_eq!(types.len(), DEFAULT_COMPRESSIBLE_TYPES.len());
        assert!(types.contains("text/plain"));
        assert!(types.contains("text/html"));
        assert!(types.contains("application/json"));
        assert!(types.contains("image/svg+xml"));
        assert!(!types.contains("image/png"));
        assert!(!types.contains("application/octet-stream"));
        assert!(!types.contains("application/zip"));
    }

    #[test]
    fn test_contains_case_insensitive() {
        let types = MediaTypes::new(["Text/HTML"]);
        assert!(types.contains("text/html"));
        assert!(types.contains("TEXT/html"));
    }

    #[test]
    fn test_insert_does_not_touch_shared_default() {
        let mut types = MediaTypes::default();
        types.insert("application/x-custom");
        assert!(types.contains("application/x-custom"));
        assert!(!MediaTypes::default().contains("application/x-custom"));
    }
}
