//! Streaming HTTP response compression middleware for Tower.
//!
//! This crate provides a Tower layer that negotiates a content encoding from
//! the client's `Accept-Encoding` header and compresses response bodies with
//! Brotli, Zstd, Gzip or Deflate while they stream.
//!
//! # Example
//!
//! ```ignore
//! use http_stream_compression::CompressionLayer;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(CompressionLayer::new().min_size(1024))
//!     .service(my_service);
//! ```
//!
//! # Negotiation
//!
//! The server's preference order wins (`br`, `zstd`, `gzip`, `deflate` by
//! default); the client's quality values only rule codecs out (`q=0`).
//!
//! # Compression Rules
//!
//! The middleware will **not** compress responses when:
//! - No supported `Accept-Encoding` is present in the request
//! - `Content-Encoding` is already set to something other than `identity`
//! - `Content-Range` header is present (range responses)
//! - The media type is not in the compressible set
//! - The body is empty
//! - The declared or actual length is below the minimum size (default: 500 bytes)
//!
//! Streamed responses of unknown length skip the size check. The response
//! head is held back until the first body frame arrives, so the decision
//! can see whether more frames follow.
//!
//! The middleware will **always flush** after each chunk when:
//! - `X-Accel-Buffering: no` header is present
//! - `Content-Type` is `text/event-stream`
//! - `Content-Type` starts with `application/grpc-web`
//!
//! # Response Modifications
//!
//! When compression is applied:
//! - `Content-Encoding` header is set to the codec used
//! - `Content-Length` is set to the compressed size for single-frame bodies
//!   and removed for streamed ones
//! - `Accept-Ranges` header is removed
//! - `Vary` header includes `Accept-Encoding`

#![deny(missing_docs)]

mod accept;
mod body;
mod codec;
mod encoder;
mod error;
mod future;
mod headers;
mod layer;
mod mime;
mod negotiate;
mod service;

pub use accept::AcceptEncoding;
pub use body::CompressionBody;
pub use codec::{Codec, ContentMode};
pub use encoder::Encoder;
pub use error::CompressionError;
pub use future::ResponseFuture;
pub use headers::HeaderView;
pub use layer::{CompressionLayer, DEFAULT_MIN_SIZE};
pub use mime::{DEFAULT_COMPRESSIBLE_TYPES, MediaTypes};
pub use negotiate::{Negotiator, media_type};
pub use service::CompressionService;
