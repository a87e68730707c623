//! Incremental encoders driven one body fragment at a time.
//!
//! Chunk boundaries never show up in the output: feeding a body through
//! [`Encoder::feed`] in any number of pieces, with `is_last` set only on the
//! final piece, produces exactly the bytes of a single-call compression of
//! the whole body. Sync flushing (see [`Encoder::with_flush`]) trades that
//! guarantee for lower latency.

use crate::codec::Codec;
use crate::error::CompressionError;
use bytes::{Bytes, BytesMut};
use compression_codecs::EncodeV2;
use compression_core::util::{PartialBuffer, WriteBuffer};
use std::fmt;
use std::io;

#[cfg(feature = "brotli")]
use crate::codec::ContentMode;
#[cfg(any(feature = "gzip", feature = "deflate"))]
use compression_core::Level;

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024; // 8KB output buffer

/// Brotli quality used for on-the-fly compression.
#[cfg(feature = "brotli")]
const BROTLI_QUALITY: i32 = 11;

/// zstd compression level.
#[cfg(feature = "zstd")]
const ZSTD_LEVEL: i32 = 3;

enum Engine {
    Identity,
    Codec {
        encoder: Box<dyn EncodeV2 + Send>,
        buffer: Vec<u8>,
    },
    #[cfg(feature = "brotli")]
    Brotli(Option<Box<brotli::CompressorWriter<Vec<u8>>>>),
}

/// Per-response encoder with a uniform `feed` interface.
///
/// The identity encoder passes bytes through unchanged so compressed and
/// uncompressed responses share one code path.
pub struct Encoder {
    codec: Option<Codec>,
    engine: Engine,
    flush: bool,
    finished: bool,
    content_length: u64,
}

impl Encoder {
    /// Creates an encoder for `codec`, tuned for `media_type` where the codec supports it.
    #[cfg_attr(not(feature = "brotli"), allow(unused_variables))]
    pub fn new(codec: Codec, media_type: &str) -> Result<Self, CompressionError> {
        let engine = match codec {
            #[cfg(feature = "brotli")]
            Codec::Brotli => {
                let params = brotli::enc::BrotliEncoderParams {
                    quality: BROTLI_QUALITY,
                    mode: brotli_mode(ContentMode::from_media_type(media_type)),
                    ..Default::default()
                };
                Engine::Brotli(Some(Box::new(brotli::CompressorWriter::with_params(
                    Vec::new(),
                    OUTPUT_BUFFER_SIZE,
                    &params,
                ))))
            }
            #[cfg(feature = "zstd")]
            Codec::Zstd => Engine::codec(Box::new(
                compression_codecs::zstd::ZstdEncoder::new(ZSTD_LEVEL),
            )),
            #[cfg(feature = "gzip")]
            Codec::Gzip => Engine::codec(Box::new(compression_codecs::gzip::GzipEncoder::new(
                Level::Default.into(),
            ))),
            #[cfg(feature = "deflate")]
            Codec::Deflate => Engine::codec(Box::new(compression_codecs::zlib::ZlibEncoder::new(
                Level::Default.into(),
            ))),
            #[cfg(not(all(
                feature = "brotli",
                feature = "zstd",
                feature = "gzip",
                feature = "deflate"
            )))]
            other => return Err(CompressionError::Unavailable(other.content_encoding())),
        };

        Ok(Self {
            codec: Some(codec),
            engine,
            flush: false,
            finished: false,
            content_length: 0,
        })
    }

    /// Creates an encoder that leaves the body untouched.
    pub fn identity() -> Self {
        Self {
            codec: None,
            engine: Engine::Identity,
            flush: false,
            finished: false,
            content_length: 0,
        }
    }

    /// Sync-flushes the codec after every fragment.
    ///
    /// Each output fragment then decodes up to the end of its input, at the
    /// cost of a slightly larger stream that no longer matches one-shot output.
    pub fn with_flush(mut self, flush: bool) -> Self {
        self.flush = flush;
        self
    }

    /// Returns the codec, or `None` for the identity encoder.
    pub fn codec(&self) -> Option<Codec> {
        self.codec
    }

    /// Returns whether this is the identity encoder.
    pub fn is_identity(&self) -> bool {
        self.codec.is_none()
    }

    /// Returns whether the final chunk has been fed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Total number of bytes emitted so far.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Encodes one chunk, finalizing the stream when `is_last` is set.
    ///
    /// The returned bytes may be empty while the codec buffers input.
    /// Feeding again after the last chunk is an error.
    pub fn feed(&mut self, chunk: &[u8], is_last: bool) -> Result<Bytes, CompressionError> {
        if self.finished {
            return Err(CompressionError::Finished);
        }

        let mut output = BytesMut::new();
        match &mut self.engine {
            Engine::Identity => output.extend_from_slice(chunk),
            Engine::Codec { encoder, buffer } => {
                encode_chunk(encoder.as_mut(), buffer, chunk, &mut output)?;
                if is_last {
                    drain(buffer, &mut output, |out| encoder.finish(out))?;
                } else if self.flush {
                    drain(buffer, &mut output, |out| encoder.flush(out))?;
                }
            }
            #[cfg(feature = "brotli")]
            Engine::Brotli(slot) => {
                use std::io::Write;

                let Some(writer) = slot.as_mut() else {
                    return Err(CompressionError::Finished);
                };
                writer.write_all(chunk)?;
                if is_last {
                    if let Some(writer) = slot.take() {
                        output.extend_from_slice(&(*writer).into_inner());
                    }
                } else {
                    if self.flush {
                        writer.flush()?;
                    }
                    output.extend_from_slice(&std::mem::take(writer.get_mut()));
                }
            }
        }

        self.finished = is_last;
        self.content_length += output.len() as u64;
        Ok(output.freeze())
    }

    /// Like [`Encoder::feed`], but hands identity chunks back without copying.
    pub fn feed_bytes(&mut self, chunk: Bytes, is_last: bool) -> Result<Bytes, CompressionError> {
        if !matches!(self.engine, Engine::Identity) {
            return self.feed(&chunk, is_last);
        }
        if self.finished {
            return Err(CompressionError::Finished);
        }
        self.finished = is_last;
        self.content_length += chunk.len() as u64;
        Ok(chunk)
    }

    /// Closes an identity encoder whose body is already complete.
    pub(crate) fn finish_identity(&mut self) {
        if self.is_identity() {
            self.finished = true;
        }
    }

    /// Compresses a whole body in one call.
    pub fn compress_all(
        codec: Codec,
        media_type: &str,
        body: &[u8],
    ) -> Result<Bytes, CompressionError> {
        Encoder::new(codec, media_type)?.feed(body, true)
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("codec", &self.codec)
            .field("flush", &self.flush)
            .field("finished", &self.finished)
            .field("content_length", &self.content_length)
            .finish()
    }
}

impl Engine {
    #[allow(dead_code)]
    fn codec(encoder: Box<dyn EncodeV2 + Send>) -> Self {
        Engine::Codec {
            encoder,
            buffer: vec![0u8; OUTPUT_BUFFER_SIZE],
        }
    }
}

#[cfg(feature = "brotli")]
fn brotli_mode(mode: ContentMode) -> brotli::enc::backward_references::BrotliEncoderMode {
    use brotli::enc::backward_references::BrotliEncoderMode;

    match mode {
        ContentMode::Generic => BrotliEncoderMode::BROTLI_MODE_GENERIC,
        ContentMode::Text => BrotliEncoderMode::BROTLI_MODE_TEXT,
        ContentMode::Font => BrotliEncoderMode::BROTLI_MODE_FONT,
    }
}

/// Pushes all of `input` through the encoder, collecting whatever it emits.
fn encode_chunk(
    encoder: &mut (dyn EncodeV2 + Send),
    buffer: &mut [u8],
    input: &[u8],
    output: &mut BytesMut,
) -> io::Result<()> {
    let mut input_buf = PartialBuffer::new(input);

    while input_buf.written_len() < input.len() {
        let consumed = input_buf.written_len();
        let mut out = WriteBuffer::new_initialized(&mut *buffer);

        encoder.encode(&mut input_buf, &mut out)?;

        let written = out.written_len();
        output.extend_from_slice(&buffer[..written]);

        if written == 0 && input_buf.written_len() == consumed {
            return Err(io::Error::other("encoder made no progress"));
        }
    }

    Ok(())
}

/// Repeats a flush or finish step until the encoder reports completion.
fn drain<F>(buffer: &mut [u8], output: &mut BytesMut, mut step: F) -> io::Result<()>
where
    F: FnMut(&mut WriteBuffer<'_>) -> io::Result<bool>,
{
    loop {
        let mut out = WriteBuffer::new_initialized(&mut *buffer);
        let done = step(&mut out)?;
        let written = out.written_len();
        output.extend_from_slice(&buffer[..written]);
        if done {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample_body(lines: usize) -> Vec<u8> {
        (0..lines)
            .map(|i| format!("line {i}: the quick brown fox jumps over {} lazy dogs\n", i % 13))
            .collect::<String>()
            .into_bytes()
    }

    fn feed_in_chunks(codec: Codec, body: &[u8], chunk_size: usize) -> Vec<u8> {
        let mut encoder = Encoder::new(codec, "text/plain").unwrap();
        let chunks: Vec<&[u8]> = body.chunks(chunk_size).collect();
        let mut output = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let is_last = i + 1 == chunks.len();
            output.extend_from_slice(&encoder.feed(chunk, is_last).unwrap());
        }
        assert!(encoder.is_finished());
        assert_eq!(encoder.content_length(), output.len() as u64);
        output
    }

    fn decode(codec: Codec, data: &[u8]) -> Vec<u8> {
        let mut decoded = Vec::new();
        match codec {
            Codec::Gzip => {
                flate2::read::GzDecoder::new(data)
                    .read_to_end(&mut decoded)
                    .unwrap();
            }
            Codec::Deflate => {
                flate2::read::ZlibDecoder::new(data)
                    .read_to_end(&mut decoded)
                    .unwrap();
            }
            Codec::Brotli => {
                brotli::BrotliDecompress(&mut std::io::Cursor::new(data), &mut decoded).unwrap();
            }
            Codec::Zstd => {
                decoded = zstd::decode_all(std::io::Cursor::new(data)).unwrap();
            }
        }
        decoded
    }

    #[test]
    fn test_identity_passthrough() {
        let mut encoder = Encoder::identity();
        assert!(encoder.is_identity());
        assert_eq!(encoder.feed(b"hello ", false).unwrap(), Bytes::from("hello "));
        assert_eq!(encoder.feed(b"world", true).unwrap(), Bytes::from("world"));
        assert_eq!(encoder.content_length(), 11);
    }

    #[test]
    fn test_identity_feed_bytes_shares_buffer() {
        let chunk = Bytes::from_static(b"static body");
        let mut encoder = Encoder::identity();
        let out = encoder.feed_bytes(chunk.clone(), true).unwrap();
        assert_eq!(out.as_ptr(), chunk.as_ptr());
        assert!(encoder.is_finished());
        assert!(encoder.feed_bytes(chunk, true).is_err());
    }

    #[test]
    #[cfg(feature = "gzip")]
    fn test_feed_bytes_encodes() {
        let mut encoder = Encoder::new(Codec::Gzip, "text/plain").unwrap();
        let out = encoder
            .feed_bytes(Bytes::from_static(b"hello"), true)
            .unwrap();
        assert_eq!(out, Encoder::compress_all(Codec::Gzip, "text/plain", b"hello").unwrap());
    }

    #[test]
    fn test_feed_after_finish_fails() {
        let mut encoder = Encoder::identity();
        encoder.feed(b"done", true).unwrap();
        assert!(matches!(
            encoder.feed(b"more", false),
            Err(CompressionError::Finished)
        ));
    }

    #[test]
    fn test_finish_identity() {
        let mut encoder = Encoder::identity();
        encoder.finish_identity();
        assert!(encoder.is_finished());
        assert_eq!(encoder.content_length(), 0);
    }

    #[test]
    #[cfg(feature = "gzip")]
    fn test_finish_identity_ignores_codecs() {
        let mut encoder = Encoder::new(Codec::Gzip, "text/plain").unwrap();
        encoder.finish_identity();
        assert!(!encoder.is_finished());
    }

    #[test]
    fn test_chunking_matches_one_shot() {
        let body = sample_body(400);
        for codec in Codec::available() {
            let one_shot = Encoder::compress_all(codec, "text/plain", &body).unwrap();
            for chunk_size in [1, 7, 64, 1000, body.len()] {
                let chunked = feed_in_chunks(codec, &body, chunk_size);
                assert_eq!(
                    chunked,
                    one_shot.as_ref(),
                    "{codec} output differs with {chunk_size}-byte chunks"
                );
            }
        }
    }

    #[test]
    fn test_empty_final_chunk_matches_one_shot() {
        let body = sample_body(50);
        for codec in Codec::available() {
            let one_shot = Encoder::compress_all(codec, "text/plain", &body).unwrap();
            let mut encoder = Encoder::new(codec, "text/plain").unwrap();
            let mut output = encoder.feed(&body[..100], false).unwrap().to_vec();
            output.extend_from_slice(&encoder.feed(&body[100..], false).unwrap());
            output.extend_from_slice(&encoder.feed(&[], true).unwrap());
            assert_eq!(output, one_shot.as_ref(), "{codec} differs with empty last chunk");
        }
    }

    #[test]
    fn test_round_trip() {
        let body = sample_body(200);
        for codec in Codec::available() {
            let compressed = feed_in_chunks(codec, &body, 333);
            assert!(compressed.len() < body.len());
            assert_eq!(decode(codec, &compressed), body, "{codec} round trip failed");
        }
    }

    #[test]
    fn test_repeated_bytes_shrink() {
        let body = vec![b'1'; 1000];
        for codec in Codec::available() {
            let compressed = Encoder::compress_all(codec, "text/plain", &body).unwrap();
            assert!(compressed.len() < body.len());
        }
    }

    #[test]
    fn test_flush_emits_every_chunk() {
        let body = sample_body(20);
        for codec in Codec::available() {
            let mut encoder = Encoder::new(codec, "text/event-stream")
                .unwrap()
                .with_flush(true);
            let mut output = Vec::new();
            for chunk in body.chunks(100) {
                let out = encoder.feed(chunk, false).unwrap();
                assert!(!out.is_empty(), "{codec} did not flush");
                output.extend_from_slice(&out);
            }
            output.extend_from_slice(&encoder.feed(&[], true).unwrap());
            assert_eq!(decode(codec, &output), body);
        }
    }

    #[test]
    #[cfg(feature = "brotli")]
    fn test_brotli_modes_decode() {
        let body = sample_body(30);
        for media_type in ["text/html", "font/woff2", "application/octet-stream"] {
            let compressed = Encoder::compress_all(Codec::Brotli, media_type, &body).unwrap();
            assert_eq!(decode(Codec::Brotli, &compressed), body);
        }
    }

    #[test]
    #[cfg(feature = "gzip")]
    fn test_gzip_magic() {
        let compressed = Encoder::compress_all(Codec::Gzip, "text/plain", b"hello").unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    }
}
