//! Shared-context header compression in the style of SPDY/3.
//!
//! Header blocks of one direction are framed as SPDY name/value blocks and
//! pushed through a single zlib stream that lives for the whole run and
//! starts from the SPDY/3 preset dictionary. Each
//! message ends with a sync flush, so the bytes a message adds are exactly
//! the stream's output growth for that call. Bodies are compressed on their
//! own.

use crate::compressor::Compressor;
use crate::scheme::SchemeTag;
use crate::strategy::CompressionStrategy;
use flate2::{Compress, Compression, FlushCompress};
use hdrcomp_core::{BenchError, BenchResult, Message, MessageKind};
use indexmap::IndexMap;

const SCRATCH_LEN: usize = 16 * 1024;

/// Header names and common values of the SPDY/3 zlib dictionary, each
/// stored behind a 4-byte big-endian length
const DICTIONARY_WORDS: &[&str] = &[
    "options", "head", "post", "put", "delete", "trace", "accept", "accept-charset",
    "accept-encoding", "accept-language", "accept-ranges", "age", "allow", "authorization",
    "cache-control", "connection", "content-base", "content-encoding", "content-language",
    "content-length", "content-location", "content-md5", "content-range", "content-type",
    "date", "etag", "expect", "expires", "from", "host", "if-match", "if-modified-since",
    "if-none-match", "if-range", "if-unmodified-since", "last-modified", "location",
    "max-forwards", "pragma", "proxy-authenticate", "proxy-authorization", "range", "referer",
    "retry-after", "server", "te", "trailer", "transfer-encoding", "upgrade", "user-agent",
    "vary", "via", "warning", "www-authenticate", "method", "get", "status", "200 OK",
    "version", "HTTP/1.1", "url", "public", "set-cookie", "keep-alive", "origin",
];

/// Raw tail of the SPDY/3 dictionary, appended without length prefixes
const DICTIONARY_TAIL: &str = concat!(
    "100101201202205206300302303304305306307402405406407408409410411412413414415416417502504505",
    "203 Non-Authoritative Information",
    "204 No Content",
    "301 Moved Permanently",
    "400 Bad Request",
    "401 Unauthorized",
    "403 Forbidden",
    "404 Not Found",
    "500 Internal Server Error",
    "501 Not Implemented",
    "503 Service Unavailable",
    "Jan Feb Mar Apr May Jun Jul Aug Sept Oct Nov Dec",
    " 00:00:00",
    " Mon, Tue, Wed, Thu, Fri, Sat, Sun, GMT",
    "chunked,text/html,image/png,image/jpg,image/gif,application/xml,application/xhtml+xml,",
    "text/plain,text/javascript,public",
    "privatemax-age=gzip,deflate,sdchcharset=utf-8charset=iso-8859-1,utf-,*,enq=0.",
);

/// Length of the SPDY/3 header dictionary in bytes
pub const DICTIONARY_LEN: usize = 1423;

/// The preset zlib dictionary SPDY/3 header blocks are compressed against
#[must_use]
pub fn spdy3_dictionary() -> Vec<u8> {
    let mut out = Vec::with_capacity(DICTIONARY_LEN);
    for word in DICTIONARY_WORDS {
        out.extend_from_slice(&(word.len() as u32).to_be_bytes());
        out.extend_from_slice(word.as_bytes());
    }
    out.extend_from_slice(DICTIONARY_TAIL.as_bytes());
    out
}

/// One zlib deflate context, sync-flushed after every block
pub struct HeaderStream {
    deflate: Compress,
    scratch: Vec<u8>,
}

impl HeaderStream {
    /// Create a stream at `level` that compresses against the SPDY/3 dictionary
    ///
    /// # Errors
    ///
    /// Returns `Compressor` if zlib rejects the dictionary.
    pub fn new(level: u32) -> BenchResult<Self> {
        let mut stream = Self::without_dictionary(level);
        stream
            .deflate
            .set_dictionary(&spdy3_dictionary())
            .map_err(|e| BenchError::compressor(e.to_string()))?;
        Ok(stream)
    }

    /// Create a stream with an empty context
    #[must_use]
    pub fn without_dictionary(level: u32) -> Self {
        Self {
            deflate: Compress::new(Compression::new(level.min(9)), true),
            scratch: Vec::with_capacity(SCRATCH_LEN),
        }
    }

    /// Compress `input` into the stream and return the bytes it added
    ///
    /// # Errors
    ///
    /// Returns `Compressor` if zlib reports an error.
    pub fn feed(&mut self, input: &[u8]) -> BenchResult<u64> {
        let start = self.deflate.total_out();
        let mut consumed = 0usize;

        loop {
            self.scratch.clear();
            let in_before = self.deflate.total_in();
            let out_before = self.deflate.total_out();
            self.deflate
                .compress_vec(&input[consumed..], &mut self.scratch, FlushCompress::Sync)
                .map_err(|e| BenchError::compressor(e.to_string()))?;
            consumed += (self.deflate.total_in() - in_before) as usize;

            let flushed = self.scratch.len() < self.scratch.capacity();
            let stalled = self.deflate.total_in() == in_before && self.deflate.total_out() == out_before;
            if (consumed >= input.len() && flushed) || stalled {
                break;
            }
        }

        Ok(self.deflate.total_out() - start)
    }

    /// Total compressed bytes emitted so far
    #[must_use]
    pub fn total_out(&self) -> u64 {
        self.deflate.total_out()
    }
}

/// Header stream plus per-message body compression
pub struct SharedStreamStrategy {
    stream: HeaderStream,
    body: Box<dyn Compressor>,
}

impl SharedStreamStrategy {
    /// Create the strategy with a fresh dictionary-backed stream
    ///
    /// # Errors
    ///
    /// Returns `Compressor` if the stream cannot be initialised.
    pub fn new(stream_level: u32, body: Box<dyn Compressor>) -> BenchResult<Self> {
        Ok(Self::with_stream(HeaderStream::new(stream_level)?, body))
    }

    /// Create the strategy around an existing stream
    #[must_use]
    pub fn with_stream(stream: HeaderStream, body: Box<dyn Compressor>) -> Self {
        Self { stream, body }
    }
}

impl CompressionStrategy for SharedStreamStrategy {
    fn scheme(&self) -> SchemeTag {
        SchemeTag::Spdy3
    }

    fn measure(&mut self, message: &Message) -> BenchResult<u64> {
        message.validate()?;
        let block = name_value_block(message)?;
        let header_cost = self.stream.feed(&block)?;
        let body_cost = if message.body().is_empty() {
            0
        } else {
            self.body.compress(message.body())?
        };
        tracing::trace!(header_cost, body_cost, "spdy3 measured");
        Ok(header_cost + body_cost)
    }
}

/// Frame headers as a SPDY/3 name/value block
///
/// Names are lower-cased and repeated names are joined into one entry with
/// NUL-separated values, in order of first appearance. A response's status
/// text is folded into `:status`.
///
/// # Errors
///
/// Returns `DecodeFailure` if a request lacks `:method` or a response lacks
/// `:status`, or if the block would not fit SPDY's 32-bit lengths.
pub fn name_value_block(message: &Message) -> BenchResult<Vec<u8>> {
    let status_text = message.header(":status-text").unwrap_or("");
    let mut pairs: IndexMap<String, Vec<&str>> = IndexMap::new();

    for field in message.headers() {
        if field.name.eq_ignore_ascii_case(":status-text") {
            continue;
        }
        pairs
            .entry(field.name.to_ascii_lowercase())
            .or_default()
            .push(field.value.as_str());
    }

    let required = match message.kind() {
        MessageKind::Request => ":method",
        MessageKind::Response => ":status",
    };
    if !pairs.contains_key(required) {
        return Err(BenchError::decode(format!(
            "{} is missing {}",
            message.kind(),
            required
        )));
    }

    let mut out = Vec::with_capacity(256);
    push_len(&mut out, pairs.len())?;
    for (name, values) in &pairs {
        let value = if name == ":status" && !status_text.is_empty() {
            format!("{} {}", values.join("\0"), status_text)
        } else {
            values.join("\0")
        };
        push_len(&mut out, name.len())?;
        out.extend_from_slice(name.as_bytes());
        push_len(&mut out, value.len())?;
        out.extend_from_slice(value.as_bytes());
    }
    Ok(out)
}

fn push_len(out: &mut Vec<u8>, len: usize) -> BenchResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| BenchError::decode(format!("header length {} exceeds 32 bits", len)))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}
