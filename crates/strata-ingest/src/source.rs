use std::io::{self, Cursor, Read};

use bytes::Bytes;

/// A streamed byte input with a known-or-unknown total length.
///
/// Sources are consumed exactly once, in chunks; the engine never buffers
/// a whole payload. A zero-length source is valid input — it produces a
/// real object whose checksum, if requested, is the digest of the empty
/// stream.
pub struct ByteSource {
    reader: Box<dyn Read + Send>,
    size_hint: Option<u64>,
}

impl ByteSource {
    /// A source over an in-memory buffer (length known).
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        Self {
            reader: Box::new(Cursor::new(bytes)),
            size_hint: Some(len),
        }
    }

    /// A source over an arbitrary reader of unknown length.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            size_hint: None,
        }
    }

    /// A source over a reader whose total length is known up front.
    pub fn from_reader_sized(reader: impl Read + Send + 'static, len: u64) -> Self {
        Self {
            reader: Box::new(reader),
            size_hint: Some(len),
        }
    }

    /// The zero-length source.
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// Total length, when known up front.
    pub fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("size_hint", &self.size_hint)
            .finish()
    }
}
