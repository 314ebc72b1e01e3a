use std::io::{self, Read, Write};

use sha2::Digest as _;

use strata_types::{ChecksumValue, DigestAlgorithm};

/// Domain tag mixed into every strata digest.
///
/// Keeps replica checksums from colliding with hashes of the same bytes
/// computed elsewhere in the system for other purposes.
const DOMAIN: &[u8] = b"strata-replica-v1:";

enum Inner {
    Blake3(Box<blake3::Hasher>),
    Sha256(sha2::Sha256),
}

/// Incremental digest computation over a byte stream.
///
/// Feed chunks with [`update`](Self::update) in stream order and call
/// [`finalize`](Self::finalize) once; the result is the same value a
/// single-shot digest of the concatenated bytes would produce. A fresh
/// digester over zero chunks yields the digest of the empty stream, which
/// is a valid checksum (zero-length objects are real objects).
pub struct StreamDigester {
    inner: Inner,
    bytes_seen: u64,
}

impl StreamDigester {
    /// Start a digest computation with the given algorithm.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let mut digester = Self {
            inner: match algorithm {
                DigestAlgorithm::Blake3 => Inner::Blake3(Box::new(blake3::Hasher::new())),
                DigestAlgorithm::Sha256 => Inner::Sha256(sha2::Sha256::new()),
            },
            bytes_seen: 0,
        };
        digester.absorb(DOMAIN);
        digester
    }

    fn absorb(&mut self, chunk: &[u8]) {
        match &mut self.inner {
            Inner::Blake3(hasher) => {
                hasher.update(chunk);
            }
            Inner::Sha256(hasher) => hasher.update(chunk),
        }
    }

    /// Absorb the next chunk of the stream.
    pub fn update(&mut self, chunk: &[u8]) {
        self.absorb(chunk);
        self.bytes_seen += chunk.len() as u64;
    }

    /// Total payload bytes absorbed so far (domain tag excluded).
    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    /// The algorithm this digester runs.
    pub fn algorithm(&self) -> DigestAlgorithm {
        match self.inner {
            Inner::Blake3(_) => DigestAlgorithm::Blake3,
            Inner::Sha256(_) => DigestAlgorithm::Sha256,
        }
    }

    /// Finish the computation and produce the checksum.
    pub fn finalize(self) -> ChecksumValue {
        let algorithm = self.algorithm();
        let digest: [u8; 32] = match self.inner {
            Inner::Blake3(hasher) => *hasher.finalize().as_bytes(),
            Inner::Sha256(hasher) => hasher.finalize().into(),
        };
        ChecksumValue::new(algorithm, digest)
    }
}

/// Digest a complete in-memory buffer.
pub fn digest_bytes(algorithm: DigestAlgorithm, bytes: &[u8]) -> ChecksumValue {
    let mut digester = StreamDigester::new(algorithm);
    digester.update(bytes);
    digester.finalize()
}

/// Digest everything a reader produces, consuming it in fixed-size chunks.
///
/// Used for the independent read-back pass of verify-on-write.
pub fn digest_reader<R: Read>(
    algorithm: DigestAlgorithm,
    reader: &mut R,
) -> io::Result<ChecksumValue> {
    let mut digester = StreamDigester::new(algorithm);
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        digester.update(&buf[..n]);
    }
    Ok(digester.finalize())
}

/// A [`Write`] adapter that forwards bytes to an inner writer while
/// digesting them on the fly.
///
/// Lets the ingest path compute the source checksum in the same pass that
/// streams bytes to a leaf, with no second read of the source.
pub struct DigestWriter<W: Write> {
    writer: W,
    digester: StreamDigester,
}

impl<W: Write> DigestWriter<W> {
    /// Wrap a writer, hashing with the given algorithm.
    pub fn new(writer: W, algorithm: DigestAlgorithm) -> Self {
        Self {
            writer,
            digester: StreamDigester::new(algorithm),
        }
    }

    /// Finish, returning the inner writer and the computed checksum.
    pub fn finalize(self) -> (W, ChecksumValue) {
        (self.writer, self.digester.finalize())
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.writer.write(buf)?;
        self.digester.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
