// this_file: backends/ttb-core/src/io.rs

//! Input stream helper shared by host implementations.

use flate2::read::GzDecoder;
use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// An open input with one byte of pushback.
pub struct InputStream {
    name: String,
    source: Box<dyn ReadSeek>,
    size: u64,
    mtime: i64,
    pushback: Option<u8>,
}

impl InputStream {
    pub fn new<R>(name: impl Into<String>, source: R, size: u64, mtime: i64) -> Self
    where
        R: Read + Seek + 'static,
    {
        Self {
            name: name.into(),
            source: Box::new(source),
            size,
            mtime,
            pushback: None,
        }
    }

    /// Wrap an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, mtime: i64) -> Self {
        let size = bytes.len() as u64;
        Self::new(name, Cursor::new(bytes), size, mtime)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    pub fn getc(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pushback.take() {
            return Ok(Some(byte));
        }
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Push `byte` back so the next read returns it first.
    pub fn ungetc(&mut self, byte: u8) -> io::Result<()> {
        if self.pushback.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "only one byte of pushback is supported",
            ));
        }
        self.pushback = Some(byte);
        Ok(())
    }

    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(byte) = self.pushback else {
            return self.source.read(buf);
        };
        // The pushed-back byte survives a failed source read.
        let rest = self.source.read(&mut buf[1..])?;
        self.pushback = None;
        buf[0] = byte;
        Ok(rest + 1)
    }

    /// Reposition the stream, discarding any pushed-back byte once the
    /// source has moved.
    pub fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match (pos, self.pushback) {
            // The logical position is one byte behind the source.
            (SeekFrom::Current(offset), Some(_)) => SeekFrom::Current(offset - 1),
            (pos, _) => pos,
        };
        let offset = self.source.seek(target)?;
        self.pushback = None;
        Ok(offset)
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mtime", &self.mtime)
            .field("pushback", &self.pushback)
            .finish()
    }
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether `bytes` start with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Decompress a complete gzip stream.
pub fn gunzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoded = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut decoded)?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_getc_and_single_pushback() {
        let mut stream = InputStream::from_bytes("a.tex", b"xy".to_vec(), 0);
        assert_eq!(stream.getc().unwrap(), Some(b'x'));
        stream.ungetc(b'x').unwrap();
        assert!(stream.ungetc(b'q').is_err());
        assert_eq!(stream.getc().unwrap(), Some(b'x'));
        assert_eq!(stream.getc().unwrap(), Some(b'y'));
        assert_eq!(stream.getc().unwrap(), None);
    }

    #[test]
    fn test_read_returns_pushback_first() {
        let mut stream = InputStream::from_bytes("a.tex", b"hello".to_vec(), 0);
        assert_eq!(stream.getc().unwrap(), Some(b'h'));
        stream.ungetc(b'H').unwrap();
        let mut buf = [0u8; 8];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"Hello");
    }

    #[test]
    fn test_relative_seek_accounts_for_pushback() {
        let mut stream = InputStream::from_bytes("a.tex", b"abcdef".to_vec(), 0);
        stream.getc().unwrap();
        stream.getc().unwrap();
        stream.ungetc(b'b').unwrap();
        assert_eq!(stream.seek(SeekFrom::Current(0)).unwrap(), 1);
        assert_eq!(stream.getc().unwrap(), Some(b'b'));
        assert_eq!(stream.seek(SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(stream.getc().unwrap(), Some(b'e'));
    }

    /// Source whose reads always fail.
    struct FailingReads(Cursor<Vec<u8>>);

    impl Read for FailingReads {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk hiccup"))
        }
    }

    impl Seek for FailingReads {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.0.seek(pos)
        }
    }

    #[test]
    fn test_failed_read_keeps_pushback() {
        let source = FailingReads(Cursor::new(b"abc".to_vec()));
        let mut stream = InputStream::new("flaky.tex", source, 3, 0);
        stream.ungetc(b'a').unwrap();
        let mut buf = [0u8; 4];
        assert!(stream.read(&mut buf).is_err());
        assert_eq!(stream.getc().unwrap(), Some(b'a'));
        assert!(stream.getc().is_err());
    }

    #[test]
    fn test_rejected_seek_keeps_pushback() {
        let mut stream = InputStream::from_bytes("a.tex", b"abc".to_vec(), 0);
        stream.ungetc(b'z').unwrap();
        // One byte before the start of the source.
        let err = stream.seek(SeekFrom::Current(0)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(stream.getc().unwrap(), Some(b'z'));
        assert_eq!(stream.getc().unwrap(), Some(b'a'));
    }

    #[test]
    fn test_metadata() {
        let stream = InputStream::from_bytes("refs.bib", vec![0; 12], 1_700_000_000);
        assert_eq!(stream.name(), "refs.bib");
        assert_eq!(stream.size(), 12);
        assert_eq!(stream.mtime(), 1_700_000_000);
    }

    #[test]
    fn test_gunzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed page").unwrap();
        let bytes = encoder.finish().unwrap();
        assert!(is_gzip(&bytes));
        assert!(!is_gzip(b"plain"));
        assert_eq!(gunzip(&bytes).unwrap(), b"compressed page");
        assert!(gunzip(b"\x1f\x8bgarbage").is_err());
    }
}
