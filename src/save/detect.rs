use crate::errors::{Error, ErrorKind, LoadStage};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

/// Saves smaller than this are rejected as truncated. The compressed layout
/// is also only searched for within this many leading bytes.
pub const MIN_SAVE_SIZE: u64 = 65536;

/// Magic of a zip local file header (`PK\x03\x04`)
const ZIP_LOCAL_HEADER: [u8; 4] = 0x04034B50u32.to_le_bytes();

/// The two bytes that precede the zip header in a compressed save
const COMPRESSED_MARKER: [u8; 2] = 4u16.to_le_bytes();

/// How the body of a save is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// Plaintext script, as written by debug mode
    Plaintext,

    /// The zip based binary encoding that must be melted first
    CompressedBinary,
}

impl std::fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveFormat::Plaintext => f.write_str("plaintext"),
            SaveFormat::CompressedBinary => f.write_str("compressed binary"),
        }
    }
}

fn detect_io(err: io::Error) -> Error {
    Error::io(LoadStage::Detect, err)
}

/// Returns true if the reader reached a `\n` or `\r`
fn skip_header_line<R: BufRead>(mut reader: R) -> io::Result<bool> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(false);
        }

        if let Some(pos) = buf.iter().position(|&b| b == b'\n' || b == b'\r') {
            reader.consume(pos + 1);
            return Ok(true);
        }

        let len = buf.len();
        reader.consume(len);
    }
}

/// Returns true if the leading block contains the zip header preceded by the
/// compressed marker
fn has_compressed_signature(block: &[u8]) -> bool {
    block
        .windows(COMPRESSED_MARKER.len() + ZIP_LOCAL_HEADER.len())
        .any(|w| w[..2] == COMPRESSED_MARKER && w[2..] == ZIP_LOCAL_HEADER)
}

/// Classify a save without reading past its first block.
///
/// The reader is rewound before any read so it may be at any position.
///
/// ```
/// use rome_loader::save::{detect, SaveFormat};
/// use std::io::Cursor;
///
/// let mut data = b"SAV0102\n".to_vec();
/// data.resize(65536, b' ');
/// assert_eq!(detect(Cursor::new(&data)).unwrap(), SaveFormat::Plaintext);
///
/// let truncated = b"SAV0102\nversion=\"2.0.4\"";
/// assert!(detect(Cursor::new(&truncated[..])).is_err());
/// ```
pub fn detect<R: Read + Seek>(mut reader: R) -> Result<SaveFormat, Error> {
    reader.seek(SeekFrom::Start(0)).map_err(detect_io)?;

    let mut magic = [0u8; 4];
    match reader.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(Error::new(ErrorKind::UnrecognizedFormat))
        }
        Err(e) => return Err(detect_io(e)),
    }

    if &magic[..3] != b"SAV" {
        return Err(Error::new(ErrorKind::UnrecognizedFormat));
    }

    if !skip_header_line(BufReader::new(&mut reader)).map_err(detect_io)? {
        return Err(Error::new(ErrorKind::UnrecognizedFormat));
    }

    let len = reader.seek(SeekFrom::End(0)).map_err(detect_io)?;
    if len < MIN_SAVE_SIZE {
        return Err(Error::new(ErrorKind::TruncatedFile { len }));
    }

    reader.seek(SeekFrom::Start(0)).map_err(detect_io)?;
    let mut block = Vec::with_capacity(MIN_SAVE_SIZE as usize);
    reader
        .take(MIN_SAVE_SIZE)
        .read_to_end(&mut block)
        .map_err(detect_io)?;

    if has_compressed_signature(&block) {
        Ok(SaveFormat::CompressedBinary)
    } else {
        Ok(SaveFormat::Plaintext)
    }
}
