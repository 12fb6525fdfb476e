use bytes::Bytes;

use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, skip_value, Value};

/// A parsed single-file torrent.
///
/// Holds the tracker URL, the typed info dictionary, and the exact bencoded
/// bytes of the info dictionary as they appeared in the source file. The
/// info hash is computed over those raw bytes, so they must be preserved
/// octet-for-octet even when the source file is not canonical bencoding.
///
/// # Examples
///
/// ```no_run
/// use lodestone::metainfo::Metainfo;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let data = std::fs::read("example.torrent")?;
/// let metainfo = Metainfo::from_bytes(&data)?;
///
/// println!("Tracker: {}", metainfo.announce);
/// println!("Size: {} bytes", metainfo.info.length);
/// println!("Info hash: {}", metainfo.info_hash);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// Tracker announce URL.
    pub announce: String,
    /// The info dictionary describing the file and its pieces.
    pub info: Info,
    /// SHA-1 of the raw info dictionary bytes.
    pub info_hash: InfoHash,
    raw_info: Bytes,
}

/// The info dictionary of a single-file torrent.
///
/// Also produced from metadata fetched over the wire in the magnet flow,
/// where no enclosing torrent file exists.
#[derive(Debug, Clone)]
pub struct Info {
    /// Suggested file name. Raw bytes; not guaranteed to be UTF-8.
    pub name: Bytes,
    /// Number of bytes per piece (the last piece may be shorter).
    pub piece_length: u64,
    /// Total file size in bytes.
    pub length: u64,
    /// SHA-1 hash of each piece.
    pub pieces: Vec<[u8; 20]>,
}

impl Metainfo {
    /// Parses a torrent file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid bencode, required fields
    /// are missing, or the piece table is inconsistent with the declared
    /// file length.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let value = decode(data)?;
        let dict = value.as_dict().ok_or(MetainfoError::InvalidField("root"))?;

        let announce = dict
            .get(b"announce".as_slice())
            .and_then(|v| v.as_str())
            .ok_or(MetainfoError::MissingField("announce"))?
            .to_string();

        let info_value = dict
            .get(b"info".as_slice())
            .ok_or(MetainfoError::MissingField("info"))?;

        let raw_info = Bytes::copy_from_slice(raw_info_slice(data)?);
        let info_hash = InfoHash::from_info_bytes(&raw_info);

        let info = parse_info(info_value)?;

        Ok(Self {
            announce,
            info,
            info_hash,
            raw_info,
        })
    }

    /// Returns the exact bencoded info dictionary bytes from the source file.
    ///
    /// This is the SHA-1 preimage of the info hash.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }
}

impl Info {
    /// Parses a bare bencoded info dictionary, as delivered by the
    /// `ut_metadata` extension.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        parse_info(&decode(data)?)
    }

    /// Returns the number of pieces.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Returns the length of a piece in bytes.
    ///
    /// Every piece is `piece_length` long except the last, which covers
    /// whatever remains of the file.
    pub fn piece_size(&self, index: u32) -> u64 {
        let start = index as u64 * self.piece_length;
        self.piece_length.min(self.length - start)
    }

    /// Returns the expected SHA-1 hash of a piece.
    pub fn piece_hash(&self, index: u32) -> &[u8; 20] {
        &self.pieces[index as usize]
    }
}

fn parse_info(value: &Value) -> Result<Info, MetainfoError> {
    let dict = value.as_dict().ok_or(MetainfoError::InvalidField("info"))?;

    let name = dict
        .get(b"name".as_slice())
        .and_then(|v| v.as_bytes())
        .ok_or(MetainfoError::MissingField("name"))?
        .clone();

    let piece_length = dict
        .get(b"piece length".as_slice())
        .and_then(|v| v.as_integer())
        .filter(|&n| n > 0)
        .ok_or(MetainfoError::InvalidField("piece length"))? as u64;

    let length = dict
        .get(b"length".as_slice())
        .and_then(|v| v.as_integer())
        .filter(|&n| n >= 0)
        .ok_or(MetainfoError::MissingField("length"))? as u64;

    let pieces_bytes = dict
        .get(b"pieces".as_slice())
        .and_then(|v| v.as_bytes())
        .ok_or(MetainfoError::MissingField("pieces"))?;

    if pieces_bytes.len() % 20 != 0 {
        return Err(MetainfoError::InvalidField("pieces"));
    }

    let pieces: Vec<[u8; 20]> = pieces_bytes
        .chunks_exact(20)
        .map(|chunk| {
            let mut arr = [0u8; 20];
            arr.copy_from_slice(chunk);
            arr
        })
        .collect();

    if pieces.len() as u64 != length.div_ceil(piece_length) {
        return Err(MetainfoError::InvalidField("pieces"));
    }

    Ok(Info {
        name,
        piece_length,
        length,
        pieces,
    })
}

// Locates the value bound to the top-level `info` key and returns its exact
// byte range. The top-level dictionary is walked element by element with the
// length-aware skipper; scanning the raw bytes for a `4:info` marker would
// also match inside string data.
fn raw_info_slice(data: &[u8]) -> Result<&[u8], MetainfoError> {
    if data.first() != Some(&b'd') {
        return Err(MetainfoError::InvalidField("root"));
    }

    let mut pos = 1;
    while pos < data.len() && data[pos] != b'e' {
        let key_end = skip_value(data, pos)?;
        let value_end = skip_value(data, key_end)?;

        // Dictionary keys are byte strings: `<len>:<bytes>`.
        let key = data[pos..key_end]
            .splitn(2, |&b| b == b':')
            .nth(1)
            .ok_or(MetainfoError::InvalidField("root"))?;

        if key == b"info" {
            return Ok(&data[key_end..value_end]);
        }

        pos = value_end;
    }

    Err(MetainfoError::MissingField("info"))
}
