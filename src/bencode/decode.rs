use std::collections::BTreeMap;

use bytes::Bytes;

use super::error::BencodeError;
use super::value::Value;

const MAX_DEPTH: usize = 256;

/// Decodes a bencode value from a byte slice.
///
/// The input must contain exactly one complete bencode value with no
/// trailing data.
///
/// # Errors
///
/// Returns an error if:
/// - The input is empty or truncated ([`BencodeError::UnexpectedEof`])
/// - The input contains invalid bencode syntax
/// - The nesting depth exceeds 256 levels ([`BencodeError::NestingTooDeep`])
/// - There is data after the value ([`BencodeError::TrailingData`])
///
/// # Examples
///
/// ```
/// use lodestone::bencode::decode;
///
/// let int = decode(b"i42e").unwrap();
/// assert_eq!(int.as_integer(), Some(42));
///
/// let string = decode(b"5:hello").unwrap();
/// assert_eq!(string.as_str(), Some("hello"));
///
/// let list = decode(b"li1ei2ei3ee").unwrap();
/// assert_eq!(list.as_list().unwrap().len(), 3);
/// ```
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let (value, consumed) = decode_prefix(data)?;

    if consumed != data.len() {
        return Err(BencodeError::TrailingData);
    }

    Ok(value)
}

/// Decodes one bencode value from the front of a byte slice.
///
/// Returns the value together with the cursor position where it ended.
/// Trailing bytes are allowed; the `ut_metadata` data message relies on
/// this, since its payload is a bencoded dictionary followed by raw piece
/// bytes.
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize), BencodeError> {
    let mut pos = 0;
    let value = decode_value(data, &mut pos, 0)?;
    Ok((value, pos))
}

/// Advances past one bencoded element starting at `pos` without building a
/// value tree, returning the position just past it.
///
/// This is the length-aware walker used to carve the raw `info` substring
/// out of a torrent file: string and integer lengths are computed directly,
/// containers are walked until their matching `e`.
pub fn skip_value(data: &[u8], pos: usize) -> Result<usize, BencodeError> {
    let mut pos = pos;
    // Containers still waiting for their terminating 'e'.
    let mut open = 0usize;

    loop {
        if pos >= data.len() {
            return Err(BencodeError::UnexpectedEof);
        }

        match data[pos] {
            b'l' | b'd' => {
                open += 1;
                pos += 1;
            }
            b'e' => {
                if open == 0 {
                    return Err(BencodeError::UnexpectedChar('e'));
                }
                open -= 1;
                pos += 1;
            }
            b'i' => {
                pos += 1;
                while pos < data.len() && data[pos] != b'e' {
                    pos += 1;
                }
                if pos >= data.len() {
                    return Err(BencodeError::UnexpectedEof);
                }
                pos += 1;
            }
            b'0'..=b'9' => {
                let (len, content) = read_length(data, pos)?;
                if len > data.len() - content {
                    return Err(BencodeError::UnexpectedEof);
                }
                pos = content + len;
            }
            c => return Err(BencodeError::UnexpectedChar(c as char)),
        }

        if open == 0 {
            return Ok(pos);
        }
    }
}

fn decode_value(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    if depth > MAX_DEPTH {
        return Err(BencodeError::NestingTooDeep);
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    match data[*pos] {
        b'i' => decode_integer(data, pos),
        b'l' => decode_list(data, pos, depth),
        b'd' => decode_dict(data, pos, depth),
        b'0'..=b'9' => decode_bytes(data, pos),
        c => Err(BencodeError::UnexpectedChar(c as char)),
    }
}

fn decode_integer(data: &[u8], pos: &mut usize) -> Result<Value, BencodeError> {
    *pos += 1;

    let start = *pos;
    while *pos < data.len() && data[*pos] != b'e' {
        *pos += 1;
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    let int_str = std::str::from_utf8(&data[start..*pos])
        .map_err(|_| BencodeError::InvalidInteger("invalid utf8".into()))?;

    if int_str.is_empty() {
        return Err(BencodeError::InvalidInteger("empty".into()));
    }

    if int_str.starts_with("-0") || (int_str.starts_with('0') && int_str.len() > 1) {
        return Err(BencodeError::InvalidInteger("leading zeros".into()));
    }

    let value: i64 = int_str
        .parse()
        .map_err(|_| BencodeError::InvalidInteger(int_str.into()))?;

    *pos += 1;
    Ok(Value::Integer(value))
}

fn decode_bytes(data: &[u8], pos: &mut usize) -> Result<Value, BencodeError> {
    let (len, content) = read_length(data, *pos)?;
    *pos = content;

    if len > data.len() - *pos {
        return Err(BencodeError::UnexpectedEof);
    }

    let bytes = Bytes::copy_from_slice(&data[*pos..*pos + len]);
    *pos += len;

    Ok(Value::Bytes(bytes))
}

// Parses the `<length>:` prefix of a byte string, returning the length and
// the position of the first content byte.
fn read_length(data: &[u8], pos: usize) -> Result<(usize, usize), BencodeError> {
    let start = pos;
    let mut pos = pos;
    while pos < data.len() && data[pos] != b':' {
        pos += 1;
    }

    if pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    let len_str =
        std::str::from_utf8(&data[start..pos]).map_err(|_| BencodeError::InvalidLength)?;

    if len_str.len() > 1 && len_str.starts_with('0') {
        return Err(BencodeError::InvalidLength);
    }

    let len: usize = len_str.parse().map_err(|_| BencodeError::InvalidLength)?;

    Ok((len, pos + 1))
}

fn decode_list(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    *pos += 1;
    let mut list = Vec::new();

    while *pos < data.len() && data[*pos] != b'e' {
        list.push(decode_value(data, pos, depth + 1)?);
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    *pos += 1;
    Ok(Value::List(list))
}

fn decode_dict(data: &[u8], pos: &mut usize, depth: usize) -> Result<Value, BencodeError> {
    *pos += 1;
    let mut dict = BTreeMap::new();

    while *pos < data.len() && data[*pos] != b'e' {
        let key = match decode_value(data, pos, depth + 1)? {
            Value::Bytes(b) => b,
            _ => return Err(BencodeError::UnexpectedChar(data[*pos] as char)),
        };

        let value = decode_value(data, pos, depth + 1)?;
        dict.insert(key, value);
    }

    if *pos >= data.len() {
        return Err(BencodeError::UnexpectedEof);
    }

    *pos += 1;
    Ok(Value::Dict(dict))
}
