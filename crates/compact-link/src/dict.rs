//! AppMessage dictionary wire format.
//!
//! ```text
//! dictionary := count:u8 tuple*
//! tuple      := key:u32le type:u8 length:u16le value[length]
//! ```
//!
//! Integers are always written as 4-byte values; decoding also accepts 1- and
//! 2-byte integers. C strings are NUL-terminated and the terminator counts
//! toward `length`.

use thiserror::Error;

const HEADER_LEN: usize = 1;
const TUPLE_HEADER_LEN: usize = 4 + 1 + 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("Dictionary truncated at offset {0}")]
    Truncated(usize),

    #[error("Unknown tuple type {kind} for key {key}")]
    UnknownTupleType { key: u32, kind: u8 },

    #[error("Unsupported integer width {width} for key {key}")]
    InvalidIntWidth { key: u32, width: u16 },

    #[error("String for key {0} contains an interior NUL")]
    InteriorNul(u32),

    #[error("String for key {0} is not valid UTF-8")]
    InvalidUtf8(u32),

    #[error("Value for key {0} is longer than 65535 bytes")]
    ValueTooLong(u32),

    #[error("Dictionary holds {0} tuples, at most 255 are allowed")]
    TooManyTuples(usize),

    #[error("{0} trailing bytes after the last tuple")]
    TrailingBytes(usize),

    #[error("Message of {size} bytes exceeds the {limit} byte inbox")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TupleType {
    ByteArray = 0,
    CString = 1,
    Uint = 2,
    Int = 3,
}

impl TryFrom<u8> for TupleType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::ByteArray),
            1 => Ok(Self::CString),
            2 => Ok(Self::Uint),
            3 => Ok(Self::Int),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleValue {
    Bytes(Vec<u8>),
    CString(String),
    Uint(u32),
    Int(i32),
}

impl TupleValue {
    pub fn tuple_type(&self) -> TupleType {
        match self {
            Self::Bytes(_) => TupleType::ByteArray,
            Self::CString(_) => TupleType::CString,
            Self::Uint(_) => TupleType::Uint,
            Self::Int(_) => TupleType::Int,
        }
    }

    /// Numeric view of the value, if it is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Uint(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::CString(s) => Some(s),
            _ => None,
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            Self::Bytes(b) => b.len(),
            Self::CString(s) => s.len() + 1,
            Self::Uint(_) | Self::Int(_) => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub key: u32,
    pub value: TupleValue,
}

impl Tuple {
    pub fn new(key: u32, value: TupleValue) -> Self {
        Self { key, value }
    }
}

/// Ordered set of tuples. Order is preserved on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    tuples: Vec<Tuple>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tuple, replacing an existing one with the same key
    pub fn insert(&mut self, key: u32, value: TupleValue) {
        match self.tuples.iter_mut().find(|t| t.key == key) {
            Some(existing) => existing.value = value,
            None => self.tuples.push(Tuple::new(key, value)),
        }
    }

    pub fn get(&self, key: u32) -> Option<&TupleValue> {
        self.tuples.iter().find(|t| t.key == key).map(|t| &t.value)
    }

    pub fn contains_key(&self, key: u32) -> bool {
        self.get(key).is_some()
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Size of the serialized dictionary in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + self
                .tuples
                .iter()
                .map(|t| TUPLE_HEADER_LEN + t.value.encoded_len())
                .sum::<usize>()
    }

    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        let count =
            u8::try_from(self.tuples.len()).map_err(|_| MessageError::TooManyTuples(self.len()))?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(count);

        for tuple in &self.tuples {
            let len = u16::try_from(tuple.value.encoded_len())
                .map_err(|_| MessageError::ValueTooLong(tuple.key))?;

            out.extend_from_slice(&tuple.key.to_le_bytes());
            out.push(tuple.value.tuple_type() as u8);
            out.extend_from_slice(&len.to_le_bytes());

            match &tuple.value {
                TupleValue::Bytes(b) => out.extend_from_slice(b),
                TupleValue::CString(s) => {
                    if s.as_bytes().contains(&0) {
                        return Err(MessageError::InteriorNul(tuple.key));
                    }
                    out.extend_from_slice(s.as_bytes());
                    out.push(0);
                }
                TupleValue::Uint(v) => out.extend_from_slice(&v.to_le_bytes()),
                TupleValue::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            }
        }

        Ok(out)
    }

    /// Encode and reject the result if it would overflow an inbox of `limit` bytes
    pub fn encode_within(&self, limit: usize) -> Result<Vec<u8>, MessageError> {
        let size = self.encoded_len();
        if size > limit {
            return Err(MessageError::TooLarge { size, limit });
        }
        self.encode()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut reader = Reader { bytes, pos: 0 };
        let count = reader.take(1)?[0];
        let mut tuples = Vec::with_capacity(usize::from(count));

        for _ in 0..count {
            let key = u32::from_le_bytes(reader.array::<4>()?);
            let kind = reader.take(1)?[0];
            let len = u16::from_le_bytes(reader.array::<2>()?);
            let raw = reader.take(usize::from(len))?;

            let tuple_type = TupleType::try_from(kind)
                .map_err(|kind| MessageError::UnknownTupleType { key, kind })?;

            let value = match tuple_type {
                TupleType::ByteArray => TupleValue::Bytes(raw.to_vec()),
                TupleType::CString => {
                    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
                    let s = std::str::from_utf8(&raw[..end])
                        .map_err(|_| MessageError::InvalidUtf8(key))?;
                    TupleValue::CString(s.to_string())
                }
                TupleType::Uint => TupleValue::Uint(match raw {
                    [a] => u32::from(*a),
                    [a, b] => u32::from(u16::from_le_bytes([*a, *b])),
                    [a, b, c, d] => u32::from_le_bytes([*a, *b, *c, *d]),
                    _ => return Err(MessageError::InvalidIntWidth { key, width: len }),
                }),
                TupleType::Int => TupleValue::Int(match raw {
                    [a] => i32::from(*a as i8),
                    [a, b] => i32::from(i16::from_le_bytes([*a, *b])),
                    [a, b, c, d] => i32::from_le_bytes([*a, *b, *c, *d]),
                    _ => return Err(MessageError::InvalidIntWidth { key, width: len }),
                }),
            };

            tuples.push(Tuple::new(key, value));
        }

        if reader.remaining() > 0 {
            return Err(MessageError::TrailingBytes(reader.remaining()));
        }

        Ok(Self { tuples })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], MessageError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(MessageError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], MessageError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

/// Lowercase hex rendering of a frame
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse a hex frame; whitespace is ignored.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            u8::try_from(hi * 16 + lo).ok()
        })
        .collect()
}
