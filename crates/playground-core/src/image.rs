//! Intel HEX firmware image validation.
//!
//! The compile service returns the firmware as Intel HEX text. The emulator
//! consumes the text as-is; this module only decides whether the text is a
//! usable image before a session is built around it.

use thiserror::Error;

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;
const RECORD_EXTENDED_SEGMENT: u8 = 0x02;
const RECORD_START_SEGMENT: u8 = 0x03;
const RECORD_EXTENDED_LINEAR: u8 = 0x04;
const RECORD_START_LINEAR: u8 = 0x05;

/// Reasons a hex image is not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Text contains no records at all.
    #[error("binary image is empty")]
    Empty,
    /// A record line does not start with `:`.
    #[error("line {line}: record does not start with ':'")]
    MissingStartCode {
        /// 1-indexed line number.
        line: usize,
    },
    /// A record contains non-hex characters or an odd digit count.
    #[error("line {line}: record is not valid hexadecimal")]
    InvalidDigits {
        /// 1-indexed line number.
        line: usize,
    },
    /// Declared byte count disagrees with the record length.
    #[error("line {line}: record declares {declared} data bytes but carries {actual}")]
    LengthMismatch {
        /// 1-indexed line number.
        line: usize,
        /// Byte count from the record header.
        declared: usize,
        /// Data bytes actually present.
        actual: usize,
    },
    /// Record checksum does not sum to zero.
    #[error("line {line}: checksum mismatch")]
    ChecksumMismatch {
        /// 1-indexed line number.
        line: usize,
    },
    /// Record type is not one of 00..=05.
    #[error("line {line}: unsupported record type {record_type:#04x}")]
    UnsupportedRecord {
        /// 1-indexed line number.
        line: usize,
        /// Raw record type.
        record_type: u8,
    },
    /// Records follow the end-of-file record.
    #[error("line {line}: record after end-of-file")]
    TrailingRecord {
        /// 1-indexed line number.
        line: usize,
    },
    /// No end-of-file record was found.
    #[error("binary image has no end-of-file record")]
    MissingEof,
    /// The image carries no data bytes.
    #[error("binary image contains no program data")]
    NoData,
}

/// Validated Intel HEX firmware image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    hex: String,
    data_len: usize,
    data_end: u32,
}

impl BinaryImage {
    /// Validates Intel HEX text.
    ///
    /// # Errors
    ///
    /// Returns an [`ImageError`] for the first malformed record, or when the
    /// image has no end-of-file record or no data.
    pub fn parse(hex: &str) -> Result<Self, ImageError> {
        let mut upper_base: u32 = 0;
        let mut data_len = 0usize;
        let mut data_end = 0u32;
        let mut seen_eof = false;
        let mut seen_any = false;

        for (index, raw) in hex.lines().enumerate() {
            let line = index + 1;
            let record = raw.trim();
            if record.is_empty() {
                continue;
            }
            seen_any = true;
            if seen_eof {
                return Err(ImageError::TrailingRecord { line });
            }

            let bytes = decode_record(record, line)?;
            let declared = usize::from(bytes[0]);
            let actual = bytes.len() - 5;
            if declared != actual {
                return Err(ImageError::LengthMismatch {
                    line,
                    declared,
                    actual,
                });
            }
            let sum = bytes.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte));
            if sum != 0 {
                return Err(ImageError::ChecksumMismatch { line });
            }

            let offset = u32::from(u16::from_be_bytes([bytes[1], bytes[2]]));
            let payload = &bytes[4..bytes.len() - 1];
            match bytes[3] {
                RECORD_DATA => {
                    data_len += payload.len();
                    #[allow(clippy::cast_possible_truncation)]
                    let end = upper_base
                        .wrapping_add(offset)
                        .wrapping_add(payload.len() as u32);
                    data_end = data_end.max(end);
                }
                RECORD_EOF => seen_eof = true,
                RECORD_EXTENDED_SEGMENT if payload.len() == 2 => {
                    upper_base = u32::from(u16::from_be_bytes([payload[0], payload[1]])) << 4;
                }
                RECORD_EXTENDED_LINEAR if payload.len() == 2 => {
                    upper_base = u32::from(u16::from_be_bytes([payload[0], payload[1]])) << 16;
                }
                RECORD_START_SEGMENT | RECORD_START_LINEAR if payload.len() == 4 => {}
                record_type => {
                    return Err(ImageError::UnsupportedRecord { line, record_type });
                }
            }
        }

        if !seen_any {
            return Err(ImageError::Empty);
        }
        if !seen_eof {
            return Err(ImageError::MissingEof);
        }
        if data_len == 0 {
            return Err(ImageError::NoData);
        }

        Ok(Self {
            hex: hex.to_string(),
            data_len,
            data_end,
        })
    }

    /// Hex text as received, handed to the emulator unchanged.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Total number of data bytes across all records.
    #[must_use]
    pub const fn data_len(&self) -> usize {
        self.data_len
    }

    /// One past the highest address written by a data record.
    #[must_use]
    pub const fn data_end(&self) -> u32 {
        self.data_end
    }
}

fn decode_record(record: &str, line: usize) -> Result<Vec<u8>, ImageError> {
    let digits = record
        .strip_prefix(':')
        .ok_or(ImageError::MissingStartCode { line })?;
    // Count, address (2), type and checksum make the five-byte minimum.
    if digits.len() % 2 != 0
        || digits.len() < 10
        || !digits.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(ImageError::InvalidDigits { line });
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|text| u8::from_str_radix(text, 16).ok())
                .ok_or(ImageError::InvalidDigits { line })
        })
        .collect()
}
