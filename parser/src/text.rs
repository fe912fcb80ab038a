//! Length-prefixed strings.
//!
//! Every string in a replay is an `i32` length followed by its data. The sign
//! of the length selects the encoding: positive lengths are single-byte
//! (Latin-1) text, negative lengths are UTF-16LE code units. In both cases the
//! magnitude counts a trailing null terminator, which is dropped.

use nom::bytes::complete::take;
use nom::number::complete::le_i32;

use crate::error::{ErrorKind, IResult, failure};

/// Marks the end of a property list.
pub const SENTINEL: &str = "None";

pub fn parse_long_string(i: &[u8]) -> IResult<&[u8], String> {
    let (i, length) = le_i32(i)?;
    match length {
        0 => Ok((i, String::new())),
        n if n > 0 => {
            let (i, data) = take(n as usize)(i)?;
            let text = data[..data.len() - 1].iter().map(|&b| b as char).collect();
            Ok((i, text))
        }
        n => {
            let byte_len = n
                .checked_neg()
                .and_then(|units| units.checked_mul(2))
                .ok_or_else(|| failure(ErrorKind::InvalidStringEncoding { length: n }))?;
            let (i, data) = take(byte_len as usize)(i)?;
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            let text = String::from_utf16(&units[..units.len() - 1])
                .map_err(|_| failure(ErrorKind::InvalidStringEncoding { length: n }))?;
            Ok((i, text))
        }
    }
}

/// Reads the name heading the next property list entry, or `None` on the
/// sentinel. Input running out here means the list was never terminated.
pub(crate) fn parse_list_entry_name(i: &[u8]) -> IResult<&[u8], Option<String>> {
    if i.is_empty() {
        return Err(failure(ErrorKind::MissingSentinel));
    }
    let (i, name) = parse_long_string(i)?;
    if name == SENTINEL {
        Ok((i, None))
    } else {
        Ok((i, Some(name)))
    }
}
