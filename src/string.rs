use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::consts;
use crate::error::{CabError, Result};

/// Reads bytes until and including a NUL terminator; the terminator is not
/// part of the returned string.
pub(crate) fn read_null_terminated_string<R: Read>(
    reader: &mut R,
) -> Result<String> {
    let mut bytes = Vec::<u8>::with_capacity(consts::MAX_STRING_SIZE);
    loop {
        let byte = reader.read_u8()?;
        if byte == 0 {
            break;
        } else if bytes.len() == consts::MAX_STRING_SIZE {
            return Err(CabError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "string longer than maximum of {} bytes",
                    consts::MAX_STRING_SIZE
                ),
            )));
        }
        bytes.push(byte);
    }
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Writes the string bytes followed by a single NUL terminator.
pub(crate) fn write_null_terminated_string<W: Write>(
    writer: &mut W,
    string: &str,
) -> Result<()> {
    if string.len() > consts::MAX_STRING_SIZE {
        return Err(CabError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "string longer than maximum of {} bytes",
                consts::MAX_STRING_SIZE
            ),
        )));
    }
    writer.write_all(string.as_bytes())?;
    writer.write_u8(0)?;
    Ok(())
}

/// Serialized length of a NUL-terminated string field.
pub(crate) fn null_terminated_len(string: &str) -> u64 {
    string.len() as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::{
        null_terminated_len, read_null_terminated_string,
        write_null_terminated_string,
    };

    #[test]
    fn string_roundtrip() {
        let mut buffer = Vec::new();
        write_null_terminated_string(&mut buffer, "out_0.cab").unwrap();
        assert_eq!(buffer, b"out_0.cab\0");
        assert_eq!(null_terminated_len("out_0.cab"), buffer.len() as u64);
        let mut slice: &[u8] = &buffer;
        assert_eq!(read_null_terminated_string(&mut slice).unwrap(), "out_0.cab");
    }

    #[test]
    fn empty_string_is_just_a_terminator() {
        let mut buffer = Vec::new();
        write_null_terminated_string(&mut buffer, "").unwrap();
        assert_eq!(buffer, b"\0");
        let mut slice: &[u8] = &buffer;
        assert_eq!(read_null_terminated_string(&mut slice).unwrap(), "");
    }

    #[test]
    fn overlong_strings_are_refused_on_both_sides() {
        let long = "x".repeat(256);
        let mut buffer = Vec::new();
        assert!(write_null_terminated_string(&mut buffer, &long).is_err());
        assert!(buffer.is_empty());

        let mut unterminated = vec![b'x'; 256];
        unterminated.push(0);
        let mut slice: &[u8] = &unterminated;
        assert!(read_null_terminated_string(&mut slice).is_err());
    }
}
