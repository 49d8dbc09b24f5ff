use crate::error::{CabError, Result};

/// Narrows a computed size or count into a 32-bit on-disk field.
pub(crate) fn dword(field: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| CabError::Overflow { field, value })
}

/// Narrows a computed size or count into a 16-bit on-disk field.
pub(crate) fn word(field: &'static str, value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| CabError::Overflow { field, value: value as u64 })
}

#[cfg(test)]
mod tests {
    use super::{dword, word};
    use crate::error::CabError;

    #[test]
    fn narrowing_within_range() {
        assert_eq!(word("cFiles", 0xffff).unwrap(), 0xffff);
        assert_eq!(dword("cbCabinet", 0xffff_ffff).unwrap(), 0xffff_ffff);
    }

    #[test]
    fn narrowing_overflow() {
        match word("cFolders", 0x1_0000) {
            Err(CabError::Overflow { field, value }) => {
                assert_eq!(field, "cFolders");
                assert_eq!(value, 0x1_0000);
            }
            other => panic!("expected overflow, got {:?}", other.err()),
        }
    }
}
