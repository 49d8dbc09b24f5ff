use std::mem;
use std::path::Path;

use log::debug;

use crate::cabinet::Cabinet;
use crate::error::{CabError, Result};
use crate::CabRecords;

/// One logical file recovered from a cabinet set.
pub struct ExtractedFile {
    name: String,
    data: Vec<u8>,
}

impl ExtractedFile {
    /// The file's name as stored in its records.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The reassembled payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the file, yielding its payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Opens the first volume of a set on disk, chains its successors through
/// the `szCabinetNext` fields (resolved in the same directory) and
/// reassembles every logical file.
pub fn extract_set<P: AsRef<Path>>(
    first_volume: P,
) -> Result<Vec<ExtractedFile>> {
    let path = first_volume.as_ref();
    let directory = path.parent().unwrap_or_else(|| Path::new("."));

    let first = Cabinet::from_path(path)?;
    if first.header().cabinet_index() != 0 {
        return Err(CabError::InvalidLayout {
            field: "iCabinet",
            declared: first.header().cabinet_index() as u64,
            observed: 0,
        });
    }

    let mut cabinets = vec![first];
    loop {
        let next_name = match cabinets[cabinets.len() - 1]
            .header()
            .next_cabinet()
        {
            Some((cab_name, _)) => cab_name.to_string(),
            None => break,
        };
        debug!("chaining into {}", next_name);
        cabinets.push(Cabinet::from_path(directory.join(&next_name))?);
    }
    reassemble(&cabinets)
}

/// Walks a set's volumes in order and reassembles logical file payloads.
///
/// A record whose iFolder word carries `CONTINUED_FROM_PREV` appends to the
/// most recently started file instead of opening a new one.  Two adjacent
/// files may share a data block (the tail of one and the head of the next);
/// whenever the running payload overshoots a record's declared size, the
/// file is truncated to exactly that size and the excess becomes the
/// synthetic leading payload of the next file.
pub fn reassemble<G: CabRecords>(volumes: &[G]) -> Result<Vec<ExtractedFile>> {
    let mut out: Vec<ExtractedFile> = Vec::new();
    let mut carry: Vec<u8> = Vec::new();
    for volume in volumes {
        let mut blocks = volume.data_blocks().iter();
        for file in volume.files() {
            let appending = file.is_continued_from_prev() && !out.is_empty();
            if !appending {
                out.push(ExtractedFile {
                    name: file.name().to_string(),
                    data: mem::take(&mut carry),
                });
            }
            let target = out.last_mut().unwrap();
            let declared = file.total_size() as u64;
            while (target.data.len() as u64) < declared {
                match blocks.next() {
                    Some(block) => {
                        target.data.extend_from_slice(block.payload());
                    }
                    // The rest of this file lives in the next volume.
                    None => break,
                }
            }
            if target.data.len() as u64 > declared {
                carry = target.data.split_off(declared as usize);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::reassemble;
    use crate::cabinet::Cabinet;

    // One folder, one 10-byte data block shared by two file records of 6
    // and 4 bytes.
    const SHARED_BLOCK_CAB: &[u8] = b"MSCF\0\0\0\0\x62\0\0\0\0\0\0\0\
        \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x02\0\0\0\0\0\0\0\
        \x50\0\0\0\x01\0\0\0\
        \x06\0\0\0\0\0\0\0\0\0\0\0\0\0\x20\0a\0\
        \x04\0\0\0\x06\0\0\0\0\0\0\0\0\0\x20\0b\0\
        \0\0\0\0\x0a\0\x0a\00123456789";

    #[test]
    fn shared_block_is_split_between_files() {
        assert_eq!(SHARED_BLOCK_CAB.len(), 0x62);
        let cabinet = Cabinet::parse(SHARED_BLOCK_CAB).unwrap();
        let files = reassemble(&[cabinet]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name(), "a");
        assert_eq!(files[0].data(), b"012345");
        assert_eq!(files[1].name(), "b");
        assert_eq!(files[1].data(), b"6789");
    }

    #[test]
    fn empty_set_reassembles_to_nothing() {
        let cabinets: Vec<Cabinet> = Vec::new();
        assert!(reassemble(&cabinets).unwrap().is_empty());
    }
}
