use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::consts;
use crate::error::Result;

/// The CFFOLDER record: a run of data blocks shared by a group of files.
///
/// `name` and `folder_id` exist only to steer construction (the set builder
/// keys folders by name); neither is serialized.
#[derive(Clone, Debug)]
pub struct FolderRecord {
    pub(crate) data_offset: u32,
    pub(crate) block_count: u16,
    pub(crate) compression: u16,
    pub(crate) reserve_data: Vec<u8>,
    pub(crate) name: String,
    pub(crate) folder_id: u16,
}

impl FolderRecord {
    /// Creates an empty folder.  `reserve_size` is the owning header's
    /// per-folder reserve size; the area is pre-filled with the filler byte.
    pub(crate) fn new(
        name: String,
        folder_id: u16,
        reserve_size: u8,
    ) -> FolderRecord {
        FolderRecord {
            data_offset: 0,
            block_count: 0,
            compression: consts::CTYPE_NONE,
            reserve_data: vec![consts::RESERVE_FILL; reserve_size as usize],
            name,
            folder_id,
        }
    }

    pub(crate) fn parse<R: Read>(
        reader: &mut R,
        reserve_size: u8,
        folder_id: u16,
    ) -> Result<FolderRecord> {
        let data_offset = reader.read_u32::<LittleEndian>()?;
        let block_count = reader.read_u16::<LittleEndian>()?;
        let compression = reader.read_u16::<LittleEndian>()?;
        let mut reserve_data = vec![0u8; reserve_size as usize];
        if !reserve_data.is_empty() {
            reader.read_exact(&mut reserve_data)?;
        }
        Ok(FolderRecord {
            data_offset,
            block_count,
            compression,
            reserve_data,
            name: String::new(),
            folder_id,
        })
    }

    /// Serialized length: the 8 fixed bytes plus the reserve area.
    pub fn len(&self) -> u64 {
        8 + self.reserve_data.len() as u64
    }

    /// Serializes the record; the output is exactly `len()` bytes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.data_offset)?;
        writer.write_u16::<LittleEndian>(self.block_count)?;
        writer.write_u16::<LittleEndian>(self.compression)?;
        writer.write_all(&self.reserve_data)?;
        Ok(())
    }

    /// Absolute offset of this folder's first data block (coffCabStart).
    pub fn data_offset(&self) -> u32 {
        self.data_offset
    }

    /// Number of data blocks owned by this folder (cCFData).
    pub fn block_count(&self) -> u16 {
        self.block_count
    }

    /// Raw compression-type code; always zero for volumes built here.
    pub fn compression(&self) -> u16 {
        self.compression
    }

    /// The per-folder application reserve area.
    pub fn reserve_data(&self) -> &[u8] {
        &self.reserve_data
    }
}

#[cfg(test)]
mod tests {
    use super::FolderRecord;

    #[test]
    fn folder_length_identity() {
        let folder = FolderRecord::new("docs".to_string(), 0, 3);
        let mut bytes = Vec::new();
        folder.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, folder.len());
        assert_eq!(folder.len(), 11);
        assert_eq!(folder.reserve_data(), &[0x41; 3]);
    }

    #[test]
    fn folder_parse_roundtrip() {
        let mut folder = FolderRecord::new("docs".to_string(), 2, 0);
        folder.data_offset = 0x2c;
        folder.block_count = 5;
        let mut bytes = Vec::new();
        folder.write_to(&mut bytes).unwrap();
        let parsed = FolderRecord::parse(&mut &bytes[..], 0, 2).unwrap();
        assert_eq!(parsed.data_offset(), 0x2c);
        assert_eq!(parsed.block_count(), 5);
        assert_eq!(parsed.compression(), 0);
    }
}
