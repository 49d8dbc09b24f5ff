use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::consts;
use crate::error::Result;

/// The CFDATA record: one bounded fragment of folder payload.
///
/// Data is stored uncompressed, so `data_size` and `uncompressed_size` are
/// always equal and the checksum is written as zero.
#[derive(Clone, Debug)]
pub struct DataBlock {
    pub(crate) checksum: u32,
    pub(crate) data_size: u16,
    pub(crate) uncompressed_size: u16,
    pub(crate) reserve_data: Vec<u8>,
    pub(crate) payload: Vec<u8>,
    pub(crate) folder_slot: usize,
}

impl DataBlock {
    /// Creates a block for at most 0x8000 payload bytes owned by the folder
    /// at `folder_slot`.  `reserve_size` is the owning header's per-block
    /// reserve size.
    pub(crate) fn new(
        payload: Vec<u8>,
        folder_slot: usize,
        reserve_size: u8,
    ) -> DataBlock {
        debug_assert!(payload.len() <= consts::MAX_DATA_BLOCK_SIZE);
        let size = payload.len() as u16;
        DataBlock {
            checksum: 0,
            data_size: size,
            uncompressed_size: size,
            reserve_data: vec![consts::RESERVE_FILL; reserve_size as usize],
            payload,
            folder_slot,
        }
    }

    pub(crate) fn parse<R: Read>(
        reader: &mut R,
        reserve_size: u8,
        folder_slot: usize,
    ) -> Result<DataBlock> {
        let checksum = reader.read_u32::<LittleEndian>()?;
        let data_size = reader.read_u16::<LittleEndian>()?;
        let uncompressed_size = reader.read_u16::<LittleEndian>()?;
        let mut reserve_data = vec![0u8; reserve_size as usize];
        if !reserve_data.is_empty() {
            reader.read_exact(&mut reserve_data)?;
        }
        let mut payload = vec![0u8; data_size as usize];
        if !payload.is_empty() {
            reader.read_exact(&mut payload)?;
        }
        Ok(DataBlock {
            checksum,
            data_size,
            uncompressed_size,
            reserve_data,
            payload,
            folder_slot,
        })
    }

    /// Serialized length: the 8 fixed bytes, the reserve area, the payload.
    pub fn len(&self) -> u64 {
        8 + self.reserve_data.len() as u64 + self.payload.len() as u64
    }

    /// Serializes the record; the output is exactly `len()` bytes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.checksum)?;
        writer.write_u16::<LittleEndian>(self.data_size)?;
        writer.write_u16::<LittleEndian>(self.uncompressed_size)?;
        writer.write_all(&self.reserve_data)?;
        writer.write_all(&self.payload)?;
        Ok(())
    }

    /// Number of stored payload bytes (cbData).
    pub fn data_size(&self) -> u16 {
        self.data_size
    }

    /// Number of payload bytes once "decompressed" (cbUncomp); equal to
    /// `data_size` since no compression is applied.
    pub fn uncompressed_size(&self) -> u16 {
        self.uncompressed_size
    }

    /// The per-block application reserve area.
    pub fn reserve_data(&self) -> &[u8] {
        &self.reserve_data
    }

    /// The stored payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
