use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::consts;
use crate::error::{CabError, Result};
use crate::string::{
    null_terminated_len, read_null_terminated_string,
    write_null_terminated_string,
};

/// Sizes of the application-defined reserve areas, as declared in the
/// header's optional triple.  Either all three are zero (no
/// `RESERVE_PRESENT` flag) or the flag is set and these are the declared
/// sizes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReserveSizes {
    /// Per-cabinet reserve size (cbCFHeader).
    pub header: u16,
    /// Per-folder reserve size (cbCFFolder).
    pub folder: u8,
    /// Per-datablock reserve size (cbCFData).
    pub data: u8,
}

impl ReserveSizes {
    /// True if any of the three sizes is non-zero.
    pub fn any(&self) -> bool {
        self.header != 0 || self.folder != 0 || self.data != 0
    }
}

/// The CFHEADER record: one per volume.
#[derive(Clone, Debug)]
pub struct Header {
    pub(crate) reserved1: u32,
    pub(crate) total_size: u32,
    pub(crate) reserved2: u32,
    pub(crate) first_file_offset: u32,
    pub(crate) reserved3: u32,
    pub(crate) version_minor: u8,
    pub(crate) version_major: u8,
    pub(crate) num_folders: u16,
    pub(crate) num_files: u16,
    pub(crate) flags: u16,
    pub(crate) set_id: u16,
    pub(crate) cabinet_index: u16,
    pub(crate) reserve_sizes: ReserveSizes,
    pub(crate) reserve_data: Vec<u8>,
    pub(crate) prev_cabinet: Option<(String, String)>,
    pub(crate) next_cabinet: Option<(String, String)>,
}

impl Header {
    /// Creates a header for a new volume.  Non-zero reserve sizes set the
    /// `RESERVE_PRESENT` flag and pre-fill the header reserve area with the
    /// filler byte.
    pub fn new(cabinet_index: u16, reserve_sizes: ReserveSizes) -> Header {
        let flags =
            if reserve_sizes.any() { consts::FLAG_RESERVE_PRESENT } else { 0 };
        let reserve_data = if flags != 0 {
            vec![consts::RESERVE_FILL; reserve_sizes.header as usize]
        } else {
            Vec::new()
        };
        Header {
            reserved1: 0,
            total_size: 0,
            reserved2: 0,
            first_file_offset: 0,
            reserved3: 0,
            version_minor: consts::VERSION_MINOR,
            version_major: consts::VERSION_MAJOR,
            num_folders: 0,
            num_files: 0,
            flags,
            set_id: 0,
            cabinet_index,
            reserve_sizes,
            reserve_data,
            prev_cabinet: None,
            next_cabinet: None,
        }
    }

    /// Parses a header from the start of a cabinet byte stream.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Header> {
        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != consts::FILE_SIGNATURE {
            return Err(CabError::InvalidMagic);
        }
        let reserved1 = reader.read_u32::<LittleEndian>()?;
        let total_size = reader.read_u32::<LittleEndian>()?;
        let reserved2 = reader.read_u32::<LittleEndian>()?;
        let first_file_offset = reader.read_u32::<LittleEndian>()?;
        let reserved3 = reader.read_u32::<LittleEndian>()?;
        let version_minor = reader.read_u8()?;
        let version_major = reader.read_u8()?;
        if version_major > consts::VERSION_MAJOR
            || version_major == consts::VERSION_MAJOR
                && version_minor > consts::VERSION_MINOR
        {
            return Err(CabError::InvalidLayout {
                field: "versionMajor",
                declared: ((version_major as u64) << 8)
                    | version_minor as u64,
                observed: ((consts::VERSION_MAJOR as u64) << 8)
                    | consts::VERSION_MINOR as u64,
            });
        }
        let num_folders = reader.read_u16::<LittleEndian>()?;
        let num_files = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u16::<LittleEndian>()?;
        let set_id = reader.read_u16::<LittleEndian>()?;
        let cabinet_index = reader.read_u16::<LittleEndian>()?;
        let mut reserve_sizes = ReserveSizes::default();
        if (flags & consts::FLAG_RESERVE_PRESENT) != 0 {
            reserve_sizes.header = reader.read_u16::<LittleEndian>()?;
            reserve_sizes.folder = reader.read_u8()?;
            reserve_sizes.data = reader.read_u8()?;
        }
        let mut reserve_data = vec![0u8; reserve_sizes.header as usize];
        if !reserve_data.is_empty() {
            reader.read_exact(&mut reserve_data)?;
        }
        let prev_cabinet = if (flags & consts::FLAG_PREV_CABINET) != 0 {
            let cab_name = read_null_terminated_string(reader)?;
            let disk_name = read_null_terminated_string(reader)?;
            Some((cab_name, disk_name))
        } else {
            None
        };
        let next_cabinet = if (flags & consts::FLAG_NEXT_CABINET) != 0 {
            let cab_name = read_null_terminated_string(reader)?;
            let disk_name = read_null_terminated_string(reader)?;
            Some((cab_name, disk_name))
        } else {
            None
        };
        Ok(Header {
            reserved1,
            total_size,
            reserved2,
            first_file_offset,
            reserved3,
            version_minor,
            version_major,
            num_folders,
            num_files,
            flags,
            set_id,
            cabinet_index,
            reserve_sizes,
            reserve_data,
            prev_cabinet,
            next_cabinet,
        })
    }

    /// Serialized length in bytes, including whichever optional groups the
    /// flags declare.
    pub fn len(&self) -> u64 {
        let mut length = 36;
        if (self.flags & consts::FLAG_RESERVE_PRESENT) != 0 {
            length += 4 + self.reserve_data.len() as u64;
        }
        if let Some((ref cab_name, ref disk_name)) = self.prev_cabinet {
            length += null_terminated_len(cab_name);
            length += null_terminated_len(disk_name);
        }
        if let Some((ref cab_name, ref disk_name)) = self.next_cabinet {
            length += null_terminated_len(cab_name);
            length += null_terminated_len(disk_name);
        }
        length
    }

    /// Serializes the header; the output is exactly [`Header::len`] bytes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(consts::FILE_SIGNATURE)?;
        writer.write_u32::<LittleEndian>(self.reserved1)?;
        writer.write_u32::<LittleEndian>(self.total_size)?;
        writer.write_u32::<LittleEndian>(self.reserved2)?;
        writer.write_u32::<LittleEndian>(self.first_file_offset)?;
        writer.write_u32::<LittleEndian>(self.reserved3)?;
        writer.write_u8(self.version_minor)?;
        writer.write_u8(self.version_major)?;
        writer.write_u16::<LittleEndian>(self.num_folders)?;
        writer.write_u16::<LittleEndian>(self.num_files)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.set_id)?;
        writer.write_u16::<LittleEndian>(self.cabinet_index)?;
        if (self.flags & consts::FLAG_RESERVE_PRESENT) != 0 {
            writer.write_u16::<LittleEndian>(self.reserve_sizes.header)?;
            writer.write_u8(self.reserve_sizes.folder)?;
            writer.write_u8(self.reserve_sizes.data)?;
            writer.write_all(&self.reserve_data)?;
        }
        if let Some((ref cab_name, ref disk_name)) = self.prev_cabinet {
            write_null_terminated_string(writer, cab_name)?;
            write_null_terminated_string(writer, disk_name)?;
        }
        if let Some((ref cab_name, ref disk_name)) = self.next_cabinet {
            write_null_terminated_string(writer, cab_name)?;
            write_null_terminated_string(writer, disk_name)?;
        }
        Ok(())
    }

    /// Marks this volume as having a successor named `cab_filename`.  The
    /// disk name is the fixed `"continued"` literal.
    pub(crate) fn set_next_cabinet(&mut self, cab_filename: &str) {
        self.flags |= consts::FLAG_NEXT_CABINET;
        self.next_cabinet = Some((
            cab_filename.to_string(),
            consts::DISK_NAME_NEXT.to_string(),
        ));
    }

    /// Marks this volume as having a predecessor named `cab_filename`.  The
    /// disk name is the fixed `"previous"` literal.
    pub(crate) fn set_prev_cabinet(&mut self, cab_filename: &str) {
        self.flags |= consts::FLAG_PREV_CABINET;
        self.prev_cabinet = Some((
            cab_filename.to_string(),
            consts::DISK_NAME_PREV.to_string(),
        ));
    }

    /// True if this volume has a successor in its set.
    pub fn has_next_cabinet(&self) -> bool {
        (self.flags & consts::FLAG_NEXT_CABINET) != 0
    }

    /// True if this volume has a predecessor in its set.
    pub fn has_prev_cabinet(&self) -> bool {
        (self.flags & consts::FLAG_PREV_CABINET) != 0
    }

    /// Total serialized size of the volume (cbCabinet).
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Absolute offset of the first file record (coffFiles).
    pub fn first_file_offset(&self) -> u32 {
        self.first_file_offset
    }

    /// Number of folder records in the volume (cFolders).
    pub fn num_folders(&self) -> u16 {
        self.num_folders
    }

    /// Number of file records in the volume (cFiles).
    pub fn num_files(&self) -> u16 {
        self.num_files
    }

    /// The raw option-flags bitset.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// The identifier shared by every volume of one set.
    pub fn cabinet_set_id(&self) -> u16 {
        self.set_id
    }

    /// This volume's zero-based index within its set.
    pub fn cabinet_index(&self) -> u16 {
        self.cabinet_index
    }

    /// The declared reserve-area sizes (all zero when the flag is clear).
    pub fn reserve_sizes(&self) -> ReserveSizes {
        self.reserve_sizes
    }

    /// The per-cabinet application reserve area.
    pub fn reserve_data(&self) -> &[u8] {
        &self.reserve_data
    }

    /// `(szCabinetPrev, szDiskPrev)` when `PREV_CABINET` is set.
    pub fn prev_cabinet(&self) -> Option<(&str, &str)> {
        self.prev_cabinet
            .as_ref()
            .map(|(cab, disk)| (cab.as_str(), disk.as_str()))
    }

    /// `(szCabinetNext, szDiskNext)` when `NEXT_CABINET` is set.
    pub fn next_cabinet(&self) -> Option<(&str, &str)> {
        self.next_cabinet
            .as_ref()
            .map(|(cab, disk)| (cab.as_str(), disk.as_str()))
    }
}
