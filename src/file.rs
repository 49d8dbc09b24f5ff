use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use time::PrimitiveDateTime;

use crate::consts;
use crate::datetime::{datetime_from_bits, datetime_to_bits};
use crate::error::Result;
use crate::string::{
    null_terminated_len, read_null_terminated_string,
    write_null_terminated_string,
};

/// The CFFILE record.
///
/// `folder_index` is the on-disk iFolder word: a plain folder index for a
/// file fully contained in its volume, or a continuation sentinel for a
/// file scattered across volume boundaries.  `folder_slot` is the in-memory
/// arena index of the owning folder within the volume and is never
/// serialized; it stays valid even when `folder_index` holds a sentinel.
#[derive(Clone, Debug)]
pub struct FileRecord {
    pub(crate) total_size: u32,
    pub(crate) folder_offset: u32,
    pub(crate) folder_index: u16,
    pub(crate) date: u16,
    pub(crate) time: u16,
    pub(crate) attributes: u16,
    pub(crate) name: String,
    pub(crate) folder_slot: usize,
}

impl FileRecord {
    /// Creates a record for a file of `total_size` logical bytes owned by
    /// the folder at `folder_slot`.  The timestamp is encoded into MS-DOS
    /// date/time words at construction.
    pub(crate) fn new(
        name: String,
        total_size: u32,
        folder_slot: usize,
        folder_index: u16,
        datetime: PrimitiveDateTime,
    ) -> FileRecord {
        let (date, time) = datetime_to_bits(datetime);
        FileRecord {
            total_size,
            folder_offset: 0,
            folder_index,
            date,
            time,
            attributes: consts::ATTR_ARCH,
            name,
            folder_slot,
        }
    }

    pub(crate) fn parse<R: Read>(reader: &mut R) -> Result<FileRecord> {
        let total_size = reader.read_u32::<LittleEndian>()?;
        let folder_offset = reader.read_u32::<LittleEndian>()?;
        let folder_index = reader.read_u16::<LittleEndian>()?;
        let date = reader.read_u16::<LittleEndian>()?;
        let time = reader.read_u16::<LittleEndian>()?;
        let attributes = reader.read_u16::<LittleEndian>()?;
        let name = read_null_terminated_string(reader)?;
        let folder_slot = if folder_index <= consts::MAX_PLAIN_FOLDER_INDEX {
            folder_index as usize
        } else {
            0
        };
        Ok(FileRecord {
            total_size,
            folder_offset,
            folder_index,
            date,
            time,
            attributes,
            name,
            folder_slot,
        })
    }

    /// Serialized length: the 16 fixed bytes plus the NUL-terminated name.
    pub fn len(&self) -> u64 {
        16 + null_terminated_len(&self.name)
    }

    /// Serializes the record; the output is exactly `len()` bytes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.total_size)?;
        writer.write_u32::<LittleEndian>(self.folder_offset)?;
        writer.write_u16::<LittleEndian>(self.folder_index)?;
        writer.write_u16::<LittleEndian>(self.date)?;
        writer.write_u16::<LittleEndian>(self.time)?;
        writer.write_u16::<LittleEndian>(self.attributes)?;
        write_null_terminated_string(writer, &self.name)?;
        Ok(())
    }

    /// OR-combines a continuation sentinel into the iFolder word: sentinels
    /// accumulate, a plain folder index is replaced outright.
    pub(crate) fn mark_continued(&mut self, sentinel: u16) {
        if self.folder_index > consts::MAX_PLAIN_FOLDER_INDEX {
            self.folder_index |= sentinel;
        } else {
            self.folder_index = sentinel;
        }
    }

    /// The file's name as stored in the record.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uncompressed size of the logical file this record belongs to
    /// (cbFile); a scattered file reports its full size in every volume.
    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Uncompressed offset of this record's payload within its folder
    /// (uoffFolderStart).
    pub fn folder_offset(&self) -> u32 {
        self.folder_offset
    }

    /// The raw iFolder word: plain folder index or continuation sentinel.
    pub fn folder_index(&self) -> u16 {
        self.folder_index
    }

    /// True if this record's payload continues a file begun in the
    /// previous volume.
    pub fn is_continued_from_prev(&self) -> bool {
        self.folder_index & consts::IFOLD_CONTINUED_FROM_PREV
            == consts::IFOLD_CONTINUED_FROM_PREV
    }

    /// True if this record's payload runs on into the next volume.
    pub fn is_continued_to_next(&self) -> bool {
        self.folder_index & consts::IFOLD_CONTINUED_TO_NEXT
            == consts::IFOLD_CONTINUED_TO_NEXT
    }

    /// The raw attribute bitset.
    pub fn attributes(&self) -> u16 {
        self.attributes
    }

    /// True if this file has the "read-only" attribute set.
    pub fn is_read_only(&self) -> bool {
        (self.attributes & consts::ATTR_READ_ONLY) != 0
    }

    /// True if this file has the "hidden" attribute set.
    pub fn is_hidden(&self) -> bool {
        (self.attributes & consts::ATTR_HIDDEN) != 0
    }

    /// True if this file has the "system file" attribute set.
    pub fn is_system(&self) -> bool {
        (self.attributes & consts::ATTR_SYSTEM) != 0
    }

    /// True if the "modified since last backup" attribute is set; it is the
    /// default for records created by the writer.
    pub fn is_archive(&self) -> bool {
        (self.attributes & consts::ATTR_ARCH) != 0
    }

    /// True if this file has the "execute after extraction" attribute set.
    pub fn is_exec(&self) -> bool {
        (self.attributes & consts::ATTR_EXEC) != 0
    }

    /// Decoded timestamp, or `None` if the stored bits are not a valid
    /// date/time.
    pub fn datetime(&self) -> Option<PrimitiveDateTime> {
        datetime_from_bits(self.date, self.time)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::FileRecord;
    use crate::consts;

    fn record() -> FileRecord {
        FileRecord::new(
            "hi.txt".to_string(),
            14,
            0,
            0,
            datetime!(1997-03-12 11:13:52),
        )
    }

    #[test]
    fn file_length_identity() {
        let file = record();
        let mut bytes = Vec::new();
        file.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, file.len());
        assert_eq!(file.len(), 16 + 7);
    }

    #[test]
    fn file_parse_roundtrip() {
        let file = record();
        let mut bytes = Vec::new();
        file.write_to(&mut bytes).unwrap();
        let parsed = FileRecord::parse(&mut &bytes[..]).unwrap();
        assert_eq!(parsed.name(), "hi.txt");
        assert_eq!(parsed.total_size(), 14);
        assert_eq!(parsed.attributes(), consts::ATTR_ARCH);
        assert_eq!(parsed.datetime(), Some(datetime!(1997-03-12 11:13:52)));
    }

    #[test]
    fn sentinels_accumulate_but_plain_indices_are_replaced() {
        let mut file = record();
        file.folder_index = 3;
        file.mark_continued(consts::IFOLD_CONTINUED_TO_NEXT);
        assert_eq!(file.folder_index(), consts::IFOLD_CONTINUED_TO_NEXT);
        file.mark_continued(consts::IFOLD_CONTINUED_FROM_PREV);
        assert_eq!(
            file.folder_index(),
            consts::IFOLD_CONTINUED_PREV_AND_NEXT
        );
        assert!(file.is_continued_from_prev());
        assert!(file.is_continued_to_next());
    }
}
