use std::io::Write;

use time::{OffsetDateTime, PrimitiveDateTime};

use crate::consts;
use crate::data::DataBlock;
use crate::error::{CabError, Result};
use crate::file::FileRecord;
use crate::folder::FolderRecord;
use crate::header::{Header, ReserveSizes};
use crate::num;
use crate::CabRecords;

/// One cabinet volume being built in memory.
///
/// The volume owns its header and its folder/file/data-block lists; files
/// and blocks reference their folder by arena index (`folder_slot`).  Every
/// mutation ends in an offset-recomputation pass, so the derived header and
/// folder fields are consistent at every externally visible state.
pub struct Volume {
    cab_filename: String,
    capacity: u64,
    payload_bytes: u64,
    header: Header,
    folders: Vec<FolderRecord>,
    files: Vec<FileRecord>,
    blocks: Vec<DataBlock>,
    next_folder_id: u16,
    timestamp: Option<PrimitiveDateTime>,
}

impl Volume {
    /// Creates an empty volume.  `capacity` bounds the sum of data-block
    /// payload bytes (not the serialized volume size); non-zero reserve
    /// sizes set `RESERVE_PRESENT` and pre-fill the reserve areas.
    pub fn new<S: Into<String>>(
        cab_filename: S,
        capacity: u64,
        index_in_set: u16,
        reserve_sizes: ReserveSizes,
    ) -> Volume {
        Volume {
            cab_filename: cab_filename.into(),
            capacity,
            payload_bytes: 0,
            header: Header::new(index_in_set, reserve_sizes),
            folders: Vec::new(),
            files: Vec::new(),
            blocks: Vec::new(),
            next_folder_id: 0,
            timestamp: None,
        }
    }

    /// Sets the identifier shared by all volumes of the set.
    pub fn set_cabinet_set_id(&mut self, set_id: u16) {
        self.header.set_id = set_id;
    }

    /// Fixes the timestamp stamped onto file records added from now on.  By
    /// default each record captures the current UTC wall clock at
    /// construction.
    pub fn set_timestamp(&mut self, datetime: PrimitiveDateTime) {
        self.timestamp = Some(datetime);
    }

    /// The cab filename this volume will be flushed to.
    pub fn cab_filename(&self) -> &str {
        &self.cab_filename
    }

    /// Payload bytes still accepted before the volume is full.
    pub fn remaining(&self) -> u64 {
        self.capacity - self.payload_bytes
    }

    /// Sum of data-block payload bytes stored so far.
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    /// Adds one file record whose payload is `payload` to the folder named
    /// `folder_name`, creating the folder if absent.  The payload is split
    /// into data blocks of at most 0x8000 bytes (an empty payload still
    /// yields one empty block).  Fails with `CapacityExceeded` when the
    /// volume cannot take the payload; the set builder handles that by
    /// retrying on a fresh volume.
    pub fn add_file(
        &mut self,
        folder_name: &str,
        file_name: &str,
        total_size: u64,
        payload: &[u8],
    ) -> Result<()> {
        if self.payload_bytes == self.capacity
            || self.payload_bytes + payload.len() as u64 > self.capacity
        {
            return Err(CabError::CapacityExceeded {
                requested: payload.len() as u64,
                remaining: self.remaining(),
                capacity: self.capacity,
            });
        }
        if self.files.len() >= consts::MAX_NUM_FILES {
            return Err(CabError::Overflow {
                field: "cFiles",
                value: self.files.len() as u64 + 1,
            });
        }

        let slot = self.folder_slot_for(folder_name)?;
        let folder_index = num::word("iFolder", slot)?;
        let datetime = self.timestamp.unwrap_or_else(now_utc);
        self.files.push(FileRecord::new(
            file_name.to_string(),
            num::dword("cbFile", total_size)?,
            slot,
            folder_index,
            datetime,
        ));

        let data_reserve = self.header.reserve_sizes.data;
        let mut added_blocks = 0usize;
        if payload.is_empty() {
            self.blocks.push(DataBlock::new(Vec::new(), slot, data_reserve));
            added_blocks += 1;
        } else {
            for chunk in payload.chunks(consts::MAX_DATA_BLOCK_SIZE) {
                self.blocks.push(DataBlock::new(
                    chunk.to_vec(),
                    slot,
                    data_reserve,
                ));
                added_blocks += 1;
            }
        }
        let block_count =
            self.folders[slot].block_count as usize + added_blocks;
        self.folders[slot].block_count = num::word("cCFData", block_count)?;

        self.payload_bytes += payload.len() as u64;
        self.recompute_offsets()
    }

    /// Resolves the folder a new file lands in.  An existing folder whose
    /// most recent file continues from the previous volume must not take
    /// another file: the continuation sentinel occupies the tail's iFolder
    /// word and a following sibling would be mis-identified by consumers.
    /// In that case the tail's folder is set aside under a synthesized name
    /// and a fresh folder takes over the caller-visible name, so later
    /// files for the same name keep landing in the fresh folder.
    fn folder_slot_for(&mut self, folder_name: &str) -> Result<usize> {
        match self.folders.iter().position(|f| f.name == folder_name) {
            Some(slot) => {
                let tail_continued = self
                    .files
                    .iter()
                    .rev()
                    .find(|f| f.folder_slot == slot)
                    .is_some_and(FileRecord::is_continued_from_prev);
                if !tail_continued {
                    return Ok(slot);
                }
                let set_aside =
                    format!("~{}", self.folders[slot].folder_id);
                self.folders[slot].name = set_aside;
                self.create_folder(folder_name)
            }
            None => self.create_folder(folder_name),
        }
    }

    fn create_folder(&mut self, name: &str) -> Result<usize> {
        if self.folders.len() >= consts::MAX_NUM_FOLDERS {
            return Err(CabError::Overflow {
                field: "cFolders",
                value: self.folders.len() as u64 + 1,
            });
        }
        let folder_id = self.next_folder_id;
        self.next_folder_id = self.next_folder_id.wrapping_add(1);
        self.folders.push(FolderRecord::new(
            name.to_string(),
            folder_id,
            self.header.reserve_sizes.folder,
        ));
        Ok(self.folders.len() - 1)
    }

    /// Recomputes every derived offset and count:
    ///
    /// 1. per-folder uoffFolderStart prefix sums over cbFile;
    /// 2. coffCabStart per folder (first folder starts after the file
    ///    records, each next one after the previous folder's blocks);
    /// 3. cFolders/cFiles and coffFiles;
    /// 4. cbCabinet, the full serialized length.
    pub(crate) fn recompute_offsets(&mut self) -> Result<()> {
        for slot in 0..self.folders.len() {
            let mut offset: u64 = 0;
            for file in
                self.files.iter_mut().filter(|f| f.folder_slot == slot)
            {
                file.folder_offset = num::dword("uoffFolderStart", offset)?;
                offset += file.total_size as u64;
            }
        }

        let header_len = self.header.len();
        let folders_len: u64 =
            self.folders.iter().map(FolderRecord::len).sum();
        let files_len: u64 = self.files.iter().map(FileRecord::len).sum();
        let mut data_start = header_len + folders_len + files_len;
        for slot in 0..self.folders.len() {
            self.folders[slot].data_offset =
                num::dword("coffCabStart", data_start)?;
            data_start += self
                .blocks
                .iter()
                .filter(|b| b.folder_slot == slot)
                .map(DataBlock::len)
                .sum::<u64>();
        }

        self.header.num_folders = num::word("cFolders", self.folders.len())?;
        self.header.num_files = num::word("cFiles", self.files.len())?;
        self.header.first_file_offset =
            num::dword("coffFiles", header_len + folders_len)?;
        self.header.total_size = num::dword("cbCabinet", self.len())?;
        Ok(())
    }

    /// Full serialized length of the volume.
    pub fn len(&self) -> u64 {
        self.header.len()
            + self.folders.iter().map(FolderRecord::len).sum::<u64>()
            + self.files.iter().map(FileRecord::len).sum::<u64>()
            + self.blocks.iter().map(DataBlock::len).sum::<u64>()
    }

    /// Serializes the volume: header, folder records, file records, then
    /// each folder's data blocks in folder order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.header.write_to(writer)?;
        for folder in &self.folders {
            folder.write_to(writer)?;
        }
        for file in &self.files {
            file.write_to(writer)?;
        }
        for slot in 0..self.folders.len() {
            for block in self.blocks.iter().filter(|b| b.folder_slot == slot)
            {
                block.write_to(writer)?;
            }
        }
        Ok(())
    }

    /// Serializes the volume into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.len() as usize);
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    pub(crate) fn set_next_cabinet(&mut self, cab_filename: &str) {
        self.header.set_next_cabinet(cab_filename);
    }

    pub(crate) fn set_prev_cabinet(&mut self, cab_filename: &str) {
        self.header.set_prev_cabinet(cab_filename);
    }

    /// Marks the most recent record named `file_name` as continuing into
    /// the next volume.
    pub(crate) fn mark_continued_to_next(&mut self, file_name: &str) {
        if let Some(file) =
            self.files.iter_mut().rev().find(|f| f.name == file_name)
        {
            file.mark_continued(consts::IFOLD_CONTINUED_TO_NEXT);
        }
    }

    /// Marks the most recent record named `file_name` as continuing from
    /// the previous volume.
    pub(crate) fn mark_continued_from_prev(&mut self, file_name: &str) {
        if let Some(file) =
            self.files.iter_mut().rev().find(|f| f.name == file_name)
        {
            file.mark_continued(consts::IFOLD_CONTINUED_FROM_PREV);
        }
    }

    /// True if a record named `file_name` lives in a folder named
    /// `folder_name` in this volume.
    pub(crate) fn contains_file(
        &self,
        folder_name: &str,
        file_name: &str,
    ) -> bool {
        self.files.iter().any(|f| {
            f.name == file_name
                && self.folders[f.folder_slot].name == folder_name
        })
    }
}

impl CabRecords for Volume {
    fn header(&self) -> &Header {
        &self.header
    }

    fn folders(&self) -> &[FolderRecord] {
        &self.folders
    }

    fn files(&self) -> &[FileRecord] {
        &self.files
    }

    fn data_blocks(&self) -> &[DataBlock] {
        &self.blocks
    }
}

fn now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}
