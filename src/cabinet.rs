use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::consts;
use crate::data::DataBlock;
use crate::error::{CabError, Result};
use crate::file::FileRecord;
use crate::folder::FolderRecord;
use crate::header::Header;
use crate::CabRecords;

/// Wraps a byte source and tracks how many bytes were consumed, so the
/// declared offsets of the self-referential layout can be checked against
/// the positions actually observed.
struct CountReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> CountReader<R> {
    fn new(inner: R) -> CountReader<R> {
        CountReader { inner, position: 0 }
    }

    fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read> Read for CountReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.position += count as u64;
        Ok(count)
    }
}

/// A cabinet volume parsed from a byte stream into its record graph.
pub struct Cabinet {
    header: Header,
    folders: Vec<FolderRecord>,
    files: Vec<FileRecord>,
    blocks: Vec<DataBlock>,
}

impl Cabinet {
    /// Parses one whole cabinet: header (with its flag-gated optional
    /// groups), folder records, file records, then every folder's data
    /// blocks in sequence.  Declared offsets and sizes must match the
    /// observed positions.
    pub fn parse<R: Read>(reader: R) -> Result<Cabinet> {
        let mut reader = CountReader::new(reader);
        let header = Header::parse(&mut reader)?;
        let reserve_sizes = header.reserve_sizes();

        let mut folders =
            Vec::with_capacity(header.num_folders() as usize);
        for folder_id in 0..header.num_folders() {
            folders.push(FolderRecord::parse(
                &mut reader,
                reserve_sizes.folder,
                folder_id,
            )?);
        }

        if header.first_file_offset() as u64 != reader.position() {
            return Err(CabError::InvalidLayout {
                field: "coffFiles",
                declared: header.first_file_offset() as u64,
                observed: reader.position(),
            });
        }
        let mut files = Vec::with_capacity(header.num_files() as usize);
        for _ in 0..header.num_files() {
            let file = FileRecord::parse(&mut reader)?;
            if file.folder_index() <= consts::MAX_PLAIN_FOLDER_INDEX
                && file.folder_index() as usize >= folders.len()
            {
                return Err(CabError::InvalidLayout {
                    field: "iFolder",
                    declared: file.folder_index() as u64,
                    observed: folders.len() as u64,
                });
            }
            files.push(file);
        }

        let mut blocks = Vec::new();
        for (slot, folder) in folders.iter().enumerate() {
            if folder.data_offset() as u64 != reader.position() {
                return Err(CabError::InvalidLayout {
                    field: "coffCabStart",
                    declared: folder.data_offset() as u64,
                    observed: reader.position(),
                });
            }
            for _ in 0..folder.block_count() {
                blocks.push(DataBlock::parse(
                    &mut reader,
                    reserve_sizes.data,
                    slot,
                )?);
            }
        }

        if header.total_size() as u64 != reader.position() {
            return Err(CabError::InvalidLayout {
                field: "cbCabinet",
                declared: header.total_size() as u64,
                observed: reader.position(),
            });
        }
        Ok(Cabinet { header, folders, files, blocks })
    }

    /// Opens and parses a cabinet file on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Cabinet> {
        Cabinet::parse(BufReader::new(File::open(path)?))
    }
}

impl CabRecords for Cabinet {
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

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::Cabinet;
    use crate::error::CabError;
    use crate::header::ReserveSizes;
    use crate::volume::Volume;
    use crate::CabRecords;

    #[test]
    fn parse_cabinet_with_one_file() {
        let binary: &[u8] = b"MSCF\0\0\0\0\x59\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\0\0\0\0\
            \x43\0\0\0\x01\0\0\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xba\x59\x20\0hi.txt\0\
            \0\0\0\0\x0e\0\x0e\0Hello, world!\n";
        assert_eq!(binary.len(), 0x59);
        let cabinet = Cabinet::parse(binary).unwrap();
        assert_eq!(cabinet.header().total_size(), 0x59);
        assert_eq!(cabinet.header().num_folders(), 1);
        assert_eq!(cabinet.header().num_files(), 1);
        assert_eq!(cabinet.folders()[0].data_offset(), 0x43);
        assert_eq!(cabinet.folders()[0].block_count(), 1);

        let file = &cabinet.files()[0];
        assert_eq!(file.name(), "hi.txt");
        assert_eq!(file.total_size(), 14);
        assert_eq!(file.datetime(), Some(datetime!(1997-03-12 11:13:52)));
        assert_eq!(cabinet.data_blocks()[0].payload(), b"Hello, world!\n");
    }

    #[test]
    fn parse_rejects_mismatched_file_offset() {
        let mut binary = b"MSCF\0\0\0\0\x59\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\0\0\0\0\
            \x43\0\0\0\x01\0\0\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xba\x59\x20\0hi.txt\0\
            \0\0\0\0\x0e\0\x0e\0Hello, world!\n"
            .to_vec();
        binary[16] = 0x2d; // corrupt coffFiles
        match Cabinet::parse(binary.as_slice()) {
            Err(CabError::InvalidLayout { field, declared, observed }) => {
                assert_eq!(field, "coffFiles");
                assert_eq!(declared, 0x2d);
                assert_eq!(observed, 0x2c);
            }
            other => panic!("expected layout error, got {:?}", other.err()),
        }
    }

    #[test]
    fn parse_what_the_writer_serialized() {
        let mut volume = Volume::new(
            "out_0.cab",
            1024,
            0,
            ReserveSizes { header: 5, folder: 3, data: 2 },
        );
        volume.set_timestamp(datetime!(2020-05-06 07:08:10));
        volume.add_file("a", "a.txt", 4, b"aaaa").unwrap();
        volume.add_file("b", "b.txt", 6, b"bbbbbb").unwrap();

        let bytes = volume.to_bytes().unwrap();
        let cabinet = Cabinet::parse(bytes.as_slice()).unwrap();
        assert_eq!(cabinet.header().total_size() as usize, bytes.len());
        assert_eq!(cabinet.header().num_folders(), 2);
        assert_eq!(cabinet.header().num_files(), 2);
        assert_eq!(cabinet.header().reserve_data(), &[0x41; 5]);
        for folder in cabinet.folders() {
            assert_eq!(folder.reserve_data(), &[0x41; 3]);
        }
        for block in cabinet.data_blocks() {
            assert_eq!(block.reserve_data(), &[0x41; 2]);
        }
        let names: Vec<&str> =
            cabinet.files().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
    }
}
