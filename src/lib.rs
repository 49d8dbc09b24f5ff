//! A library for reading and writing multi-volume [Windows
//! cabinet](https://en.wikipedia.org/wiki/Cabinet_(file_format)) (CAB)
//! sets.
//!
//! The writer packs named folders of input files into a sequence of
//! fixed-capacity cabinet volumes, maintaining every offset, count and
//! continuation flag the format requires; a file larger than one volume is
//! scattered across several, with the volumes linked through their
//! previous/next cabinet names.  Data is stored uncompressed and checksums
//! are emitted as zero.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let mut builder = cabset::SetBuilder::new("out_[x].cab");
//! builder.capacity(1474 * 1024);
//! builder.add_folder("docs").add_path("report.txt");
//! let set = builder.build()?;
//! set.write_to_dir(Path::new("."))?;
//!
//! for file in cabset::extract_set("out_0.cab")? {
//!     println!("{}: {} bytes", file.name(), file.data().len());
//! }
//! # Ok::<(), cabset::CabError>(())
//! ```

#![warn(missing_docs)]

mod cabinet;
mod consts;
mod data;
mod datetime;
mod error;
mod extract;
mod file;
mod folder;
mod header;
mod num;
mod set;
mod string;
mod volume;

pub use crate::cabinet::Cabinet;
pub use crate::data::DataBlock;
pub use crate::error::{CabError, Result};
pub use crate::extract::{extract_set, reassemble, ExtractedFile};
pub use crate::file::FileRecord;
pub use crate::folder::FolderRecord;
pub use crate::header::{Header, ReserveSizes};
pub use crate::set::{CabinetSet, FolderUnit, SetBuilder};
pub use crate::volume::Volume;

/// The record graph every cabinet holder exposes: implemented by the
/// writer's [`Volume`] and the reader's [`Cabinet`], so consumers such as
/// the extractor work on either.
pub trait CabRecords {
    /// The volume header.
    fn header(&self) -> &Header;

    /// Folder records in on-disk order.
    fn folders(&self) -> &[FolderRecord];

    /// File records in on-disk order.
    fn files(&self) -> &[FileRecord];

    /// Data blocks in on-disk order, all folders concatenated.
    fn data_blocks(&self) -> &[DataBlock];
}
