use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace};
use time::PrimitiveDateTime;

use crate::consts;
use crate::error::{CabError, Result};
use crate::header::ReserveSizes;
use crate::num;
use crate::volume::Volume;
use crate::CabRecords;

/// Token in the output-name template replaced by the volume index.
const INDEX_TOKEN: &str = "[x]";

enum FileSource {
    Path(PathBuf),
    Memory { name: String, data: Vec<u8> },
}

impl FileSource {
    /// Opens the source, yielding its basename, total byte size and a
    /// forward-only reader.
    fn open(&self) -> Result<(String, u64, Box<dyn Read>)> {
        match self {
            FileSource::Path(path) => {
                let file = File::open(path)?;
                let total_size = file.metadata()?.len();
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok((name, total_size, Box::new(file)))
            }
            FileSource::Memory { name, data } => Ok((
                name.clone(),
                data.len() as u64,
                Box::new(Cursor::new(data.clone())),
            )),
        }
    }
}

/// One named folder of input files, packed in insertion order.
///
/// A folder in the CAB sense groups files over a shared run of data
/// blocks; it is not a filesystem directory.
pub struct FolderUnit {
    name: String,
    sources: Vec<FileSource>,
}

impl FolderUnit {
    /// Creates an empty folder unit.
    pub fn new<S: Into<String>>(name: S) -> FolderUnit {
        FolderUnit { name: name.into(), sources: Vec::new() }
    }

    /// Queues a file on disk; it is opened lazily when the set is built and
    /// enters the archive under its basename.
    pub fn add_path<P: Into<PathBuf>>(&mut self, path: P) -> &mut FolderUnit {
        self.sources.push(FileSource::Path(path.into()));
        self
    }

    /// Queues an in-memory file under the given name.
    pub fn add_bytes<S: Into<String>>(
        &mut self,
        name: S,
        data: Vec<u8>,
    ) -> &mut FolderUnit {
        self.sources.push(FileSource::Memory { name: name.into(), data });
        self
    }

    /// The folder's display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A structure for building a new cabinet set.
///
/// Input files are streamed through fixed-capacity volumes in order; when a
/// volume fills mid-file, the remainder continues in a fresh volume and the
/// inter-volume linkage (header flags, cabinet names, continuation
/// sentinels) is rewired as the set grows.
pub struct SetBuilder {
    output_template: String,
    capacity: u64,
    reserve_sizes: ReserveSizes,
    set_id: u16,
    timestamp: Option<PrimitiveDateTime>,
    folders: Vec<FolderUnit>,
}

impl SetBuilder {
    /// Creates a builder.  `output_template` must contain the literal token
    /// `[x]`, replaced by the 0-based volume index to form each volume's
    /// cab filename.
    pub fn new<S: Into<String>>(output_template: S) -> SetBuilder {
        SetBuilder {
            output_template: output_template.into(),
            capacity: consts::DEFAULT_VOLUME_CAPACITY,
            reserve_sizes: ReserveSizes::default(),
            set_id: 0,
            timestamp: None,
            folders: Vec::new(),
        }
    }

    /// Sets the per-volume payload capacity in bytes.  The default matches
    /// a 1.44 MiB floppy.
    pub fn capacity(&mut self, capacity: u64) -> &mut SetBuilder {
        self.capacity = capacity;
        self
    }

    /// Sets the application reserve-area sizes stamped into every volume.
    pub fn reserve_sizes(&mut self, sizes: ReserveSizes) -> &mut SetBuilder {
        self.reserve_sizes = sizes;
        self
    }

    /// Sets the identifier shared by all volumes of the set.
    pub fn cabinet_set_id(&mut self, set_id: u16) -> &mut SetBuilder {
        self.set_id = set_id;
        self
    }

    /// Fixes the timestamp stamped onto every file record, instead of the
    /// wall clock captured at record construction.
    pub fn timestamp(&mut self, datetime: PrimitiveDateTime) -> &mut SetBuilder {
        self.timestamp = Some(datetime);
        self
    }

    /// Adds a new folder unit.  Use the returned `FolderUnit` to queue the
    /// folder's input files.
    pub fn add_folder<S: Into<String>>(&mut self, name: S) -> &mut FolderUnit {
        self.folders.push(FolderUnit::new(name));
        self.folders.last_mut().unwrap()
    }

    /// Runs the pack: pulls bytes from every input file in order, hands the
    /// largest chunk that fits to the current volume, and opens new volumes
    /// on overflow.  Volumes are buffered in memory; nothing touches disk
    /// until [`CabinetSet::write_to_dir`].
    pub fn build(self) -> Result<CabinetSet> {
        let mut volumes: Vec<Volume> = Vec::new();
        for unit in &self.folders {
            for source in &unit.sources {
                let (file_name, total_size, mut reader) = source.open()?;
                let mut consumed: u64 = 0;
                let mut finished = false;
                while !finished {
                    let index = match volumes
                        .iter()
                        .position(|volume| volume.remaining() > 0)
                    {
                        Some(index) => index,
                        None => {
                            volumes.push(self.new_volume(volumes.len())?);
                            volumes.len() - 1
                        }
                    };

                    let mut chunk = Vec::new();
                    reader
                        .by_ref()
                        .take(volumes[index].remaining())
                        .read_to_end(&mut chunk)?;
                    let first_chunk = consumed == 0;
                    consumed += chunk.len() as u64;
                    finished = consumed >= total_size;
                    if !finished && chunk.is_empty() {
                        return Err(CabError::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            format!(
                                "{} ended after {} of {} bytes",
                                file_name, consumed, total_size
                            ),
                        )));
                    }

                    let added = match volumes[index].add_file(
                        &unit.name,
                        &file_name,
                        total_size,
                        &chunk,
                    ) {
                        Err(CabError::CapacityExceeded { .. }) => {
                            // Retry the same chunk on a fresh volume; a
                            // second refusal means the chunk itself exceeds
                            // the configured capacity.
                            volumes.push(self.new_volume(volumes.len())?);
                            let index = volumes.len() - 1;
                            volumes[index].add_file(
                                &unit.name,
                                &file_name,
                                total_size,
                                &chunk,
                            )?;
                            index
                        }
                        result => {
                            result?;
                            index
                        }
                    };
                    fix_linkage(
                        &mut volumes,
                        added,
                        &unit.name,
                        &file_name,
                        !first_chunk,
                    )?;
                }
            }
        }
        Ok(CabinetSet { volumes })
    }

    fn new_volume(&self, index: usize) -> Result<Volume> {
        let cab_filename =
            self.output_template.replace(INDEX_TOKEN, &index.to_string());
        let index_in_set = num::word("iCabinet", index)?;
        debug!("opening volume {} ({})", index, cab_filename);
        let mut volume = Volume::new(
            cab_filename,
            self.capacity,
            index_in_set,
            self.reserve_sizes,
        );
        volume.set_cabinet_set_id(self.set_id);
        if let Some(datetime) = self.timestamp {
            volume.set_timestamp(datetime);
        }
        Ok(volume)
    }
}

/// Rewires inter-volume linkage after a record landed in `volumes[index]`.
///
/// The predecessor volume learns its successor's cab filename once and, if
/// the record is an actual continuation (`continued`), its matching record
/// is marked as running into the next volume.  The current volume learns
/// its predecessor once; `szCabinetPrev` names the earliest volume holding
/// this file in this folder (the volume of the first split fragment),
/// falling back to the immediate predecessor when the file only starts
/// here.  Sentinels are only applied for real continuations, so a file that
/// merely opens a fresh volume is never marked as continued.
fn fix_linkage(
    volumes: &mut [Volume],
    index: usize,
    folder_name: &str,
    file_name: &str,
    continued: bool,
) -> Result<()> {
    if index == 0 || volumes.len() < 2 {
        return Ok(());
    }
    let current_name = volumes[index].cab_filename().to_string();

    let prev = &mut volumes[index - 1];
    if !prev.header().has_next_cabinet() {
        trace!("{} continues into {}", prev.cab_filename(), current_name);
        prev.set_next_cabinet(&current_name);
    }
    if continued {
        prev.mark_continued_to_next(file_name);
    }
    // The header grew by the linkage strings, so offsets shift.
    prev.recompute_offsets()?;

    if !volumes[index].header().has_prev_cabinet() {
        let source_name = volumes[..index]
            .iter()
            .find(|volume| volume.contains_file(folder_name, file_name))
            .map(|volume| volume.cab_filename().to_string())
            .unwrap_or_else(|| volumes[index - 1].cab_filename().to_string());
        volumes[index].set_prev_cabinet(&source_name);
    }
    if continued {
        volumes[index].mark_continued_from_prev(file_name);
    }
    volumes[index].recompute_offsets()
}

/// A finished, immutable sequence of volumes carrying one logical
/// collection of files.
pub struct CabinetSet {
    volumes: Vec<Volume>,
}

impl CabinetSet {
    /// The volumes in set order.
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Consumes the set, yielding its volumes.
    pub fn into_volumes(self) -> Vec<Volume> {
        self.volumes
    }

    /// Flushes every volume to `<dir>/<cab_filename>`.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        for volume in &self.volumes {
            let path = dir.as_ref().join(volume.cab_filename());
            debug!("flushing {}", path.display());
            let mut writer = BufWriter::new(File::create(&path)?);
            volume.write_to(&mut writer)?;
            writer.flush()?;
        }
        Ok(())
    }
}
