pub const FILE_SIGNATURE: u32 = 0x4643534d; // "MSCF" stored little-endian

pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 3;

pub const MAX_DATA_BLOCK_SIZE: usize = 0x8000;
pub const MAX_STRING_SIZE: usize = 255;
pub const MAX_NUM_FILES: usize = 0xffff;
// A folder index past 0xfffc would collide with the continuation
// sentinels, so a volume holds at most 0xfffd folders.
pub const MAX_NUM_FOLDERS: usize = MAX_PLAIN_FOLDER_INDEX as usize + 1;

/// Default per-volume payload capacity: one 1.44 MiB floppy.
pub const DEFAULT_VOLUME_CAPACITY: u64 = 1474 * 1024;

/// Filler byte for application reserve areas created by the writer.
pub const RESERVE_FILL: u8 = 0x41;

// Header flags:
pub const FLAG_PREV_CABINET: u16 = 0x1;
pub const FLAG_NEXT_CABINET: u16 = 0x2;
pub const FLAG_RESERVE_PRESENT: u16 = 0x4;

// Disk-name strings written into the header linkage fields.  These are
// format-visible and fixed; callers cannot override them.
pub const DISK_NAME_PREV: &str = "previous";
pub const DISK_NAME_NEXT: &str = "continued";

// iFolder continuation sentinels.  Plain folder indices are 0..=0xfffc.
pub const IFOLD_CONTINUED_FROM_PREV: u16 = 0xfffd;
pub const IFOLD_CONTINUED_TO_NEXT: u16 = 0xfffe;
pub const IFOLD_CONTINUED_PREV_AND_NEXT: u16 = 0xffff;
pub const MAX_PLAIN_FOLDER_INDEX: u16 = 0xfffc;

// Compression type codes (only `none` is ever written):
pub const CTYPE_NONE: u16 = 0;

// File attributes:
pub const ATTR_READ_ONLY: u16 = 0x01;
pub const ATTR_HIDDEN: u16 = 0x02;
pub const ATTR_SYSTEM: u16 = 0x04;
pub const ATTR_ARCH: u16 = 0x20;
pub const ATTR_EXEC: u16 = 0x40;
