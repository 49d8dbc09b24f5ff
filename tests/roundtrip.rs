use time::macros::datetime;

use cabset::{
    extract_set, reassemble, CabRecords, Cabinet, CabinetSet, ReserveSizes,
    SetBuilder,
};

// ========================================================================= //

const CONTINUED_TO_NEXT: u16 = 0xfffe;
const CONTINUED_PREV_AND_NEXT: u16 = 0xffff;

fn builder(capacity: u64) -> SetBuilder {
    let mut builder = SetBuilder::new("out_[x].cab");
    builder.capacity(capacity).timestamp(datetime!(2021-09-08 07:06:04));
    builder
}

fn parse_volumes(set: &CabinetSet) -> Vec<Cabinet> {
    set.volumes()
        .iter()
        .map(|volume| {
            let bytes = volume.to_bytes().unwrap();
            // Serialized-length identity for the whole volume.
            assert_eq!(bytes.len() as u64, volume.len());
            assert_eq!(bytes.len() as u64, volume.header().total_size() as u64);
            Cabinet::parse(bytes.as_slice()).unwrap()
        })
        .collect()
}

// ========================================================================= //

#[test]
fn single_volume_with_one_small_file() {
    let mut builder = builder(1474 * 1024);
    builder.add_folder("n").add_bytes("digits.bin", b"0123456789".to_vec());
    let set = builder.build().unwrap();
    assert_eq!(set.volumes().len(), 1);

    let volume = &set.volumes()[0];
    let header = volume.header();
    assert_eq!(header.cabinet_index(), 0);
    assert_eq!(header.num_folders(), 1);
    assert_eq!(header.num_files(), 1);
    assert!(!header.has_prev_cabinet());
    assert!(!header.has_next_cabinet());
    assert_eq!(volume.data_blocks().len(), 1);
    assert_eq!(volume.data_blocks()[0].data_size(), 10);
    assert_eq!(volume.data_blocks()[0].uncompressed_size(), 10);
    assert_eq!(volume.data_blocks()[0].payload(), b"0123456789");

    let extracted = reassemble(set.volumes()).unwrap();
    assert_eq!(extracted.len(), 1);
    assert_eq!(extracted[0].name(), "digits.bin");
    assert_eq!(extracted[0].data(), b"0123456789");

    let cabinets = parse_volumes(&set);
    let extracted = reassemble(&cabinets).unwrap();
    assert_eq!(extracted[0].data(), b"0123456789");
}

#[test]
fn single_volume_with_three_folders() {
    let mut builder = builder(1474 * 1024);
    builder.add_folder("a").add_bytes("a.bin", b"A".to_vec());
    builder.add_folder("b").add_bytes("b.bin", b"B".to_vec());
    builder.add_folder("c").add_bytes("c.bin", b"C".to_vec());
    let set = builder.build().unwrap();
    assert_eq!(set.volumes().len(), 1);

    let volume = &set.volumes()[0];
    assert_eq!(volume.header().num_folders(), 3);
    assert_eq!(volume.header().num_files(), 3);
    assert_eq!(volume.data_blocks().len(), 3);
    let indices: Vec<u16> =
        volume.files().iter().map(|f| f.folder_index()).collect();
    assert_eq!(indices, [0, 1, 2]);

    let extracted = reassemble(set.volumes()).unwrap();
    let names: Vec<&str> = extracted.iter().map(|f| f.name()).collect();
    assert_eq!(names, ["a.bin", "b.bin", "c.bin"]);
    assert_eq!(extracted[0].data(), b"A");
    assert_eq!(extracted[1].data(), b"B");
    assert_eq!(extracted[2].data(), b"C");
}

#[test]
fn payload_one_byte_past_the_block_bound_splits_in_two() {
    let mut builder = builder(1474 * 1024);
    builder.add_folder("n").add_bytes("big.bin", vec![0u8; 0x8001]);
    let set = builder.build().unwrap();
    assert_eq!(set.volumes().len(), 1);

    let volume = &set.volumes()[0];
    assert_eq!(volume.header().num_folders(), 1);
    assert_eq!(volume.files().len(), 1);
    assert_eq!(volume.files()[0].total_size(), 0x8001);
    assert_eq!(volume.data_blocks().len(), 2);
    assert_eq!(volume.data_blocks()[0].data_size(), 0x8000);
    assert_eq!(volume.data_blocks()[1].data_size(), 0x0001);

    let extracted = reassemble(set.volumes()).unwrap();
    assert_eq!(extracted[0].data(), &vec![0u8; 0x8001][..]);
}

// ========================================================================= //

#[test]
fn file_split_across_two_volumes() {
    let payload: Vec<u8> = (0..1500u32).map(|i| i as u8).collect();
    let mut builder = builder(1000);
    builder.add_folder("n").add_bytes("f.bin", payload.clone());
    let set = builder.build().unwrap();
    assert_eq!(set.volumes().len(), 2);

    let first = &set.volumes()[0];
    assert_eq!(first.files().len(), 1);
    assert_eq!(first.payload_bytes(), 1000);
    assert!(first.header().has_next_cabinet());
    assert_eq!(
        first.header().next_cabinet(),
        Some(("out_1.cab", "continued"))
    );
    assert_eq!(first.files()[0].folder_index(), CONTINUED_TO_NEXT);

    let second = &set.volumes()[1];
    assert_eq!(second.files().len(), 1);
    assert_eq!(second.payload_bytes(), 500);
    assert!(second.header().has_prev_cabinet());
    assert_eq!(
        second.header().prev_cabinet(),
        Some(("out_0.cab", "previous"))
    );
    assert!(second.files()[0].is_continued_from_prev());

    let cabinets = parse_volumes(&set);
    assert_eq!(
        cabinets[0].header().next_cabinet(),
        Some(("out_1.cab", "continued"))
    );
    let extracted = reassemble(&cabinets).unwrap();
    assert_eq!(extracted.len(), 1);
    assert_eq!(extracted[0].name(), "f.bin");
    assert_eq!(extracted[0].data(), &payload[..]);
}

#[test]
fn middle_volume_of_three_carries_both_sentinels() {
    let payload = vec![0xabu8; 250];
    let mut builder = builder(100);
    builder.add_folder("n").add_bytes("f.bin", payload.clone());
    let set = builder.build().unwrap();
    assert_eq!(set.volumes().len(), 3);
    assert_eq!(
        set.volumes()[1].files()[0].folder_index(),
        CONTINUED_PREV_AND_NEXT
    );

    let extracted = reassemble(set.volumes()).unwrap();
    assert_eq!(extracted.len(), 1);
    assert_eq!(extracted[0].data(), &payload[..]);
}

#[test]
fn linkage_is_consistent_across_a_long_set() {
    use rand::{RngCore, SeedableRng};
    let mut payload = vec![0u8; 10_000];
    rand::rngs::SmallRng::from_entropy().fill_bytes(&mut payload);

    let mut builder = builder(3000);
    builder.add_folder("n").add_bytes("blob.bin", payload.clone());
    let set = builder.build().unwrap();
    let volumes = set.volumes();
    assert_eq!(volumes.len(), 4);

    for (index, pair) in volumes.windows(2).enumerate() {
        let header = pair[0].header();
        assert!(header.has_next_cabinet());
        assert_eq!(
            header.next_cabinet().unwrap().0,
            pair[1].cab_filename()
        );
        assert!(pair[1].header().has_prev_cabinet());

        // The record continuing out of one volume reappears first in the
        // next, under the same name.
        let tail = pair[0].files().last().unwrap();
        assert!(tail.is_continued_to_next(), "volume {}", index);
        let head = &pair[1].files()[0];
        assert!(head.is_continued_from_prev());
        assert_eq!(tail.name(), head.name());
    }

    let extracted = reassemble(volumes).unwrap();
    assert_eq!(extracted.len(), 1);
    assert_eq!(extracted[0].data(), &payload[..]);
}

// ========================================================================= //

#[test]
fn multiple_files_and_folders_survive_a_roundtrip() {
    use rand::{RngCore, SeedableRng};
    let text = lipsum::lipsum(500);
    let mut blob = vec![0u8; 40_000];
    rand::rngs::SmallRng::from_entropy().fill_bytes(&mut blob);

    let mut builder = builder(1474 * 1024);
    {
        let docs = builder.add_folder("docs");
        docs.add_bytes("lorem_ipsum.txt", text.as_bytes().to_vec());
        docs.add_bytes("empty.txt", Vec::new());
    }
    builder.add_folder("bin").add_bytes("blob.bin", blob.clone());
    let set = builder.build().unwrap();
    assert_eq!(set.volumes().len(), 1);

    let cabinets = parse_volumes(&set);
    let extracted = reassemble(&cabinets).unwrap();
    let names: Vec<&str> = extracted.iter().map(|f| f.name()).collect();
    assert_eq!(names, ["lorem_ipsum.txt", "empty.txt", "blob.bin"]);
    assert_eq!(extracted[0].data(), text.as_bytes());
    assert_eq!(extracted[1].data(), b"");
    assert_eq!(extracted[2].data(), &blob[..]);
}

#[test]
fn reserve_areas_survive_a_roundtrip() {
    let mut builder = builder(1000);
    builder.reserve_sizes(ReserveSizes { header: 5, folder: 3, data: 2 });
    builder.add_folder("n").add_bytes("f.bin", vec![0x11u8; 1500]);
    let set = builder.build().unwrap();
    assert_eq!(set.volumes().len(), 2);

    for cabinet in parse_volumes(&set) {
        let sizes = cabinet.header().reserve_sizes();
        assert_eq!((sizes.header, sizes.folder, sizes.data), (5, 3, 2));
        assert_eq!(cabinet.header().reserve_data(), &[0x41; 5]);
        for folder in cabinet.folders() {
            assert_eq!(folder.reserve_data(), &[0x41; 3]);
        }
        for block in cabinet.data_blocks() {
            assert_eq!(block.reserve_data(), &[0x41; 2]);
        }
    }

    let extracted = reassemble(&parse_volumes(&set)).unwrap();
    assert_eq!(extracted[0].data(), &vec![0x11u8; 1500][..]);
}

// ========================================================================= //

#[test]
fn set_written_to_disk_extracts_back() {
    use rand::{RngCore, SeedableRng};
    use std::fs;

    let dir = std::env::temp_dir()
        .join(format!("cabset-roundtrip-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let mut blob = vec![0u8; 2500];
    rand::rngs::SmallRng::from_entropy().fill_bytes(&mut blob);
    let input_path = dir.join("notes.txt");
    fs::write(&input_path, b"stored on disk").unwrap();

    let mut builder = builder(1000);
    {
        let folder = builder.add_folder("docs");
        folder.add_bytes("blob.bin", blob.clone());
        folder.add_path(&input_path);
    }
    let set = builder.build().unwrap();
    set.write_to_dir(&dir).unwrap();

    let extracted = extract_set(dir.join("out_0.cab")).unwrap();
    assert_eq!(extracted.len(), 2);
    assert_eq!(extracted[0].name(), "blob.bin");
    assert_eq!(extracted[0].data(), &blob[..]);
    assert_eq!(extracted[1].name(), "notes.txt");
    assert_eq!(extracted[1].data(), b"stored on disk");

    fs::remove_dir_all(&dir).unwrap();
}

// ========================================================================= //
