use std::fs;
use std::path::Path;

use assert_cmd::Command;
use find_overlap::{save_hash_dump, BlockDigest, DigestRecord, HashDump};
use predicates::prelude::*;
use tempfile::tempdir;

const BLOCK: usize = 512;

fn find_overlap() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_find-overlap"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Block ids of a device of `total` blocks whose move by `shift` stopped at `split`
fn interrupted_move(total: u64, split: u64, shift: u64) -> Vec<u64> {
    (0..total)
        .map(|p| if p < split + shift { p } else { p - shift })
        .collect()
}

fn block_bytes(id: u64) -> Vec<u8> {
    (id as u32).to_le_bytes().repeat(BLOCK / 4)
}

fn write_image(path: &Path, ids: &[u64]) {
    let data: Vec<u8> = ids.iter().flat_map(|&id| block_bytes(id)).collect();
    fs::write(path, data).unwrap();
}

fn write_dump(path: &Path, block_size: u64, ids: &[u64]) {
    let records = ids
        .iter()
        .enumerate()
        .map(|(i, id)| DigestRecord::new(i as u64, BlockDigest::of(&id.to_le_bytes()), block_size))
        .collect();
    save_hash_dump(path, &HashDump { block_size, records }).unwrap();
}

#[test]
fn help_mentions_hash_options() {
    find_overlap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--read-hashes"))
        .stdout(predicate::str::contains("--dump-hashes"));
}

#[test]
fn no_input_is_an_error() {
    find_overlap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("No input provided"));
}

#[test]
fn two_devices_are_rejected() {
    find_overlap().args(["/dev/null", "/dev/null"]).assert().failure();
}

#[test]
fn empty_device_has_no_overlap() {
    find_overlap()
        .args(["-q", "/dev/null"])
        .assert()
        .success()
        .stdout("No overlapping range found\n");
}

#[test]
fn missing_device_fails() {
    find_overlap()
        .args(["-q", "/nonexistent/find-overlap.img"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn documented_example_from_hash_dump() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("hashes.txt");
    write_dump(&dump, 1024 * 1024, &interrupted_move(20480, 4321, 4096));

    find_overlap()
        .args(["--read-hashes", dump.to_str().unwrap()])
        .assert()
        .success()
        .stdout(
            "Block size: 1048576 bytes\n\
             \n\
             Overlap of size 4096 blocks found.\n\
             Range [4321:8417) overlaps [8417:12513).\n\
             Original file system size was 16384 blocks.\n\
             Restore original file system with:\n    \
             dd if=INPUT bs=1048576 count=6369 of=OUTPUT\n    \
             dd if=INPUT bs=1048576 skip=10465 seek=6369 of=OUTPUT\n",
        );
}

#[test]
fn live_scan_then_reread_dump() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("disk.img");
    let dump = dir.path().join("hashes.txt");
    write_image(&image, &interrupted_move(40, 5, 10));

    let expected = "Block size: 512 bytes\n\
                    \n\
                    Overlap of size 10 blocks found.\n\
                    Range [5:15) overlaps [15:25).\n\
                    Original file system size was 30 blocks.\n\
                    Restore original file system with:\n    \
                    dd if=INPUT bs=512 count=10 of=OUTPUT\n    \
                    dd if=INPUT bs=512 skip=20 seek=10 of=OUTPUT\n";

    find_overlap()
        .args(["-q", "--block-size", "512", "--dump-hashes", dump.to_str().unwrap(), "--"])
        .arg(&image)
        .assert()
        .success()
        .stdout(expected);

    let text = fs::read_to_string(&dump).unwrap();
    assert!(text.starts_with("# find-overlap hash dump v1\nblock-size 512\n"));
    assert_eq!(text.lines().count(), 2 + 40);

    find_overlap()
        .args(["--read-hashes", dump.to_str().unwrap()])
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn restore_commands_rebuild_original_layout() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("disk.img");
    let ids = interrupted_move(24, 3, 6);
    write_image(&image, &ids);

    find_overlap()
        .args(["-q", "-b", "512"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("count=6 of=OUTPUT"))
        .stdout(predicate::str::contains("skip=12 seek=6 of=OUTPUT"));

    // what the two dd commands produce
    let damaged = fs::read(&image).unwrap();
    let mut restored = damaged[..6 * BLOCK].to_vec();
    restored.extend_from_slice(&damaged[12 * BLOCK..]);

    // the 18 blocks of the partition before the move
    let original: Vec<u8> = (0..18u64).flat_map(block_bytes).collect();
    assert_eq!(restored, original);
}

#[test]
fn ambiguous_overlap_exits_with_code_two() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("hashes.txt");
    write_dump(&dump, 512, &[1, 2, 1, 2, 50, 51, 3, 4, 52, 3, 4, 53]);

    find_overlap()
        .args(["--read-hashes", dump.to_str().unwrap()])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("WARNING: Multiple overlapping ranges found"))
        .stdout(predicate::str::contains("Range [0:2) overlaps [2:4)."))
        .stdout(predicate::str::contains("Range [6:9) overlaps [9:11)."));
}

#[test]
fn malformed_dump_fails_before_analysis() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("hashes.txt");
    fs::write(&dump, "# find-overlap hash dump v1\nblock-size 512\n0 nothex 512\n").unwrap();

    find_overlap()
        .args(["--read-hashes", dump.to_str().unwrap()])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Malformed hash dump"));
}

#[test]
fn binary_dump_is_malformed() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("hashes.txt");
    fs::write(&dump, b"# find-overlap hash dump v1\nblock-size 512\n\xff\xfe\n").unwrap();

    find_overlap()
        .args(["--read-hashes", dump.to_str().unwrap()])
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Malformed hash dump"))
        .stderr(predicate::str::contains("line 3"));
}

#[test]
fn oversized_block_size_fails_cleanly() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("small.img");
    fs::write(&image, [0x42u8; 10]).unwrap();

    find_overlap()
        .args(["-q", "-b", "1000000000000"])
        .arg(&image)
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("block size 1000000000000 is larger than"))
        .stderr(predicate::str::contains("memory allocation").not());
}

#[cfg(unix)]
#[test]
fn scans_a_pipe() {
    let image: Vec<u8> = interrupted_move(40, 5, 10)
        .into_iter()
        .flat_map(block_bytes)
        .collect();

    find_overlap()
        .args(["-q", "-b", "512", "/dev/stdin"])
        .write_stdin(image)
        .assert()
        .success()
        .stdout(predicate::str::contains("Range [5:15) overlaps [15:25)."))
        .stdout(predicate::str::contains("dd if=INPUT bs=512 skip=20 seek=10 of=OUTPUT"));
}

#[test]
fn dump_block_size_conflict_fails() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("hashes.txt");
    write_dump(&dump, 512, &[1, 2, 3]);

    find_overlap()
        .args(["--read-hashes", dump.to_str().unwrap(), "--block-size", "4096"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Block size mismatch"));
}

#[test]
fn json_report_is_written() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("hashes.txt");
    let report = dir.path().join("report.json");
    write_dump(&dump, 512, &interrupted_move(40, 5, 10));

    find_overlap()
        .args(["--read-hashes", dump.to_str().unwrap(), "--json-report", report.to_str().unwrap()])
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&report).unwrap()).unwrap();
    assert_eq!(json["outcome"], "found");
    assert_eq!(json["total_blocks"], 40);
    assert_eq!(json["candidates"][0]["a"], 5);
    assert_eq!(json["candidates"][0]["b"], 15);
    assert_eq!(json["candidates"][0]["c"], 25);
    assert_eq!(json["candidates"][0]["plan"]["original_blocks"], 30);
}
