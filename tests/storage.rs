// Integration tests for storage providers

use anyhow::Result;
use binmill::stream::read_to_vec;
use binmill::testing::TempWorkspace;
use binmill::{ErrorKind, OpenMode, ParallelAccess, RealStorage, StorageProvider, VirtualStorage};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

fn virtual_real() -> VirtualStorage {
    VirtualStorage::new(Arc::new(RealStorage::new()))
}

// ============================================================================
// Real storage
// ============================================================================

#[test]
fn real_missing_file_is_not_found() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let missing = ws.file_path("nope.bin");
    let err = RealStorage::new()
        .open_read(&missing, OpenMode::Open)
        .err()
        .expect("open should fail");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.message.contains("nope.bin"));
    Ok(())
}

#[test]
fn real_read_write_and_append() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let storage = RealStorage::new();
    let path = ws.file_path("data.bin");

    let mut out = storage.open_write(&path, OpenMode::Create)?;
    out.write_all(b"head")?;
    drop(out);

    let mut out = storage.open_write(&path, OpenMode::Append)?;
    out.write_all(b"tail")?;
    drop(out);

    let mut input = storage.open_read(&path, OpenMode::Open)?;
    assert_eq!(input.len(), 8);
    assert!(!input.can_write());
    assert_eq!(read_to_vec(&mut input)?, b"headtail");
    Ok(())
}

#[test]
fn real_enumeration_is_sorted_and_split() -> Result<()> {
    let ws = TempWorkspace::new()?;
    ws.write_file("b.bin", b"b")?;
    ws.write_file("a.bin", b"a")?;
    ws.write_file("sub/c.bin", b"c")?;
    let storage = RealStorage::new();

    let files = storage.enumerate_files(ws.path())?;
    assert_eq!(files, vec![ws.file_path("a.bin"), ws.file_path("b.bin")]);
    let dirs = storage.enumerate_directories(ws.path())?;
    assert_eq!(dirs, vec![ws.file_path("sub")]);

    let err = storage.enumerate_files(&ws.file_path("missing")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn real_create_directory_reports_whether_it_was_new() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let storage = RealStorage::new();
    let dir = ws.file_path("x/y");
    assert!(storage.create_directory(&dir)?);
    assert!(!storage.create_directory(&dir)?);
    assert!(storage.directory_exists(&dir));
    assert!(!storage.file_exists(&dir));
    Ok(())
}

// ============================================================================
// Parallel access
// ============================================================================

#[test]
fn parallel_access_materializes_file_streams() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let path = ws.write_file("in.bin", &[1, 2, 3, 4])?;
    let storage = ParallelAccess::new(RealStorage::new());

    let mut a = storage.open_read(&path, OpenMode::Open)?;
    let mut b = storage.open_read(&path, OpenMode::Open)?;
    assert!(a.is_materialized());
    assert!(!a.can_write());

    // independent cursors
    let mut two = [0u8; 2];
    a.read_exact(&mut two)?;
    assert_eq!(two, [1, 2]);
    assert_eq!(b.position(), 0);
    assert_eq!(read_to_vec(&mut b)?, vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn parallel_access_passes_everything_else_through() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let storage = ParallelAccess::new(RealStorage::new());
    let path = ws.file_path("out/o.bin");

    assert!(storage.create_directory(&ws.file_path("out"))?);
    storage.open_write(&path, OpenMode::Create)?.write_all(b"ok")?;
    assert!(storage.file_exists(&path));
    assert_eq!(ws.read_file("out/o.bin")?, b"ok");
    assert_eq!(storage.enumerate_files(&ws.file_path("out"))?, vec![path]);
    Ok(())
}

// ============================================================================
// Virtual storage
// ============================================================================

#[test]
fn virtual_write_is_visible_but_not_on_disk() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let vfs = virtual_real();
    let path = ws.file_path("a/b.txt");

    vfs.open_write(&path, OpenMode::Create)?.write_all(b"12345")?;

    assert!(vfs.file_exists(&path));
    assert!(vfs.file_exists(&ws.file_path("A/B.TXT")));
    assert!(vfs.directory_exists(&ws.file_path("a")));
    assert!(!path.exists());

    let files: Vec<_> = (&vfs).into_iter().collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, path);
    assert_eq!(files[0].offset, 0);
    assert_eq!(files[0].length, 5);
    assert_eq!(files[0].bytes(), b"12345");
    Ok(())
}

#[test]
fn virtual_relative_paths_match_loosely() -> Result<()> {
    let vfs = virtual_real();
    vfs.open_write(Path::new("./Out/Data.BIN"), OpenMode::Create)?
        .write_all(b"x")?;
    assert!(vfs.file_exists(Path::new("out/data.bin")));
    assert!(vfs.directory_exists(Path::new("out/")));
    assert!(!vfs.file_exists(Path::new("out/data.bi")));
    assert!(!vfs.directory_exists(Path::new("ou")));
    Ok(())
}

#[test]
fn virtual_reads_fall_back_to_delegate() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let on_disk = ws.write_file("in.bin", b"disk")?;
    let vfs = virtual_real();

    assert!(vfs.file_exists(&on_disk));
    assert_eq!(read_to_vec(&mut vfs.open_read(&on_disk, OpenMode::Open)?)?, b"disk");

    let buffered = ws.file_path("mem.bin");
    vfs.open_write(&buffered, OpenMode::Create)?.write_all(b"memory")?;
    let mut back = vfs.open_read(&buffered, OpenMode::Open)?;
    assert!(!back.can_write());
    assert_eq!(read_to_vec(&mut back)?, b"memory");

    let err = vfs
        .open_read(&ws.file_path("missing.bin"), OpenMode::Open)
        .err()
        .expect("missing input");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn virtual_buffered_files_are_not_enumerated() -> Result<()> {
    let ws = TempWorkspace::new()?;
    ws.write_file("real.bin", b"r")?;
    let vfs = virtual_real();
    vfs.open_write(&ws.file_path("virtual.bin"), OpenMode::Create)?
        .write_all(b"v")?;
    assert_eq!(vfs.enumerate_files(ws.path())?, vec![ws.file_path("real.bin")]);
    Ok(())
}

#[test]
fn virtual_rewrite_replaces_in_place_and_append_continues() -> Result<()> {
    let vfs = virtual_real();
    vfs.open_write(Path::new("one.bin"), OpenMode::Create)?
        .write_all(b"first")?;
    vfs.open_write(Path::new("two.bin"), OpenMode::Create)?
        .write_all(b"2")?;
    vfs.open_write(Path::new("ONE.bin"), OpenMode::Create)?
        .write_all(b"again")?;
    vfs.open_write(Path::new("two.bin"), OpenMode::Append)?
        .write_all(b"22")?;

    let files = vfs.files();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].path, PathBuf::from("one.bin"));
    assert_eq!(files[0].bytes(), b"again");
    assert_eq!(files[1].bytes(), b"222");
    Ok(())
}

#[test]
fn virtual_create_directory_is_recorded_only() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let vfs = virtual_real();
    let dir = ws.file_path("made/here");
    assert!(vfs.create_directory(&dir)?);
    assert!(!vfs.create_directory(&dir)?);
    assert!(vfs.directory_exists(&dir));
    assert!(vfs.directory_exists(&ws.file_path("made")));
    assert!(!dir.exists());
    Ok(())
}

#[test]
fn virtual_commit_writes_in_order() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let vfs = virtual_real();
    vfs.open_write(&ws.file_path("out/a.bin"), OpenMode::Create)?
        .write_all(b"aa")?;
    vfs.open_write(&ws.file_path("out/deep/b.bin"), OpenMode::Create)?
        .write_all(b"bbb")?;

    let bytes = vfs.commit_to(&RealStorage::new())?;
    assert_eq!(bytes, 5);
    assert_eq!(ws.read_file("out/a.bin")?, b"aa");
    assert_eq!(ws.read_file("out/deep/b.bin")?, b"bbb");
    Ok(())
}

#[test]
fn virtual_accepts_concurrent_writers() -> Result<()> {
    let vfs = virtual_real();
    thread::scope(|s| {
        for t in 0..8u8 {
            let vfs = &vfs;
            s.spawn(move || {
                let path = format!("out/t{t}.bin");
                let mut out = vfs.open_write(Path::new(&path), OpenMode::Create).unwrap();
                out.write_all(&[t; 16]).unwrap();
            });
        }
    });

    assert_eq!(vfs.len(), 8);
    for file in &vfs {
        assert_eq!(file.length, 16);
        let name = file.path.file_stem().unwrap().to_string_lossy().into_owned();
        let t: u8 = name.trim_start_matches('t').parse()?;
        assert!(file.bytes().iter().all(|&b| b == t));
    }
    Ok(())
}
