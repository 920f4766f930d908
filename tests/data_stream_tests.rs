// SPDX-License-Identifier: MIT
//! End-to-end tests for shared views, factories and backend lifetimes

use std::io::Cursor;
use std::sync::Arc;

use parking_lot::Mutex;

use binstream::source::ByteStream;
use binstream::{
    DataReader, DataStream, DataStreamFactory, DataWriter, Endianness, FileOpenMode, SeekMode,
    StreamError,
};

use test_fixtures::{drop_count, init_tracing, sequential_bytes, temp_file_with, TrackedStream};

#[test]
fn test_read_u16_in_both_byte_orders() {
    let stream = DataStreamFactory::from_bytes(vec![0xCA, 0xFE]);

    let mut reader = DataReader::new(stream).with_endianness(Endianness::BigEndian);
    assert_eq!(reader.read_u16().unwrap(), 0xCAFE);

    reader.stream_mut().set_position(0).unwrap();
    reader.set_endianness(Endianness::LittleEndian);
    assert_eq!(reader.read_u16().unwrap(), 0xFECA);
}

#[test]
fn test_substream_window_reads_its_own_bytes() {
    let parent = DataStreamFactory::from_bytes(vec![0x10, 0x20, 0x30, 0x40]);
    let mut window = parent.substream(1, 2).unwrap();

    assert_eq!(window.length(), 2);
    assert_eq!(window.offset(), 1);
    assert_eq!(window.parent(), Some(parent.id()));
    assert_eq!(window.read_to_vec(2).unwrap(), vec![0x20, 0x30]);
    assert!(window.end_of_stream());
    assert!(matches!(
        window.read_byte(),
        Err(StreamError::EndOfStream { .. })
    ));
}

#[test]
fn test_nested_substreams_accumulate_offsets() {
    let parent = DataStreamFactory::from_bytes(sequential_bytes(32));
    let outer = parent.substream(8, 16).unwrap();
    let mut inner = outer.substream(4, 4).unwrap();

    assert_eq!(inner.offset(), 12);
    assert_eq!(inner.read_to_vec(4).unwrap(), vec![12, 13, 14, 15]);
    assert!(inner.shares_source_with(&parent));
    assert!(outer.substream(10, 8).is_err());
}

#[test]
fn test_writes_through_window_are_visible_to_parent() {
    let mut parent = DataStreamFactory::from_bytes(vec![0; 6]);
    let mut window = parent.substream(2, 2).unwrap();
    window.write_bytes(&[0xAA, 0xBB]).unwrap();

    assert!(matches!(
        window.write_byte(0xCC),
        Err(StreamError::InvalidOperation(_))
    ));

    parent.set_position(0).unwrap();
    assert_eq!(
        parent.read_to_vec(6).unwrap(),
        vec![0, 0, 0xAA, 0xBB, 0, 0]
    );
}

#[test]
fn test_views_keep_independent_cursors() {
    let parent = DataStreamFactory::from_bytes(sequential_bytes(8));
    let mut a = DataStreamFactory::from_data_stream(&parent).unwrap();
    let mut b = DataStreamFactory::from_data_stream_window(&parent, 4, 4).unwrap();

    assert_eq!(a.read_byte().unwrap(), 0);
    assert_eq!(b.read_byte().unwrap(), 4);
    assert_eq!(a.read_byte().unwrap(), 1);
    assert_eq!(a.position(), 2);
    assert_eq!(b.position(), 1);
    assert!(a.lock().unwrap().ptr_eq(&b.lock().unwrap()));
}

#[test]
fn test_owned_stream_released_with_last_view() {
    init_tracing();
    let (tracked, drops) = TrackedStream::new(sequential_bytes(16));

    let mut root = DataStreamFactory::from_stream(tracked).unwrap();
    let mut first = root.substream(0, 8).unwrap();
    let second = first.substream(2, 2).unwrap();
    assert_eq!(root.live_view_count(), 3);

    root.dispose();
    first.dispose();
    assert_eq!(drop_count(&drops), 0);
    assert_eq!(second.live_view_count(), 1);

    drop(second);
    assert_eq!(drop_count(&drops), 1);
}

#[test]
fn test_dispose_twice_releases_once() {
    let (tracked, drops) = TrackedStream::new(vec![1, 2, 3]);
    let mut view = DataStreamFactory::from_stream(tracked).unwrap();

    view.dispose();
    view.dispose();
    assert!(view.is_disposed());
    assert_eq!(drop_count(&drops), 1);
    assert!(matches!(view.read_byte(), Err(StreamError::Disposed)));
    assert!(matches!(view.substream(0, 0), Err(StreamError::Disposed)));
}

#[test]
fn test_views_churned_across_threads_release_cleanly() {
    const THREADS: u64 = 8;
    const ROUNDS: u64 = 500;

    let (tracked, drops) = TrackedStream::new(sequential_bytes(64));
    let root = DataStreamFactory::from_stream(tracked).unwrap();

    std::thread::scope(|scope| {
        for worker in 0..THREADS {
            let root = &root;
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let offset = (worker + round) % 56;
                    let window = root.substream(offset, 8).unwrap();
                    let inner = window.substream(2, 4).unwrap();
                    assert!(inner.shares_source_with(root));
                    drop(window);
                    drop(inner);
                }
            });
        }
    });

    assert_eq!(root.live_view_count(), 1);
    assert_eq!(drop_count(&drops), 0);

    drop(root);
    assert_eq!(drop_count(&drops), 1);
}

#[test]
fn test_keeping_ownership_leaves_stream_usable() {
    let shared: Arc<Mutex<dyn ByteStream>> =
        Arc::new(Mutex::new(Cursor::new(sequential_bytes(10))));

    let mut left =
        DataStreamFactory::from_stream_window_keeping_ownership(Arc::clone(&shared), 0, 5).unwrap();
    let mut right =
        DataStreamFactory::from_stream_window_keeping_ownership(Arc::clone(&shared), 5, 5).unwrap();

    assert!(left.shares_source_with(&right));
    assert_eq!(left.read_byte().unwrap(), 0);
    assert_eq!(right.read_byte().unwrap(), 5);

    left.dispose();
    right.dispose();

    let mut guard = shared.lock();
    let mut rest = Vec::new();
    std::io::Read::read_to_end(&mut *guard, &mut rest).unwrap();
    assert!(!rest.is_empty());
}

#[test]
fn test_run_in_position_restores_cursor() {
    let mut stream = DataStreamFactory::from_bytes(sequential_bytes(10));
    stream.set_position(3).unwrap();

    let tail = stream
        .run_in_position(-2, SeekMode::End, |s| s.read_to_vec(2))
        .unwrap();
    assert_eq!(tail, vec![8, 9]);
    assert_eq!(stream.position(), 3);
    assert_eq!(stream.saved_positions(), 0);
}

#[test]
fn test_run_in_position_failure_keeps_saved_position() {
    let mut stream = DataStreamFactory::from_bytes(sequential_bytes(4));
    let result = stream.run_in_position(3, SeekMode::Start, |s| s.read_to_vec(2));

    assert!(matches!(result, Err(StreamError::EndOfStream { .. })));
    assert_eq!(stream.saved_positions(), 1);
    stream.pop_position().unwrap();
    assert_eq!(stream.position(), 0);
}

#[test]
fn test_write_to_and_compare() {
    let source = DataStreamFactory::from_bytes(sequential_bytes(1000));
    let mut copy = DataStreamFactory::create_from_memory();

    source.write_to(&mut copy).unwrap();
    assert_eq!(copy.length(), 1000);
    assert!(source.compare(&copy).unwrap());

    copy.set_position(500).unwrap();
    copy.write_byte(0xFF).unwrap();
    assert!(!source.compare(&copy).unwrap());

    let shorter = source.substream(0, 999).unwrap();
    assert!(!source.compare(&shorter).unwrap());
}

#[test]
fn test_write_segment_to_appends_at_target_cursor() {
    let source = DataStreamFactory::from_bytes(sequential_bytes(10));
    let mut target = DataStreamFactory::from_bytes(vec![0xEE]);
    target.seek(0, SeekMode::End).unwrap();

    source.write_segment_to(2, 3, &mut target).unwrap();
    target.set_position(0).unwrap();
    assert_eq!(target.read_to_vec(4).unwrap(), vec![0xEE, 2, 3, 4]);
}

#[test]
fn test_file_round_trip_with_parent_directories() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("out.bin");

    let mut stream = DataStreamFactory::create_from_memory();
    {
        let mut writer = DataWriter::new(&mut stream).with_endianness(Endianness::BigEndian);
        writer.write_u32(0xDEADBEEF).unwrap();
        writer.write_u24(0x123456).unwrap();
    }
    stream.write_to_path(&path).unwrap();

    let file = DataStreamFactory::from_file(&path, FileOpenMode::Read).unwrap();
    assert_eq!(file.length(), 7);
    assert!(file.compare(&stream).unwrap());

    let mut reader = DataReader::new(file).with_endianness(Endianness::BigEndian);
    assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
    assert_eq!(reader.read_u24().unwrap(), 0x123456);
}

#[test]
fn test_file_window() {
    let (_dir, path) = temp_file_with("window.bin", &sequential_bytes(20));
    let mut window = DataStreamFactory::from_file_window(&path, FileOpenMode::Read, 10, 4).unwrap();

    assert_eq!(window.read_to_vec(4).unwrap(), vec![10, 11, 12, 13]);
    assert!(DataStreamFactory::from_file_window(&path, FileOpenMode::Read, 18, 4).is_err());
}

#[test]
fn test_missing_file_is_rejected_for_read() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.bin");
    assert!(DataStreamFactory::from_file(&path, FileOpenMode::Read).is_err());
    assert!(DataStreamFactory::from_file(&path, FileOpenMode::Write).is_ok());
}

#[test]
fn test_read_only_file_rejects_writes() {
    let (_dir, path) = temp_file_with("ro.bin", &[1, 2, 3]);
    let mut view = DataStreamFactory::from_file(&path, FileOpenMode::Read).unwrap();

    assert!(matches!(
        view.write_byte(9),
        Err(StreamError::InvalidOperation(_))
    ));
    assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_append_mode_writes_at_end() {
    let (_dir, path) = temp_file_with("append.bin", &[1, 2]);
    let mut view = DataStreamFactory::from_file(&path, FileOpenMode::Append).unwrap();
    assert_eq!(view.position(), 2);
    assert_eq!(view.length(), 2);

    view.write_byte(3).unwrap();
    assert_eq!(view.length(), 3);

    view.set_position(0).unwrap();
    assert!(matches!(
        view.write_byte(9),
        Err(StreamError::InvalidOperation(_))
    ));

    view.dispose();
    assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
}

#[cfg(unix)]
#[test]
fn test_file_through_symlink() {
    let (dir, target) = temp_file_with("target.bin", &[7, 8, 9]);
    let link = dir.path().join("link.bin");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let mut view = DataStreamFactory::from_file(&link, FileOpenMode::Read).unwrap();
    assert_eq!(view.read_to_vec(3).unwrap(), vec![7, 8, 9]);
}

#[test]
fn test_std_io_interop() {
    use std::io::{Read, Seek, SeekFrom, Write};

    let mut stream = DataStreamFactory::create_from_memory();
    stream.write_all(b"hello world").unwrap();
    Seek::seek(&mut stream, SeekFrom::Start(6)).unwrap();

    let mut word = String::new();
    stream.read_to_string(&mut word).unwrap();
    assert_eq!(word, "world");
}

#[test]
fn test_set_length_limits() {
    let mut stream = DataStreamFactory::from_bytes(sequential_bytes(8));
    stream.set_position(6).unwrap();
    stream.set_length(4).unwrap();
    assert_eq!(stream.position(), 4);

    stream.set_length(8).unwrap();
    assert!(stream.set_length(9).is_err());

    let mut window = stream.substream(0, 2).unwrap();
    assert!(matches!(
        window.set_length(1),
        Err(StreamError::InvalidOperation(_))
    ));
}

#[test]
fn test_growable_view_from_bytes_and_fixed_window() {
    let mut growable = DataStreamFactory::from_bytes(vec![1, 2]);
    growable.seek(0, SeekMode::End).unwrap();
    growable.write_byte(3).unwrap();
    assert_eq!(growable.length(), 3);

    let mut fixed = DataStreamFactory::from_bytes_window(vec![1, 2, 3, 4], 1, 2).unwrap();
    assert!(fixed.is_fixed());
    fixed.seek(0, SeekMode::End).unwrap();
    assert!(fixed.write_byte(5).is_err());
}

#[test]
fn test_default_view_is_empty() {
    let stream = DataStream::default();
    assert_eq!(stream.length(), 0);
    assert!(stream.end_of_stream());
    assert!(stream.source_id().is_some());
}
