// SPDX-License-Identifier: MIT
//! Line and token handling over shared views

use binstream::{DataStreamFactory, NewLine, StreamError, TextEncoding, TextReader, TextWriter};


#[test]
fn test_token_search_stops_after_token() {
    let stream = DataStreamFactory::from_bytes(b"195".to_vec());
    let mut reader = TextReader::new(stream);

    assert_eq!(reader.read_to_token("9").unwrap(), "1");
    assert_eq!(reader.stream().position(), 2);
    assert_eq!(reader.read_to_token("9").unwrap(), "5");
    assert!(reader.end_of_stream());
    assert!(matches!(
        reader.read_to_token("9"),
        Err(StreamError::EndOfStream { .. })
    ));
}

#[test]
fn test_written_lines_read_back_in_utf16() {
    let mut stream = DataStreamFactory::create_from_memory();
    {
        let mut writer =
            TextWriter::with_encoding(&mut stream, TextEncoding::Utf16Be).with_auto_preamble(true);
        writer.write_lines(["first", "zweite Zeile", "三"]).unwrap();
    }

    stream.set_position(0).unwrap();
    let mut reader = TextReader::with_encoding(stream, TextEncoding::Utf16Be);
    assert_eq!(
        reader.read_lines().unwrap(),
        vec!["first", "zweite Zeile", "三"]
    );
}

#[test]
fn test_crlf_lines_in_auto_mode() {
    let stream = DataStreamFactory::from_bytes(b"a\r\nb\nc".to_vec());
    let mut reader = TextReader::new(stream);

    assert_eq!(reader.read_line().unwrap(), "a");
    assert_eq!(reader.read_line().unwrap(), "b");
    assert_eq!(reader.read_line().unwrap(), "c");
    assert!(reader.end_of_stream());
}

#[test]
fn test_custom_newline_token() {
    let mut stream = DataStreamFactory::create_from_memory();
    {
        let mut writer = TextWriter::new(&mut stream).with_newline("||");
        writer.write_line("x").unwrap();
        writer.write_line("y").unwrap();
    }

    stream.set_position(0).unwrap();
    let mut reader = TextReader::new(stream).with_newline(NewLine::Token("||".to_string()));
    assert_eq!(reader.peek_line().unwrap(), "x");
    assert_eq!(reader.read_lines().unwrap(), vec!["x", "y"]);
}

#[test]
fn test_text_inside_window() {
    let parent = DataStreamFactory::from_bytes(b"HDRkey=value;tail".to_vec());
    let window = parent.substream(3, 10).unwrap();
    let mut reader = TextReader::new(window);

    assert_eq!(reader.read_to_token("=").unwrap(), "key");
    assert_eq!(reader.read_to_token(";").unwrap(), "value");
    assert!(reader.end_of_stream());
}

#[test]
fn test_long_token_search_spans_chunks() {
    let mut content = "ä".repeat(300);
    content.push_str("END");
    content.push_str("rest");
    let stream = DataStreamFactory::from_bytes(content.into_bytes());
    let mut reader = TextReader::new(stream);

    let head = reader.read_to_token("END").unwrap();
    assert_eq!(head.chars().count(), 300);
    assert_eq!(reader.stream().position(), 603);
    assert_eq!(reader.read_to_end().unwrap(), "rest");
}

#[test]
fn test_preamble_skipped_once() {
    let mut bytes = TextEncoding::Utf8.preamble().to_vec();
    bytes.extend_from_slice("\u{feff}x".as_bytes());
    let stream = DataStreamFactory::from_bytes(bytes);
    let mut reader = TextReader::new(stream);

    assert_eq!(reader.read_char().unwrap(), '\u{feff}');
    assert_eq!(reader.read_char().unwrap(), 'x');
}

#[test]
fn test_formatted_writes() {
    let mut stream = DataStreamFactory::create_from_memory();
    {
        let mut writer = TextWriter::new(&mut stream);
        write!(writer, "{}-{:03}", "id", 7).unwrap();
    }

    stream.set_position(0).unwrap();
    let mut reader = TextReader::new(stream);
    assert_eq!(reader.read_to_end().unwrap(), "id-007");
}
