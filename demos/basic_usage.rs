// SPDX-License-Identifier: MIT
//! Write a small record file, then read it back through shared windows.
//!
//! Run with `RUST_LOG=binstream=debug` to see backend lifetimes.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use binstream::{
    BinaryFormat, CloneableFormat, Config, ConverterRegistry, DataReader, DataStreamFactory,
    DataType, DataWriter, Endianness, FileOpenMode, TextReader, TextWriter,
};

const MAGIC: u32 = 0x4253_544D;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let config = Config::from_env();
    config.validate().map_err(anyhow::Error::msg)?;
    Config::install(config)?;
    info!("Configuration loaded and validated");

    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("records").join("demo.bin");

    // Header, one sized name and a text trailer
    let mut stream = DataStreamFactory::create_from_memory();
    {
        let mut writer = DataWriter::new(&mut stream).with_endianness(Endianness::BigEndian);
        writer.write_u32(MAGIC)?;
        writer.write_u24(3)?;
        writer.write_sized_string("sensor-7", DataType::U16)?;
        writer.write_padding(0, 8)?;
    }
    let trailer_offset = stream.length();
    {
        let mut text = TextWriter::new(&mut stream);
        text.write_lines(["temperature=21.5", "humidity=40"])?;
    }
    stream
        .write_to_path(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(bytes = stream.length(), path = %path.display(), "Wrote record file");

    let file = DataStreamFactory::from_file(&path, FileOpenMode::Read)?;
    let header = file.substream(0, 7)?;
    let trailer = file.substream(trailer_offset, file.length() - trailer_offset)?;
    info!(views = file.live_view_count(), "Opened windows over one file");

    let mut reader = DataReader::new(header).with_endianness(Endianness::BigEndian);
    anyhow::ensure!(reader.read_u32()? == MAGIC, "bad magic");
    info!(version = reader.read_u24()?, "Header");

    let mut lines = TextReader::new(trailer);
    for line in lines.read_lines()? {
        if let Some((key, value)) = line.split_once('=') {
            info!(key, value, "Trailer entry");
        }
    }

    let mut registry = ConverterRegistry::new();
    registry.register::<BinaryFormat, usize, _>(
        "byte-length",
        |format: BinaryFormat| -> binstream::Result<usize> { Ok(format.stream().length() as usize) },
    );
    let snapshot = BinaryFormat::from_window(&file, 0, trailer_offset)?.deep_clone()?;
    let size: usize = snapshot.convert_to(&registry)?;
    info!(size, "Converted header snapshot");

    Ok(())
}
