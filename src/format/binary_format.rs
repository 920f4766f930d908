// SPDX-License-Identifier: MIT
use super::converter::ConverterRegistry;
use crate::error::Result;
use crate::stream::DataStream;

/// A value that converters read from or produce
pub trait Format: Send + 'static {
    /// Name used in logs and error messages
    fn format_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A format that can produce an independent copy of itself
pub trait CloneableFormat: Format + Sized {
    /// Copy whose content shares no backend with `self`
    fn deep_clone(&self) -> Result<Self>;
}

/// Raw binary content held in a [`DataStream`]
#[derive(Debug)]
pub struct BinaryFormat {
    stream: DataStream,
}

impl BinaryFormat {
    pub fn new(stream: DataStream) -> Self {
        Self { stream }
    }

    /// Empty in-memory content
    pub fn new_in_memory() -> Self {
        Self::new(DataStream::new())
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::new(DataStream::from_bytes(data))
    }

    /// Content backed by a window of `stream`
    pub fn from_window(stream: &DataStream, offset: u64, length: u64) -> Result<Self> {
        Ok(Self::new(stream.substream(offset, length)?))
    }

    pub fn stream(&self) -> &DataStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut DataStream {
        &mut self.stream
    }

    pub fn into_stream(self) -> DataStream {
        self.stream
    }

    /// Convert into `T` with the converter registered for it
    pub fn convert_to<T: Send + 'static>(self, registry: &ConverterRegistry) -> Result<T> {
        registry.convert::<BinaryFormat, T>(self)
    }

    /// Release the content; the backend goes away with its last view
    pub fn dispose(&mut self) {
        self.stream.dispose();
    }
}

impl Default for BinaryFormat {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl Format for BinaryFormat {}

impl CloneableFormat for BinaryFormat {
    fn deep_clone(&self) -> Result<Self> {
        let mut copy = DataStream::new();
        self.stream.write_to(&mut copy)?;
        copy.set_position(0)?;
        Ok(Self::new(copy))
    }
}

impl From<DataStream> for BinaryFormat {
    fn from(stream: DataStream) -> Self {
        Self::new(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;

    #[test]
    fn test_deep_clone_is_independent() {
        let original = BinaryFormat::from_bytes(vec![1, 2, 3]);
        let mut clone = original.deep_clone().unwrap();

        assert!(!clone.stream().shares_source_with(original.stream()));
        assert!(clone.stream().compare(original.stream()).unwrap());

        clone.stream_mut().write_byte(9).unwrap();
        assert!(!clone.stream().compare(original.stream()).unwrap());
    }

    #[test]
    fn test_window_shares_backend() {
        let stream = DataStream::from_bytes(vec![0; 8]);
        let format = BinaryFormat::from_window(&stream, 2, 4).unwrap();
        assert!(format.stream().shares_source_with(&stream));
        assert_eq!(format.stream().length(), 4);
    }

    #[test]
    fn test_convert_to() {
        let mut registry = ConverterRegistry::new();
        registry.register::<BinaryFormat, usize, _>(
            "length",
            |format: BinaryFormat| -> Result<usize> { Ok(format.stream().length() as usize) },
        );

        let format = BinaryFormat::from_bytes(vec![0; 5]);
        assert_eq!(format.convert_to::<usize>(&registry).unwrap(), 5);

        let format = BinaryFormat::new_in_memory();
        assert!(matches!(
            format.convert_to::<String>(&registry),
            Err(StreamError::Conversion(_))
        ));
    }

    #[test]
    fn test_format_name() {
        let format = BinaryFormat::default();
        assert!(format.format_name().ends_with("BinaryFormat"));
    }
}
