// SPDX-License-Identifier: MIT
//! Binary content wrapper and the converter collaborator it is handed to.

mod binary_format;
mod converter;

pub use binary_format::{BinaryFormat, CloneableFormat, Format};
pub use converter::{Converter, ConverterRegistry, TypeDescriptor};
