// SPDX-License-Identifier: MIT
//! Reference-counted views over shared backends.

mod arena;
mod data_stream;
mod factory;

pub use arena::SourceId;
pub use data_stream::{DataStream, SeekMode, ViewId};
pub use factory::DataStreamFactory;
