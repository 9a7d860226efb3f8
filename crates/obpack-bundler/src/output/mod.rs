//! Writing bundle outputs to disk.

pub mod writer;

pub use writer::{OutputFile, WrittenFile, collect_outputs, write_outputs};
