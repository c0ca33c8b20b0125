//! Extension descriptor store: discovery and parsing of on-disk extension trees.

pub mod metadata;
pub mod parser;
pub mod watcher;

pub use parser::{DescriptorSource, FsDescriptorSource};
