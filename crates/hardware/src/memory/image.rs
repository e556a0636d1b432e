//! Raw memory images.
//!
//! An image is the serialized content of a memory: every cell in address
//! order, no header. Loading an image shorter than the memory leaves the
//! remaining cells untouched.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::common::Result;
use crate::component::{ComponentId, ComponentTree};

/// Fills memory component `memory` from the file at `path`.
pub fn load(tree: &mut ComponentTree, memory: ComponentId, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    tree.deserialize_memory(memory, &mut reader)?;
    tracing::debug!(component = tree.name(memory), path = %path.display(), "loaded memory image");
    Ok(())
}

/// Writes the content of memory component `memory` to the file at `path`,
/// creating or truncating it.
pub fn dump(tree: &mut ComponentTree, memory: ComponentId, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    tree.serialize_memory(memory, &mut writer)?;
    writer.flush()?;
    tracing::debug!(component = tree.name(memory), path = %path.display(), "dumped memory image");
    Ok(())
}
