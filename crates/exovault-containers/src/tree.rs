//! Logical file tree embedded in an evidence container
//!
//! Logical evidence captures a filesystem-like hierarchy next to (or instead
//! of) the media image. The tree is stored inline in the container footer;
//! traversal hands out owned entries backed by a shared root.

use exovault_core::{Error, FileEntry, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One node of the stored logical tree. File data is held inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogicalEntry {
    /// Entry name; empty for the root
    pub name: String,
    /// Regular file vs. directory/other
    pub is_file: bool,
    /// File content (empty for directories)
    pub data: Vec<u8>,
    /// Child entries in container order
    pub children: Vec<LogicalEntry>,
}

impl LogicalEntry {
    /// Create a file entry with inline content
    pub fn file(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            is_file: true,
            data,
            children: Vec::new(),
        }
    }

    /// Create a directory entry with children
    pub fn directory(name: impl Into<String>, children: Vec<LogicalEntry>) -> Self {
        Self {
            name: name.into(),
            is_file: false,
            data: Vec::new(),
            children,
        }
    }
}

/// Owned [`FileEntry`] handle over a shared logical tree.
///
/// Holds the root plus the index path down to its node, so child handles
/// never borrow from the container.
pub struct MemoryFileEntry {
    root: Arc<LogicalEntry>,
    path: Vec<usize>,
    position: u64,
}

impl MemoryFileEntry {
    /// Entry for the tree root
    pub fn new(root: Arc<LogicalEntry>) -> Self {
        Self {
            root,
            path: Vec::new(),
            position: 0,
        }
    }

    fn node(&self) -> Result<&LogicalEntry> {
        let mut node: &LogicalEntry = &self.root;
        for &index in &self.path {
            node = node
                .children
                .get(index)
                .ok_or_else(|| Error::invalid_argument("logical entry index out of range"))?;
        }
        Ok(node)
    }
}

impl FileEntry for MemoryFileEntry {
    fn name(&self) -> Result<String> {
        Ok(self.node()?.name.clone())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.node()?.data.len() as u64)
    }

    fn is_file(&self) -> Result<bool> {
        Ok(self.node()?.is_file)
    }

    fn number_of_children(&self) -> Result<usize> {
        Ok(self.node()?.children.len())
    }

    fn child(&self, index: usize) -> Result<Box<dyn FileEntry>> {
        if index >= self.node()?.children.len() {
            return Err(Error::invalid_argument(format!(
                "child index {} out of range",
                index
            )));
        }
        let mut path = self.path.clone();
        path.push(index);
        Ok(Box::new(MemoryFileEntry {
            root: Arc::clone(&self.root),
            path,
            position: 0,
        }))
    }

    fn seek(&mut self, offset: u64) -> Result<u64> {
        let size = self.size()?;
        if offset > size {
            return Err(Error::invalid_argument(format!(
                "offset {} beyond entry size {}",
                offset, size
            )));
        }
        self.position = offset;
        Ok(self.position)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let node = self.node()?;
        let start = self.position as usize;
        let available = node.data.len().saturating_sub(start);
        let count = buf.len().min(available);
        buf[..count].copy_from_slice(&node.data[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }
}
