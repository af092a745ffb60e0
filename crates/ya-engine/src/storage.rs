//! Storage collaborator: named, sequentially readable sound files.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// An open file. Dropping it closes it.
pub trait SoundFile {
    /// Read up to `buf.len()` bytes, returning how many were read.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Whether unread bytes remain.
    fn available(&mut self) -> bool;
}

/// Something that can open sound files by path.
pub trait Storage {
    type File: SoundFile;

    fn open(&mut self, path: &str) -> Option<Self::File>;
}

/// Read until `buf` is full or the file stops yielding bytes.
pub fn read_full<F: SoundFile + ?Sized>(file: &mut F, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]);
        if n == 0 {
            break;
        }
        filled += n;
    }
    filled
}

/// Sound files held in memory, e.g. blobs linked into flash.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.insert(String::from(path), Arc::from(data.into()));
    }
}

impl Storage for MemoryStorage {
    type File = MemoryFile;

    fn open(&mut self, path: &str) -> Option<MemoryFile> {
        self.files.get(path).map(|data| MemoryFile {
            data: data.clone(),
            pos: 0,
        })
    }
}

/// Read cursor over an in-memory file.
#[derive(Clone, Debug)]
pub struct MemoryFile {
    data: Arc<[u8]>,
    pos: usize,
}

impl SoundFile for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn available(&mut self) -> bool {
        self.pos < self.data.len()
    }
}
