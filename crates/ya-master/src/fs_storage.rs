//! Filesystem-backed sound file storage.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use ya_engine::{SoundFile, Storage};

/// Resolves paths relative to a root directory.
#[derive(Clone, Debug)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FsStorage {
    type File = FsFile;

    fn open(&mut self, path: &str) -> Option<FsFile> {
        let full = self.root.join(path);
        let file = match File::open(&full) {
            Ok(f) => f,
            Err(e) => {
                log::debug!("open {}: {}", full.display(), e);
                return None;
            }
        };
        let remaining = file.metadata().map(|m| m.len()).unwrap_or(0);
        Some(FsFile { file, remaining })
    }
}

/// An open file with a count of unread bytes.
#[derive(Debug)]
pub struct FsFile {
    file: File,
    remaining: u64,
}

impl SoundFile for FsFile {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        loop {
            match self.file.read(buf) {
                Ok(n) => {
                    self.remaining = self.remaining.saturating_sub(n as u64);
                    if n == 0 {
                        self.remaining = 0;
                    }
                    return n;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("read error: {}", e);
                    self.remaining = 0;
                    return 0;
                }
            }
        }
    }

    fn available(&mut self) -> bool {
        self.remaining > 0
    }
}
