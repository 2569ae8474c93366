//! Byte sources backing a tree store.
//!
//! Every read names its own offset. No source keeps a shared cursor, so
//! any number of walks can read the same source from different threads.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

/// Random-access, read-only bytes.
pub trait ByteSource: Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Fills `buf` from `offset`. Fails with `UnexpectedEof` if the source
    /// ends first.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn eof(offset: u64, wanted: usize, len: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("read of {} bytes at {} past end ({})", wanted, offset, len),
    )
}

fn copy_from_slice(bytes: &[u8], offset: u64, buf: &mut [u8]) -> io::Result<()> {
    let len = bytes.len() as u64;
    let end = offset
        .checked_add(buf.len() as u64)
        .filter(|end| *end <= len)
        .ok_or_else(|| eof(offset, buf.len(), len))?;
    buf.copy_from_slice(&bytes[offset as usize..end as usize]);
    Ok(())
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        copy_from_slice(self, offset, buf)
    }
}

/// A read-only memory map over the whole file.
pub struct MmapSource {
    // memmap2 refuses zero-length maps; an empty file maps to `None`
    map: Option<Mmap>,
    path: PathBuf,
}

impl MmapSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let map = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: the map is read-only. Truncating the file underneath
            // a live map is outside what this store supports.
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(Self {
            map,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for MmapSource {
    fn len(&self) -> u64 {
        self.map.as_ref().map_or(0, |m| m.len() as u64)
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        match &self.map {
            Some(map) => copy_from_slice(map, offset, buf),
            None if buf.is_empty() => Ok(()),
            None => Err(eof(offset, buf.len(), 0)),
        }
    }
}

/// A file handle read with positioned reads (`pread` on unix).
pub struct FileSource {
    file: File,
    len: u64,
    path: PathBuf,
}

impl FileSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            len,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    #[cfg(unix)]
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        while !buf.is_empty() {
            match self.file.seek_read(buf, offset) {
                Ok(0) => return Err(eof(offset, buf.len(), self.len)),
                Ok(n) => {
                    buf = &mut std::mem::take(&mut buf)[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// The file-backed source picked at open time by [`crate::Backend`].
pub enum FileBacked {
    Mmap(MmapSource),
    Positioned(FileSource),
}

impl FileBacked {
    pub fn path(&self) -> &Path {
        match self {
            FileBacked::Mmap(s) => s.path(),
            FileBacked::Positioned(s) => s.path(),
        }
    }
}

impl ByteSource for FileBacked {
    fn len(&self) -> u64 {
        match self {
            FileBacked::Mmap(s) => s.len(),
            FileBacked::Positioned(s) => s.len(),
        }
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        match self {
            FileBacked::Mmap(s) => s.read_exact_at(offset, buf),
            FileBacked::Positioned(s) => s.read_exact_at(offset, buf),
        }
    }
}
