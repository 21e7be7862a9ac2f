//! Response body buffers.
//!
//! A response body travels through the output pipeline as one or more batches.
//! Each batch is a [`BufferChain`]: an ordered list of [`Buffer`]s that are either
//! resident in memory or describe a byte window of an open file. The buffer
//! flagged `last` marks the end of the body; every stage that replaces it must
//! carry the flag over to the replacement.

use std::fs::File;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use futures_util::{StreamExt, stream};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// A byte window of an open file.
#[derive(Clone, Debug)]
pub struct FileRegion {
    file: Arc<File>,
    path: PathBuf,
    offset: u64,
    len: u64,
}

impl FileRegion {
    /// Describe `len` bytes of `file` starting at `offset`.
    #[must_use]
    pub fn new(file: Arc<File>, path: impl Into<PathBuf>, offset: u64, len: u64) -> Self {
        Self {
            file,
            path: path.into(),
            offset,
            len,
        }
    }

    /// Path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start of the window.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the window.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Narrow the window to `len` bytes starting `skip` bytes in.
    #[must_use]
    pub fn slice(&self, skip: u64, len: u64) -> Self {
        let skip = skip.min(self.len);
        Self {
            file: Arc::clone(&self.file),
            path: self.path.clone(),
            offset: self.offset + skip,
            len: len.min(self.len - skip),
        }
    }

    /// Read the bytes of the window.
    pub async fn read(&self) -> std::io::Result<Bytes> {
        let data = self.read_from(self.offset, Some(self.len)).await?;
        if data.len() as u64 != self.len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("{} shrank while being served", self.path.display()),
            ));
        }
        Ok(Bytes::from(data))
    }

    /// Read the complete backing file, regardless of the window.
    pub async fn read_file(&self) -> std::io::Result<Vec<u8>> {
        self.read_from(0, None).await
    }

    async fn read_from(&self, offset: u64, limit: Option<u64>) -> std::io::Result<Vec<u8>> {
        let mut file = tokio::fs::File::from_std(self.file.try_clone()?);
        file.seek(SeekFrom::Start(offset)).await?;

        let capacity = usize::try_from(limit.unwrap_or(self.len)).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        match limit {
            Some(limit) => file.take(limit).read_to_end(&mut data).await?,
            None => file.read_to_end(&mut data).await?,
        };
        Ok(data)
    }
}

/// Contents of a buffer.
#[derive(Clone, Debug)]
pub enum BufferData {
    /// Bytes already in memory.
    Memory(Bytes),
    /// Bytes still to be read from a file.
    File(FileRegion),
}

/// A single link of a buffer chain.
#[derive(Clone, Debug)]
pub struct Buffer {
    /// Where the bytes live.
    pub data: BufferData,
    /// Marks the end of the response body.
    pub last: bool,
}

impl Buffer {
    /// Memory-resident buffer.
    #[must_use]
    pub fn memory(bytes: impl Into<Bytes>) -> Self {
        Self {
            data: BufferData::Memory(bytes.into()),
            last: false,
        }
    }

    /// File-backed buffer.
    #[must_use]
    pub fn file(region: FileRegion) -> Self {
        Self {
            data: BufferData::File(region),
            last: false,
        }
    }

    /// Mark the buffer as the end of the body.
    #[must_use]
    pub fn terminal(mut self) -> Self {
        self.last = true;
        self
    }

    /// Whether the bytes have to be read from a file.
    #[must_use]
    pub fn is_file_backed(&self) -> bool {
        matches!(self.data, BufferData::File(_))
    }

    /// Number of bytes the buffer contributes to the body.
    #[must_use]
    pub fn len(&self) -> u64 {
        match &self.data {
            BufferData::Memory(bytes) => bytes.len() as u64,
            BufferData::File(region) => region.len(),
        }
    }

    /// Whether the buffer contributes no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Narrow the buffer to `len` bytes starting `skip` bytes in, keeping `last`.
    #[must_use]
    pub fn slice(&self, skip: u64, len: u64) -> Self {
        let data = match &self.data {
            BufferData::Memory(bytes) => {
                let start = usize::try_from(skip).map_or(bytes.len(), |s| s.min(bytes.len()));
                let end = usize::try_from(len)
                    .map_or(bytes.len(), |l| start.saturating_add(l).min(bytes.len()));
                BufferData::Memory(bytes.slice(start..end))
            }
            BufferData::File(region) => BufferData::File(region.slice(skip, len)),
        };
        Self {
            data,
            last: self.last,
        }
    }

    /// Load the buffer contents.
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.data {
            BufferData::Memory(bytes) => Ok(bytes.clone()),
            BufferData::File(region) => region.read().await,
        }
    }
}

/// Index of the buffer marking the end of the body, if the batch holds it.
#[must_use]
pub fn find_terminal(buffers: &[Buffer]) -> Option<usize> {
    buffers.iter().position(|buffer| buffer.last)
}

/// An ordered batch of buffers.
#[derive(Clone, Debug, Default)]
pub struct BufferChain {
    buffers: Vec<Buffer>,
}

impl BufferChain {
    /// Empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain holding a single buffer.
    #[must_use]
    pub fn single(buffer: Buffer) -> Self {
        Self {
            buffers: vec![buffer],
        }
    }

    /// Append a buffer.
    pub fn push(&mut self, buffer: Buffer) {
        self.buffers.push(buffer);
    }

    /// Append every buffer of `other`.
    pub fn append(&mut self, other: Self) {
        self.buffers.extend(other.buffers);
    }

    /// Buffers in order.
    #[must_use]
    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    /// Swap the buffer at `index` for `buffer`, returning the old one.
    pub fn replace(&mut self, index: usize, buffer: Buffer) -> Buffer {
        std::mem::replace(&mut self.buffers[index], buffer)
    }

    /// Index of the terminal buffer within this batch.
    #[must_use]
    pub fn terminal_index(&self) -> Option<usize> {
        find_terminal(&self.buffers)
    }

    /// Number of buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the chain holds no buffers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total number of body bytes in the chain.
    #[must_use]
    pub fn content_len(&self) -> u64 {
        self.buffers.iter().map(Buffer::len).sum()
    }

    /// Stream the chain as a response body, reading file-backed buffers lazily.
    #[must_use]
    pub fn into_body(self) -> Body {
        let stream = stream::iter(self.buffers).then(|buffer| async move { buffer.read().await });
        Body::from_stream(stream)
    }
}

impl FromIterator<Buffer> for BufferChain {
    fn from_iter<I: IntoIterator<Item = Buffer>>(iter: I) -> Self {
        Self {
            buffers: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for BufferChain {
    type Item = Buffer;
    type IntoIter = std::vec::IntoIter<Buffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffers.into_iter()
    }
}
