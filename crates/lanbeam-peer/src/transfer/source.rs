//! Where outgoing file bytes come from.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::error::TransferError;

/// Mime type used when the caller does not give one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub enum FileSource {
    Memory(Bytes),
    /// Read sequentially from disk when the job runs.
    Path(PathBuf),
}

/// A file queued for sending.
#[derive(Debug, Clone)]
pub struct OutgoingFile {
    pub name: String,
    pub mime_type: String,
    pub source: FileSource,
}

impl OutgoingFile {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            source: FileSource::Memory(data.into()),
        }
    }

    /// Named after the path's final component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Self {
            name,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            source: FileSource::Path(path),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// Sequential chunked reader over a [`FileSource`].
pub(crate) enum ChunkReader {
    Memory {
        data: Bytes,
        offset: usize,
    },
    File {
        file: tokio::fs::File,
        total: u64,
        read: u64,
    },
}

impl ChunkReader {
    /// Open the source. Returns the reader and the total size.
    pub(crate) async fn open(source: &FileSource) -> Result<(Self, u64), TransferError> {
        match source {
            FileSource::Memory(data) => Ok((
                ChunkReader::Memory {
                    data: data.clone(),
                    offset: 0,
                },
                data.len() as u64,
            )),
            FileSource::Path(path) => open_file(path).await,
        }
    }

    /// The next slice of at most `chunk_size` bytes, or `None` at the end.
    /// A zero `chunk_size` is an error since it would never advance.
    pub(crate) async fn next_chunk(
        &mut self,
        chunk_size: usize,
    ) -> Result<Option<Bytes>, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize(chunk_size));
        }
        match self {
            ChunkReader::Memory { data, offset } => {
                if *offset >= data.len() {
                    return Ok(None);
                }
                let end = (*offset + chunk_size).min(data.len());
                let chunk = data.slice(*offset..end);
                *offset = end;
                Ok(Some(chunk))
            }
            ChunkReader::File { file, total, read } => {
                let remaining = *total - *read;
                if remaining == 0 {
                    return Ok(None);
                }
                let want = remaining.min(chunk_size as u64) as usize;
                let mut buf = vec![0u8; want];
                let mut filled = 0;
                while filled < want {
                    let n = file.read(&mut buf[filled..]).await?;
                    if n == 0 {
                        return Err(TransferError::Truncated {
                            expected: *total,
                            read: *read + filled as u64,
                        });
                    }
                    filled += n;
                }
                *read += want as u64;
                Ok(Some(Bytes::from(buf)))
            }
        }
    }
}

async fn open_file(path: &Path) -> Result<(ChunkReader, u64), TransferError> {
    let file = tokio::fs::File::open(path).await?;
    let total = file.metadata().await?.len();
    Ok((
        ChunkReader::File {
            file,
            total,
            read: 0,
        },
        total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_source_slices() {
        let data = Bytes::from(vec![7u8; 10]);
        let (mut reader, total) = ChunkReader::open(&FileSource::Memory(data))
            .await
            .unwrap();
        assert_eq!(total, 10);
        let mut sizes = Vec::new();
        while let Some(chunk) = reader.next_chunk(4).await.unwrap() {
            sizes.push(chunk.len());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let data = Bytes::from(vec![7u8; 10]);
        let (mut reader, _) = ChunkReader::open(&FileSource::Memory(data))
            .await
            .unwrap();
        assert!(matches!(
            reader.next_chunk(0).await,
            Err(TransferError::InvalidChunkSize(0))
        ));
    }

    #[tokio::test]
    async fn path_source_reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let data: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let file = OutgoingFile::from_path(&path).with_mime_type("text/plain");
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.mime_type, "text/plain");

        let (mut reader, total) = ChunkReader::open(&file.source).await.unwrap();
        assert_eq!(total, 1000);
        let mut out = Vec::new();
        while let Some(chunk) = reader.next_chunk(300).await.unwrap() {
            out.extend_from_slice(&chunk);
        }
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn missing_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ChunkReader::open(&FileSource::Path(dir.path().join("nope"))).await;
        assert!(matches!(result, Err(TransferError::Io(_))));
    }

    #[test]
    fn default_mime_type() {
        let file = OutgoingFile::from_bytes("a.bin", vec![1u8]);
        assert_eq!(file.mime_type, DEFAULT_MIME_TYPE);
    }
}
