//! Single-mode streams owned by file entries.

use std::io;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::error::{Result, StorageError};

/// Boxed backend reader.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Boxed backend writer. Shutting it down commits the content.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Access mode a stream is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Read the existing content
    Read,
    /// Replace the content
    Write,
}

enum Inner {
    Reader(BoxedReader),
    Writer(BoxedWriter),
}

fn wrong_access(path: &str, access: AccessType, wanted: AccessType) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!(
            "stream for [{}] is open for {:?}, not {:?}",
            path, access, wanted
        ),
    )
}

/// An open stream on a file entry.
///
/// Implements both [`AsyncRead`] and [`AsyncWrite`]; the direction it was not
/// opened for fails with [`io::ErrorKind::Unsupported`].
pub struct FileStream {
    path: String,
    access: AccessType,
    // Only reached through `&mut self`; the mutex is there to make handles `Sync`.
    inner: Mutex<Inner>,
}

impl FileStream {
    /// Wrap a backend reader.
    pub fn reader(path: impl Into<String>, reader: BoxedReader) -> Self {
        Self {
            path: path.into(),
            access: AccessType::Read,
            inner: Mutex::new(Inner::Reader(reader)),
        }
    }

    /// Wrap a backend writer.
    pub fn writer(path: impl Into<String>, writer: BoxedWriter) -> Self {
        Self {
            path: path.into(),
            access: AccessType::Write,
            inner: Mutex::new(Inner::Writer(writer)),
        }
    }

    /// Full name of the file this stream belongs to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The mode this stream was opened with.
    pub fn access(&self) -> AccessType {
        self.access
    }

    /// Check if the stream can be read from.
    pub fn can_read(&self) -> bool {
        self.access == AccessType::Read
    }

    /// Check if the stream can be written to.
    pub fn can_write(&self) -> bool {
        self.access == AccessType::Write
    }

    /// Release the stream. For writers this flushes and commits the content.
    pub async fn close(self) -> io::Result<()> {
        match self.inner.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Inner::Reader(_) => Ok(()),
            Inner::Writer(mut writer) => writer.shutdown().await,
        }
    }
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("path", &self.path)
            .field("access", &self.access)
            .finish()
    }
}

impl AsyncRead for FileStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let FileStream {
            path,
            access,
            inner,
        } = self.get_mut();
        match inner.get_mut().unwrap_or_else(PoisonError::into_inner) {
            Inner::Reader(reader) => Pin::new(reader).poll_read(cx, buf),
            Inner::Writer(_) => Poll::Ready(Err(wrong_access(path, *access, AccessType::Read))),
        }
    }
}

impl AsyncWrite for FileStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let FileStream {
            path,
            access,
            inner,
        } = self.get_mut();
        match inner.get_mut().unwrap_or_else(PoisonError::into_inner) {
            Inner::Writer(writer) => Pin::new(writer).poll_write(cx, buf),
            Inner::Reader(_) => Poll::Ready(Err(wrong_access(path, *access, AccessType::Write))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().inner.get_mut().unwrap_or_else(PoisonError::into_inner) {
            Inner::Writer(writer) => Pin::new(writer).poll_flush(cx),
            Inner::Reader(_) => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().inner.get_mut().unwrap_or_else(PoisonError::into_inner) {
            Inner::Writer(writer) => Pin::new(writer).poll_shutdown(cx),
            Inner::Reader(_) => Poll::Ready(Ok(())),
        }
    }
}

/// Holder for the single stream a file entry may have open.
#[derive(Debug, Default)]
pub struct StreamSlot {
    stream: Option<FileStream>,
}

impl StreamSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode of the open stream, if any.
    pub fn access(&self) -> Option<AccessType> {
        self.stream.as_ref().map(FileStream::access)
    }

    /// Check if a stream is open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Check if an open stream can be reused for `access`.
    ///
    /// Returns `false` when nothing is open. A stream open in the other mode
    /// is an error; it has to be closed first.
    pub fn holds(&self, access: AccessType) -> Result<bool> {
        match &self.stream {
            None => Ok(false),
            Some(stream) if stream.access() == access => Ok(true),
            Some(stream) => Err(StorageError::WrongAccess(format!(
                "[{}] is already open for {:?}",
                stream.path(),
                stream.access()
            ))),
        }
    }

    /// The open stream.
    pub fn current(&mut self) -> Result<&mut FileStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| StorageError::Custom("no stream is open".to_string()))
    }

    /// Store a freshly opened stream and hand it back.
    pub fn put(&mut self, stream: FileStream) -> &mut FileStream {
        self.stream.insert(stream)
    }

    /// Close the open stream, if any. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.close().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_reader_rejects_writes() {
        let mut stream = FileStream::reader("mem.txt", Box::new(&b"abc"[..]));
        assert!(stream.can_read());
        assert!(!stream.can_write());

        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "abc");

        let err = stream.write_all(b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        stream.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_writer_rejects_reads() {
        let mut stream = FileStream::writer("mem.txt", Box::new(Vec::<u8>::new()));
        assert_eq!(stream.access(), AccessType::Write);

        stream.write_all(b"payload").await.unwrap();
        let mut buf = Vec::new();
        let err = stream.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        stream.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_slot_reuse_and_close() {
        let mut slot = StreamSlot::new();
        assert!(!slot.holds(AccessType::Read).unwrap());
        assert!(slot.current().is_err());

        slot.put(FileStream::reader("a.txt", Box::new(&b""[..])));
        assert!(slot.holds(AccessType::Read).unwrap());
        let err = slot.holds(AccessType::Write).unwrap_err();
        assert!(matches!(err, StorageError::WrongAccess(_)));
        assert_eq!(slot.access(), Some(AccessType::Read));

        slot.close().await.unwrap();
        slot.close().await.unwrap();
        assert!(!slot.is_open());
    }
}
