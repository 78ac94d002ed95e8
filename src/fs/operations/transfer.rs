//! Whole-file reads, writes and file transfers.
//!
//! Everything here goes through [`StorageFile`] only, so it works the same on
//! every backend and across backends. Each operation opens a fresh stream and
//! closes it on every exit path; for object stores the close is what commits
//! a write.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Result, StorageError};
use crate::fs::entry::{DeleteOptions, StorageDirectory, StorageFile, TransferOptions, settle};
use crate::fs::stream::{AccessType, FileStream};

/// Close whatever is open on `file`, then open it fresh.
async fn reopen<F>(file: &mut F, access: AccessType) -> Result<&mut FileStream>
where
    F: StorageFile + ?Sized,
{
    file.close_stream().await?;
    file.open_stream(access).await
}

/// The operation's error wins over the close error.
fn finish<T>(result: Result<T>, closed: Result<()>) -> Result<T> {
    let value = result?;
    closed?;
    Ok(value)
}

async fn drain<F>(file: &mut F) -> Result<Vec<u8>>
where
    F: StorageFile + ?Sized,
{
    let stream = reopen(file, AccessType::Read).await?;
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

async fn fill<F>(file: &mut F, bytes: &[u8]) -> Result<()>
where
    F: StorageFile + ?Sized,
{
    let stream = reopen(file, AccessType::Write).await?;
    stream.write_all(bytes).await?;
    stream.flush().await?;
    Ok(())
}

async fn pump<F>(source: &mut F, target: &mut dyn StorageFile) -> Result<u64>
where
    F: StorageFile + ?Sized,
{
    let reader = reopen(source, AccessType::Read).await?;
    let writer = reopen(target, AccessType::Write).await?;
    let copied = tokio::io::copy(&mut *reader, &mut *writer).await?;
    writer.flush().await?;
    Ok(copied)
}

/// Stream `source` into `target`. Errors are returned, not logged.
async fn copy_file<F>(source: &mut F, target: &mut dyn StorageFile, overwrite: bool) -> Result<()>
where
    F: StorageFile + ?Sized,
{
    if !overwrite && target.exists().await? {
        return Err(StorageError::AlreadyExists(target.full_name().to_string()));
    }

    let result = pump(source, target).await;
    let source_closed = source.close_stream().await;
    let target_closed = target.close_stream().await;
    finish(finish(result, target_closed), source_closed).map(|_| ())
}

fn utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

/// Content and transfer operations available on every file handle.
#[async_trait]
pub trait FileExt: StorageFile {
    /// Close any open stream and open a fresh one with `access`.
    async fn reset_stream(&mut self, access: AccessType) -> Result<&mut FileStream>;

    /// Read the whole content.
    async fn read_all_bytes(&mut self) -> Result<Vec<u8>>;

    /// Read the whole content as UTF-8.
    async fn read_all_text(&mut self) -> Result<String>;

    /// Read the content split on line breaks (`\n` or `\r\n`).
    async fn read_all_lines(&mut self) -> Result<Vec<String>>;

    /// Replace the content.
    async fn write_all_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Replace the content with `text`.
    async fn write_all_text(&mut self, text: &str) -> Result<()>;

    /// Replace the content with `lines`, each terminated by `\n`.
    async fn write_all_lines<L>(&mut self, lines: &[L]) -> Result<()>
    where
        L: AsRef<str> + Sync;

    /// Copy the content into `target`.
    ///
    /// An existing target fails with `AlreadyExists` unless `overwrite`.
    /// `recurse` is ignored.
    async fn copy_to(&mut self, target: &mut dyn StorageFile, options: TransferOptions)
    -> Result<()>;

    /// Copy into `target`, then delete this file. The source is kept when the
    /// copy fails.
    async fn move_to(&mut self, target: &mut dyn StorageFile, options: TransferOptions)
    -> Result<()>;

    /// Copy into `directory`, keeping the file name.
    async fn copy_to_directory(
        &mut self,
        directory: &dyn StorageDirectory,
        options: TransferOptions,
    ) -> Result<()>;

    /// Move into `directory`, keeping the file name.
    async fn move_to_directory(
        &mut self,
        directory: &dyn StorageDirectory,
        options: TransferOptions,
    ) -> Result<()>;
}

/// File handle for `self.name()` inside `directory`.
fn destination<F>(file: &F, directory: &dyn StorageDirectory) -> Result<Box<dyn StorageFile>>
where
    F: StorageFile + ?Sized,
{
    directory.child_file(file.name())
}

#[async_trait]
impl<T> FileExt for T
where
    T: StorageFile + ?Sized,
{
    async fn reset_stream(&mut self, access: AccessType) -> Result<&mut FileStream> {
        reopen(self, access).await
    }

    async fn read_all_bytes(&mut self) -> Result<Vec<u8>> {
        let result = drain(self).await;
        let closed = self.close_stream().await;
        finish(result, closed)
    }

    async fn read_all_text(&mut self) -> Result<String> {
        utf8(self.read_all_bytes().await?)
    }

    async fn read_all_lines(&mut self) -> Result<Vec<String>> {
        let text = self.read_all_text().await?;
        Ok(text.lines().map(str::to_string).collect())
    }

    async fn write_all_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let result = fill(self, bytes).await;
        let closed = self.close_stream().await;
        finish(result, closed)
    }

    async fn write_all_text(&mut self, text: &str) -> Result<()> {
        self.write_all_bytes(text.as_bytes()).await
    }

    async fn write_all_lines<L>(&mut self, lines: &[L]) -> Result<()>
    where
        L: AsRef<str> + Sync,
    {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        self.write_all_bytes(text.as_bytes()).await
    }

    async fn copy_to(
        &mut self,
        target: &mut dyn StorageFile,
        options: TransferOptions,
    ) -> Result<()> {
        let logger = self.logger().clone();
        let result = copy_file(self, target, options.overwrite).await;
        if result.is_ok() && options.verbose {
            logger.info(format!(
                "Copied File [{}] to [{}].",
                self.full_name(),
                target.full_name()
            ));
        }
        settle(&logger, result, options.stop_on_error)
    }

    async fn move_to(
        &mut self,
        target: &mut dyn StorageFile,
        options: TransferOptions,
    ) -> Result<()> {
        let logger = self.logger().clone();
        let copied = copy_file(self, target, options.overwrite).await;
        if copied.is_err() {
            return settle(&logger, copied, options.stop_on_error);
        }

        // `delete` logs its own failure.
        let removal = DeleteOptions::default()
            .with_stop_on_error(true)
            .with_verbose(false);
        if let Err(e) = self.delete(removal).await {
            return if options.stop_on_error { Err(e) } else { Ok(()) };
        }

        if options.verbose {
            logger.info(format!(
                "Moved File [{}] to [{}].",
                self.full_name(),
                target.full_name()
            ));
        }
        Ok(())
    }

    async fn copy_to_directory(
        &mut self,
        directory: &dyn StorageDirectory,
        options: TransferOptions,
    ) -> Result<()> {
        match destination(self, directory) {
            Ok(mut target) => self.copy_to(target.as_mut(), options).await,
            Err(e) => settle(self.logger(), Err(e), options.stop_on_error),
        }
    }

    async fn move_to_directory(
        &mut self,
        directory: &dyn StorageDirectory,
        options: TransferOptions,
    ) -> Result<()> {
        match destination(self, directory) {
            Ok(mut target) => self.move_to(target.as_mut(), options).await,
            Err(e) => settle(self.logger(), Err(e), options.stop_on_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::local::{LocalDirectory, LocalFile};
    use crate::log::{Logger, MemorySink};
    use rand::RngCore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn local(tmp: &TempDir, name: &str, sink: &Arc<MemorySink>) -> LocalFile {
        let path = tmp.path().join(name);
        LocalFile::new(path.to_str().unwrap(), Logger::new(sink.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_round_trips() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut file = local(&tmp, "data.bin", &sink);

        let mut payload = vec![0u8; 64 * 1024 + 7];
        rand::thread_rng().fill_bytes(&mut payload);
        file.write_all_bytes(&payload).await.unwrap();
        assert!(!file.is_open());
        assert_eq!(file.read_all_bytes().await.unwrap(), payload);

        file.write_all_text("hello").await.unwrap();
        assert_eq!(file.read_all_text().await.unwrap(), "hello");

        file.write_all_lines(&["alpha", "", "gamma"]).await.unwrap();
        assert_eq!(file.read_all_lines().await.unwrap(), ["alpha", "", "gamma"]);
        assert!(!file.is_open());
    }

    #[tokio::test]
    async fn test_reset_stream_switches_mode() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut file = local(&tmp, "switch.txt", &sink);

        file.reset_stream(AccessType::Write)
            .await
            .unwrap()
            .write_all(b"abc")
            .await
            .unwrap();
        let stream = file.reset_stream(AccessType::Read).await.unwrap();
        assert!(stream.can_read());
        let mut text = String::new();
        stream.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "abc");
        file.close_stream().await.unwrap();
    }

    #[tokio::test]
    async fn test_copy_respects_overwrite() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut source = local(&tmp, "src.txt", &sink);
        let mut target = local(&tmp, "dst.txt", &sink);
        source.write_all_text("new").await.unwrap();
        target.write_all_text("old").await.unwrap();

        let keep = TransferOptions::default().with_overwrite(false);
        let err = source.copy_to(&mut target, keep).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(target.read_all_text().await.unwrap(), "old");

        source
            .copy_to(&mut target, keep.with_stop_on_error(false))
            .await
            .unwrap();
        assert_eq!(sink.error_count(), 2);

        source.copy_to(&mut target, TransferOptions::default()).await.unwrap();
        assert_eq!(target.read_all_text().await.unwrap(), "new");
        assert!(source.exists().await.unwrap());
        assert!(sink
            .messages()
            .iter()
            .any(|m| m.starts_with("Copied File [")));
    }

    #[tokio::test]
    async fn test_move_keeps_source_when_copy_fails() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut source = local(&tmp, "missing.txt", &sink);
        let mut target = local(&tmp, "never.txt", &sink);

        let err = source
            .move_to(&mut target, TransferOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let mut present = local(&tmp, "present.txt", &sink);
        present.write_all_text("stay").await.unwrap();
        target.write_all_text("taken").await.unwrap();
        present
            .move_to(
                &mut target,
                TransferOptions::default()
                    .with_overwrite(false)
                    .with_stop_on_error(false),
            )
            .await
            .unwrap();
        assert!(present.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_move_to_directory() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut source = local(&tmp, "report.csv", &sink);
        source.write_all_lines(&["a,b", "1,2"]).await.unwrap();

        let dir_path = format!("{}/archive/", tmp.path().to_str().unwrap());
        let archive = LocalDirectory::new(&dir_path, Logger::new(sink.clone())).unwrap();
        archive.create(false).await.unwrap();

        source
            .move_to_directory(&archive, TransferOptions::default())
            .await
            .unwrap();
        assert!(!source.exists().await.unwrap());

        let mut moved = archive.create_file(&format!("{}report.csv", dir_path)).unwrap();
        assert_eq!(moved.read_all_lines().await.unwrap(), ["a,b", "1,2"]);
    }
}
