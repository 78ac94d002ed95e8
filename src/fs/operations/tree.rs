//! Recursive directory operations.
//!
//! Written once against [`StorageDirectory`] so that copy, move and purge
//! behave the same on every backend and between backends.
//!
//! Every child is handled on its own. A failure is logged where it happens;
//! with `stop_on_error` it ends the walk, otherwise it is counted and the walk
//! carries on with the next sibling. Errors handed back up the recursion have
//! already been logged.

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::transfer::FileExt;
use crate::error::{Result, StorageError};
use crate::fs::entry::{DeleteOptions, StorageDirectory, TransferOptions};
use crate::log::Logger;

/// Log `e` and either end the walk or count it.
fn absorb(logger: &Logger, e: StorageError, stop_on_error: bool) -> Result<usize> {
    logger.error(&e);
    if stop_on_error { Err(e) } else { Ok(1) }
}

/// Create the counterpart of `child` inside `target`.
async fn mirror_directory(
    child: &dyn StorageDirectory,
    target: &dyn StorageDirectory,
) -> Result<Box<dyn StorageDirectory>> {
    let mirror = target.child_directory(child.name())?;
    mirror.create(false).await?;
    Ok(mirror)
}

/// Fail with `NotFound` unless `source` exists.
async fn require<S>(source: &S) -> Result<()>
where
    S: StorageDirectory + ?Sized,
{
    if source.exists().await? {
        Ok(())
    } else {
        Err(StorageError::NotFound(source.full_name().to_string()))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Copy,
    Move,
}

/// Copy or move the children of `source` into `target`.
///
/// Returns the number of failures that were logged and skipped.
fn transfer_tree<'a, S>(
    source: &'a S,
    target: &'a dyn StorageDirectory,
    mode: Mode,
    options: TransferOptions,
) -> BoxFuture<'a, Result<usize>>
where
    S: StorageDirectory + ?Sized,
{
    Box::pin(async move {
        let logger = source.logger().clone();
        let stop = options.stop_on_error;

        if let Err(e) = require(source).await {
            return absorb(&logger, e, stop);
        }

        let mut failures = 0;

        let directories = match source.get_directories().await {
            Ok(directories) => directories,
            Err(e) => return absorb(&logger, e, stop),
        };
        for child in &directories {
            let mirror = match mirror_directory(child.as_ref(), target).await {
                Ok(mirror) => mirror,
                Err(e) => {
                    failures += absorb(&logger, e, stop)?;
                    continue;
                }
            };

            match mode {
                Mode::Copy if options.recurse => {
                    failures += transfer_tree(child.as_ref(), mirror.as_ref(), mode, options).await?;
                }
                Mode::Copy => {}
                Mode::Move => {
                    failures += transfer_tree(child.as_ref(), mirror.as_ref(), mode, options).await?;
                    // Only empty once every grandchild moved; leftovers make
                    // this fail with `NotEmpty` and stay in place.
                    let emptied = DeleteOptions::default()
                        .with_recurse(false)
                        .with_verbose(false);
                    if let Err(e) = child.delete(emptied).await {
                        if stop {
                            return Err(e);
                        }
                        failures += 1;
                    }
                }
            }
        }

        let files = match source.get_files().await {
            Ok(files) => files,
            Err(e) => return absorb(&logger, e, stop),
        };
        // File transfers log their own failures.
        let per_file = options.with_stop_on_error(true);
        for mut file in files {
            let mut destination = match target.child_file(file.name()) {
                Ok(destination) => destination,
                Err(e) => {
                    failures += absorb(&logger, e, stop)?;
                    continue;
                }
            };

            let outcome = match mode {
                Mode::Copy => file.copy_to(destination.as_mut(), per_file).await,
                Mode::Move => file.move_to(destination.as_mut(), per_file).await,
            };
            if let Err(e) = outcome {
                if stop {
                    return Err(e);
                }
                failures += 1;
            }
        }

        if options.verbose {
            let verb = match mode {
                Mode::Copy => "Copied",
                Mode::Move => "Moved",
            };
            if failures == 0 {
                logger.info(format!(
                    "{} Directory [{}] to [{}].",
                    verb,
                    source.full_name(),
                    target.full_name()
                ));
            } else {
                logger.info(format!(
                    "{} Directory [{}] to [{}] With {} Failure(s).",
                    verb,
                    source.full_name(),
                    target.full_name(),
                    failures
                ));
            }
        }

        Ok(failures)
    })
}

/// Delete every child of `directory`, keeping `directory` itself.
async fn purge_children<S>(directory: &S, options: DeleteOptions) -> Result<usize>
where
    S: StorageDirectory + ?Sized,
{
    let logger = directory.logger().clone();
    let stop = options.stop_on_error;
    // Child deletes log their own failures.
    let per_child = options.with_recurse(true).with_stop_on_error(true);
    let mut failures = 0;

    let directories = match directory.get_directories().await {
        Ok(directories) => directories,
        Err(e) => return absorb(&logger, e, stop),
    };
    for child in directories {
        if let Err(e) = child.delete(per_child).await {
            if stop {
                return Err(e);
            }
            failures += 1;
        }
    }

    let files = match directory.get_files().await {
        Ok(files) => files,
        Err(e) => return absorb(&logger, e, stop),
    };
    for mut file in files {
        if let Err(e) = file.delete(per_child).await {
            if stop {
                return Err(e);
            }
            failures += 1;
        }
    }

    Ok(failures)
}

fn collect_counts<'a, S>(
    directory: &'a S,
    counts: &'a mut Vec<(usize, usize)>,
) -> BoxFuture<'a, Result<()>>
where
    S: StorageDirectory + ?Sized,
{
    Box::pin(async move {
        let directories = directory.get_directories().await?;
        let files = directory.get_files().await?;
        counts.push((directories.len(), files.len()));
        for child in &directories {
            collect_counts(child.as_ref(), counts).await?;
        }
        Ok(())
    })
}

/// Tree operations available on every directory handle.
#[async_trait]
pub trait DirectoryExt: StorageDirectory {
    /// Check if the directory has no child directories and no files.
    async fn is_empty(&self) -> Result<bool>;

    /// Copy the children of this directory into `target`.
    ///
    /// Child directories are created in `target`; without `recurse` they stay
    /// empty. A missing source fails with `NotFound`.
    async fn copy_to(&self, target: &dyn StorageDirectory, options: TransferOptions)
    -> Result<()>;

    /// Move the children of this directory into `target`, always recursively.
    ///
    /// Moved child directories are deleted non-recursively afterwards; the
    /// directory itself stays in place, empty.
    async fn move_to(&self, target: &dyn StorageDirectory, options: TransferOptions)
    -> Result<()>;

    /// Delete every child, keeping the directory. `recurse` is ignored.
    async fn purge(&self, options: DeleteOptions) -> Result<()>;

    /// Same as [`purge`](DirectoryExt::purge).
    async fn clear(&self, options: DeleteOptions) -> Result<()>;

    /// `(directories, files)` for this directory and every directory below,
    /// in pre-order.
    async fn object_counts(&self) -> Result<Vec<(usize, usize)>>;

    /// Number of directories and files below this directory.
    async fn total_objects(&self) -> Result<usize>;
}

#[async_trait]
impl<T> DirectoryExt for T
where
    T: StorageDirectory + ?Sized,
{
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.get_directories().await?.is_empty() && self.get_files().await?.is_empty())
    }

    async fn copy_to(
        &self,
        target: &dyn StorageDirectory,
        options: TransferOptions,
    ) -> Result<()> {
        transfer_tree(self, target, Mode::Copy, options).await.map(|_| ())
    }

    async fn move_to(
        &self,
        target: &dyn StorageDirectory,
        options: TransferOptions,
    ) -> Result<()> {
        transfer_tree(self, target, Mode::Move, options).await.map(|_| ())
    }

    async fn purge(&self, options: DeleteOptions) -> Result<()> {
        purge_children(self, options).await.map(|_| ())
    }

    async fn clear(&self, options: DeleteOptions) -> Result<()> {
        self.purge(options).await
    }

    async fn object_counts(&self) -> Result<Vec<(usize, usize)>> {
        let mut counts = Vec::new();
        collect_counts(self, &mut counts).await?;
        Ok(counts)
    }

    async fn total_objects(&self) -> Result<usize> {
        Ok(self
            .object_counts()
            .await?
            .iter()
            .map(|(directories, files)| directories + files)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ObjectClient, ObjectInfo, ObjectPage, ObjectStoreClient};
    use crate::fs::local::LocalDirectory;
    use crate::fs::object::ObjectDirectory;
    use crate::fs::stream::{BoxedReader, BoxedWriter};
    use crate::log::MemorySink;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Object client that refuses to delete one key.
    #[derive(Debug)]
    struct LockedKey {
        inner: ObjectStoreClient,
        locked: &'static str,
    }

    #[async_trait]
    impl ObjectClient for LockedKey {
        async fn list_objects(
            &self,
            bucket: &str,
            prefix: &str,
            start_after: Option<&str>,
            max_keys: usize,
        ) -> Result<ObjectPage> {
            self.inner
                .list_objects(bucket, prefix, start_after, max_keys)
                .await
        }

        async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>> {
            self.inner.head_object(bucket, key).await
        }

        async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
            self.inner.put_object(bucket, key, body).await
        }

        async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
            if key == self.locked {
                return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied).into());
            }
            self.inner.delete_object(bucket, key).await
        }

        async fn open_read(&self, bucket: &str, key: &str) -> Result<BoxedReader> {
            self.inner.open_read(bucket, key).await
        }

        async fn open_write(&self, bucket: &str, key: &str) -> Result<BoxedWriter> {
            self.inner.open_write(bucket, key).await
        }
    }

    /// `top/` holding `a/1`, `b/locked`, `c.txt` and `d.txt`.
    async fn locked_tree() -> (Arc<dyn ObjectClient>, Arc<MemorySink>, ObjectDirectory) {
        let client: Arc<dyn ObjectClient> = Arc::new(LockedKey {
            inner: ObjectStoreClient::new().with_bucket("bucket", Arc::new(InMemory::new())),
            locked: "top/b/locked",
        });
        for key in ["top/", "top/a/1", "top/b/locked", "top/c.txt", "top/d.txt"] {
            client
                .put_object("bucket", key, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        let sink = Arc::new(MemorySink::new());
        let top =
            ObjectDirectory::new("s3://bucket/top/", client.clone(), Logger::new(sink.clone()))
                .unwrap();
        (client, sink, top)
    }

    async fn keys(client: &Arc<dyn ObjectClient>) -> Vec<String> {
        let mut keys: Vec<String> = client
            .list_all("bucket", "top/")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        keys.sort();
        keys
    }

    fn build(tmp: &TempDir, sink: &Arc<MemorySink>, rel: &str) -> LocalDirectory {
        let path = format!("{}/{}", tmp.path().to_str().unwrap(), rel);
        LocalDirectory::new(&path, Logger::new(sink.clone())).unwrap()
    }

    fn seed(tmp: &TempDir) {
        let root = tmp.path().join("src");
        std::fs::create_dir_all(root.join("one/two")).unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();
        std::fs::write(root.join("a.txt"), "hello").unwrap();
        std::fs::write(root.join("one/b.txt"), "b").unwrap();
        std::fs::write(root.join("one/two/c.txt"), "c").unwrap();
    }

    #[tokio::test]
    async fn test_copy_recursive() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        seed(&tmp);
        let source = build(&tmp, &sink, "src/");
        let target = build(&tmp, &sink, "dst/");
        target.create(false).await.unwrap();

        source.copy_to(&target, TransferOptions::default()).await.unwrap();

        assert_eq!(
            target.total_objects().await.unwrap(),
            source.total_objects().await.unwrap()
        );
        assert_eq!(source.total_objects().await.unwrap(), 6);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("dst/one/two/c.txt")).unwrap(),
            "c"
        );
        assert_eq!(sink.error_count(), 0);
    }

    #[tokio::test]
    async fn test_copy_shallow_creates_empty_children() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        seed(&tmp);
        let source = build(&tmp, &sink, "src/");
        let target = build(&tmp, &sink, "flat/");
        target.create(false).await.unwrap();

        source
            .copy_to(&target, TransferOptions::default().with_recurse(false))
            .await
            .unwrap();

        assert!(tmp.path().join("flat/one").is_dir());
        assert!(tmp.path().join("flat/a.txt").is_file());
        assert!(!tmp.path().join("flat/one/b.txt").exists());
        assert_eq!(target.object_counts().await.unwrap()[0], (2, 1));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let source = build(&tmp, &sink, "nowhere/");
        let target = build(&tmp, &sink, "dst/");

        let err = source
            .copy_to(&target, TransferOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        source
            .copy_to(&target, TransferOptions::default().with_stop_on_error(false))
            .await
            .unwrap();
        assert_eq!(sink.error_count(), 2);
        assert_eq!(
            sink.messages()[0],
            format!("ERROR - [{}] Does Not Exist.", source.full_name())
        );
    }

    #[tokio::test]
    async fn test_move_empties_source() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        seed(&tmp);
        let source = build(&tmp, &sink, "src/");
        let target = build(&tmp, &sink, "moved/");
        target.create(false).await.unwrap();
        let before = source.total_objects().await.unwrap();

        source.move_to(&target, TransferOptions::default()).await.unwrap();

        assert!(source.exists().await.unwrap());
        assert!(source.is_empty().await.unwrap());
        assert_eq!(target.total_objects().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_purge_keeps_directory() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        seed(&tmp);
        let source = build(&tmp, &sink, "src/");

        source.purge(DeleteOptions::default()).await.unwrap();
        assert!(source.exists().await.unwrap());
        assert!(source.is_empty().await.unwrap());

        source.clear(DeleteOptions::default()).await.unwrap();
        assert!(source.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_stops_at_first_failure() {
        let (client, sink, top) = locked_tree().await;

        let err = top.purge(DeleteOptions::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));

        // `a/` went before the failure; the files were never reached.
        assert_eq!(
            keys(&client).await,
            ["top/", "top/b/locked", "top/c.txt", "top/d.txt"]
        );
        assert_eq!(sink.error_count(), 1);
    }

    #[tokio::test]
    async fn test_purge_keeps_going_past_failures() {
        let (client, sink, top) = locked_tree().await;

        top.purge(DeleteOptions::default().with_stop_on_error(false))
            .await
            .unwrap();

        assert_eq!(keys(&client).await, ["top/", "top/b/locked"]);
        assert_eq!(sink.error_count(), 1);
    }
}
