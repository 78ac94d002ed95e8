//! Example: Copy or move a file or directory tree, across backends if needed
//!
//! Usage:
//!   cargo run --example copy -- [--config storage.toml] [--move] [--shallow]
//!       [--no-overwrite] [--keep-going] <SOURCE> <TARGET>
//!
//! Both paths must be of the same kind: two files or two directories.

mod cli;

use cli::{Args, init_tracing};
use unistore::{DirectoryExt, FileExt, Result, TransferOptions, path};

const USAGE: &str = "Usage: cargo run --example copy -- [--config FILE] [--move] [--shallow] \
                     [--no-overwrite] [--keep-going] <SOURCE> <TARGET>";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse(
        USAGE,
        &["--move", "--shallow", "--no-overwrite", "--keep-going"],
    );
    let moving = args.has("--move");
    let options = TransferOptions::default()
        .with_recurse(!args.has("--shallow"))
        .with_overwrite(!args.has("--no-overwrite"))
        .with_stop_on_error(!args.has("--keep-going"));

    let [source, target] = args.paths.as_slice() else {
        args.fail();
    };
    if path::is_directory(source) != path::is_directory(target) {
        args.fail();
    }
    let dispatcher = args.dispatcher()?;

    if path::is_directory(source) {
        let source = dispatcher.directory(source)?;
        let target = dispatcher.create_directory(target, false).await?;
        if moving {
            source.move_to(target.as_ref(), options).await?;
        } else {
            source.copy_to(target.as_ref(), options).await?;
        }
    } else {
        let mut source = dispatcher.file(source)?;
        let mut target = dispatcher.file(target)?;
        if moving {
            source.move_to(target.as_mut(), options).await?;
        } else {
            source.copy_to(target.as_mut(), options).await?;
        }
    }

    Ok(())
}
