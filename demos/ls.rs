//! Example: List a directory on any backend
//!
//! Usage:
//!   cargo run --example ls -- [--config storage.toml] <DIRECTORY>
//!
//! Directories end in a separator: `/srv/data/`, `s3://bucket/prefix/`.

mod cli;

use cli::{Args, init_tracing};
use unistore::{DirectoryExt, Result};

const USAGE: &str = "Usage: cargo run --example ls -- [--config FILE] <DIRECTORY>";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse(USAGE, &[]);
    let [path] = args.paths.as_slice() else {
        args.fail();
    };
    let directory = args.dispatcher()?.directory(path)?;

    if !directory.exists().await? {
        eprintln!("{} does not exist", directory.full_name());
        return Ok(());
    }

    println!("Listing: {}\n", directory.full_name());
    let directories = directory.get_directories().await?;
    let files = directory.get_files().await?;
    if directories.is_empty() && files.is_empty() {
        println!("  (empty)");
    }
    for child in &directories {
        println!("  [dir]  {}", child.name());
    }
    for file in &files {
        println!("  [file] {}", file.name());
    }

    println!(
        "\n{} objects in the whole tree",
        directory.total_objects().await?
    );
    Ok(())
}
