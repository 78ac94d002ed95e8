mod cli;

use cli::{Args, init_tracing};
use unistore::{DeleteOptions, DirectoryExt, Result};

const USAGE: &str =
    "Usage: cargo run --example rm -- [--config FILE] [--contents] [--no-recurse] <PATH>";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse(USAGE, &["--contents", "--no-recurse"]);
    let contents_only = args.has("--contents");
    let options = DeleteOptions::default().with_recurse(!args.has("--no-recurse"));

    let [target] = args.paths.as_slice() else {
        args.fail();
    };
    let dispatcher = args.dispatcher()?;

    if !dispatcher.exists(target).await? {
        println!("Nothing to remove at {}", target);
        return Ok(());
    }

    if contents_only {
        println!("Clearing: {}", target);
        dispatcher.directory(target)?.clear(options).await?;
    } else {
        println!("Removing: {}", target);
        dispatcher.delete(target, options).await?;
    }

    Ok(())
}
