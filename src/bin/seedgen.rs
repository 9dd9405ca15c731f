use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use covplot::seeds::derive_seeds;

/// Command-line arguments for the seed deriver
#[derive(Parser, Debug)]
#[clap(author, version, about = "Derive encoder seeds from an AFL++ queue")]
struct Cli {
    /// Queue directory to read
    #[clap(long, default_value = "out2/default/queue")]
    queue: PathBuf,

    /// Encoder binary fed with each queue entry on stdin
    #[clap(long, default_value = "./encoder")]
    encoder: PathBuf,

    /// Directory receiving the derived seed files
    #[clap(long, default_value = "inspecial")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let stats = derive_seeds(&args.queue, &args.encoder, &args.output)?;
    if stats.files_written > 0 {
        println!(
            "Wrote {} entries into {} files under {:?}",
            stats.entries_written, stats.files_written, args.output
        );
    } else {
        println!("No output produced; nothing written.");
    }
    Ok(())
}
