//! Print an image file as base64, ready for the `signature_image` field

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "encode-signature")]
#[command(about = "Encode an image as base64 for the signature_image field")]
struct Args {
    /// Image to encode
    #[arg(default_value = "signature.png")]
    path: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let bytes = std::fs::read(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    println!("{}", STANDARD.encode(bytes));

    Ok(())
}
