//! Sticker CLI
//!
//! Converts images with a flat backdrop into transparent, size-bounded stickers.

#[cfg(feature = "cli")]
use stickerbot::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
