//! Render a QR code for a URL and save it under the download name
//!
//! Usage: cargo run --example generate_qr -- https://example.com Acme

use linkqr::{QrEncoder, Submission, handle_request};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "https://example.com".to_string());
    let label = args.next().unwrap_or_else(|| "Acme".to_string());

    let output = handle_request(&QrEncoder::new(), &Submission::new(url, label))?;
    std::fs::write(&output.file_name, &output.png)?;

    println!("✓ {} saved to {}", output.caption, output.file_name);
    println!(
        "  version {}, {} px, {} bytes",
        output.symbol.version,
        output.symbol.pixels,
        output.png.len()
    );

    Ok(())
}
