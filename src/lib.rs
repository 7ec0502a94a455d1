//! linkqr - turn a URL and a label into a downloadable QR code PNG
//!
//! The library is a thin pipeline around the `qrcode` and `image` crates:
//!
//! - **Input**: a [`Submission`] carrying the target URL and a label
//! - **Encode**: [`QrEncoder`] with fixed parameters (version 1 minimum,
//!   error correction L, 10 px modules, 4 module quiet zone)
//! - **Serialize**: the raster becomes an in-memory PNG
//! - **Present**: caption `QR Code for {label}` and download name
//!   `{label}_qrcode.png`
//!
//! Each call to [`handle_request`] is independent; nothing is retained
//! between submissions.
//!
//! # Example
//!
//! ```no_run
//! use linkqr::{QrEncoder, Submission, handle_request};
//!
//! fn main() -> linkqr::Result<()> {
//!     let output = handle_request(
//!         &QrEncoder::new(),
//!         &Submission::new("https://example.com", "Acme"),
//!     )?;
//!
//!     assert_eq!(output.file_name, "Acme_qrcode.png");
//!     println!("{} ({} bytes)", output.caption, output.png.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod qr;
pub mod render;
pub mod server;

// Re-exports for convenience
pub use error::{Error, Result};

pub use config::{LinkqrConfig, LogRotation, LoggingOptions, MetricsFormat, QrOptions, ServerOptions};
pub use qr::{QrDecoder, QrEncoder, QrSettings};
pub use render::{RenderedOutput, Submission, SymbolInfo, handle_request};
