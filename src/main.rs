//! linkqr command-line entrypoint

use clap::{Parser, Subcommand};
use linkqr::output::{Notice, render_summary};
use linkqr::{Error, LinkqrConfig, MetricsFormat, QrEncoder, Result, Submission, logging, server};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "linkqr",
    version,
    about = "Turn a URL and a label into a downloadable QR code"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to linkqr.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the generator page over HTTP
    Serve {
        /// Override bind address (e.g. 0.0.0.0)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Override bind port
        #[arg(long)]
        port: Option<u16>,

        /// Log periodic metrics summaries
        #[arg(long)]
        metrics: bool,

        /// Format for GET /metrics (`json` or `prometheus`)
        #[arg(long, value_name = "FORMAT")]
        metrics_format: Option<String>,
    },

    /// Render one QR code and write it as {label}_qrcode.png
    Generate {
        /// URL to encode
        #[arg(long, default_value = "")]
        url: String,

        /// Business/product/service name
        #[arg(long, default_value = "")]
        label: String,

        /// Directory the PNG is written to
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Decode the rendered symbol and compare it with the URL before writing
        #[arg(long)]
        verify: bool,

        /// Print a JSON summary instead of human-readable text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("linkqr: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = LinkqrConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve {
            bind,
            port,
            metrics,
            metrics_format,
        } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if metrics {
                config.logging.metrics = true;
            }
            if let Some(format) = metrics_format {
                config.logging.metrics_format =
                    format.parse::<MetricsFormat>().map_err(Error::Config)?;
            }

            logging::init(&config.logging)?;
            server::serve(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Generate {
            url,
            label,
            out_dir,
            verify,
            json,
        } => {
            if verify {
                config.qr.verify = true;
            }
            logging::init(&config.logging)?;

            let encoder = QrEncoder::with_settings(config.qr_settings()?);
            generate(&encoder, Submission::new(url, label), &out_dir, json)
        }
    }
}

fn generate(
    encoder: &QrEncoder,
    submission: Submission,
    out_dir: &std::path::Path,
    json: bool,
) -> Result<ExitCode> {
    let output = match linkqr::handle_request(encoder, &submission) {
        Ok(output) => output,
        Err(err) => {
            let notice = Notice::from_error(&err);
            if json {
                let payload = serde_json::json!({ "level": notice.level, "message": notice.message });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                eprintln!("{notice}");
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(&output.file_name);
    std::fs::write(&path, &output.png)?;
    debug!(path = %path.display(), bytes = output.png.len(), "Wrote QR code");

    let summary = render_summary(&output, &submission.url, &path.display().to_string());
    if json {
        println!("{}", serde_json::to_string_pretty(&summary.json)?);
    } else {
        for line in &summary.human {
            println!("{line}");
        }
    }

    Ok(ExitCode::SUCCESS)
}
