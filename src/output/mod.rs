//! Presentation of rendered QR codes: the HTML page, download headers and
//! terminal summaries

use crate::error::{Error, Result};
use crate::render::{PNG_CONTENT_TYPE, RenderedOutput, Submission};
use base64::{Engine as _, engine::general_purpose};
use minijinja::{Environment, Value, context};
use serde::Serialize;
use serde_json::json;
use std::fmt;

const PAGE_TEMPLATE: &str = include_str!("templates/index.html");
const PAGE_NAME: &str = "index.html";

/// Page heading and document title.
pub const PAGE_TITLE: &str = "QR Code Generator";

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Input problem; nothing was attempted
    Warning,
    /// Generation was attempted and failed
    Error,
}

/// A single message shown to the user in place of a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Text shown to the user
    pub message: String,
}

impl Notice {
    /// Turn a pipeline error into the message the user sees.
    pub fn from_error(err: &Error) -> Self {
        if err.is_warning() {
            Self {
                level: NoticeLevel::Warning,
                message: err.to_string(),
            }
        } else {
            Self {
                level: NoticeLevel::Error,
                message: format!("An error occurred: {err}"),
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Encode a PNG buffer as a `data:` URI for inline display and download links.
pub fn data_uri(png: &[u8]) -> String {
    format!(
        "data:{PNG_CONTENT_TYPE};base64,{}",
        general_purpose::STANDARD.encode(png)
    )
}

/// `Content-Disposition` value offering `file_name` as an attachment.
///
/// The exact name travels in the RFC 5987 `filename*` parameter; the plain
/// `filename` parameter carries an ASCII approximation for older clients.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

/// Renders the single HTML page of the generator.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    /// Compile the page template.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(PAGE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { env })
    }

    /// The form with nothing filled in.
    pub fn empty(&self) -> Result<String> {
        self.render(&Submission::default(), None)
    }

    /// The form echoing `submission`, followed by either the QR code or a notice.
    pub fn render(
        &self,
        submission: &Submission,
        outcome: Option<&Result<RenderedOutput>>,
    ) -> Result<String> {
        let (notice, result) = match outcome {
            None => (None, None),
            Some(Ok(output)) => (
                None,
                Some(context! {
                    caption => output.caption,
                    file_name => output.file_name,
                    content_type => PNG_CONTENT_TYPE,
                    data_uri => Value::from_safe_string(data_uri(&output.png)),
                }),
            ),
            Some(Err(err)) => (Some(Notice::from_error(err)), None),
        };

        let template = self.env.get_template(PAGE_NAME)?;
        let html = template.render(context! {
            title => PAGE_TITLE,
            url => submission.url,
            label => submission.label,
            notice => notice,
            result => result,
        })?;
        Ok(html)
    }
}

/// Combined structured and human-readable description of a rendered QR code
#[derive(Debug, Clone)]
pub struct RenderedSummary {
    /// Structured JSON representation
    pub json: serde_json::Value,
    /// Lines for terminal presentation
    pub human: Vec<String>,
}

/// Describe a rendered QR code that was written to `path`.
pub fn render_summary(output: &RenderedOutput, target: &str, path: &str) -> RenderedSummary {
    let json = json!({
        "caption": output.caption,
        "file_name": output.file_name,
        "path": path,
        "target": target,
        "content_type": PNG_CONTENT_TYPE,
        "byte_length": output.png.len(),
        "symbol": output.symbol,
    });

    let human = vec![
        output.caption.clone(),
        format!("  Saved to: {path}"),
        format!(
            "  Symbol: version {} ({}x{} modules)",
            output.symbol.version, output.symbol.modules, output.symbol.modules
        ),
        format!(
            "  Image: {}x{} px, {} bytes",
            output.symbol.pixels,
            output.symbol.pixels,
            output.png.len()
        ),
    ];

    RenderedSummary { json, human }
}
