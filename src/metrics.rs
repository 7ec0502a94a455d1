//! Lightweight render metrics for the HTTP surface

use crate::config::MetricsFormat;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

/// How a single submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A PNG was produced
    Rendered {
        /// Symbol version used
        version: i16,
        /// PNG size in bytes
        bytes: usize,
    },
    /// Input was missing; nothing was attempted
    Warned,
    /// Encoding, verification or serialization failed
    Failed,
}

/// Counters shared by all request handlers.
///
/// Nothing in the request path reads these back; they only feed `/metrics`
/// and the periodic log summary.
#[derive(Debug)]
pub struct Metrics {
    totals: Mutex<Counters>,
    window: Mutex<Counters>,
    reporter_spawned: AtomicBool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create an empty metrics set.
    pub fn new() -> Self {
        Self {
            totals: Mutex::new(Counters::new()),
            window: Mutex::new(Counters::new()),
            reporter_spawned: AtomicBool::new(false),
        }
    }

    /// Record the outcome of one submission.
    pub fn record(&self, outcome: RenderOutcome, duration: Duration) {
        for counters in [&self.totals, &self.window] {
            if let Ok(mut guard) = counters.lock() {
                guard.record(outcome, duration);
            }
        }
    }

    /// Counters accumulated since startup.
    pub fn snapshot(&self) -> Snapshot {
        match self.totals.lock() {
            Ok(guard) => guard.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    fn take_window(&self) -> Snapshot {
        match self.window.lock() {
            Ok(mut guard) => {
                let snapshot = guard.snapshot();
                *guard = Counters::new();
                snapshot
            }
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    /// Log a summary every `interval_secs` (at least 5). Only the first call spawns a task.
    pub fn spawn_reporter(self: &Arc<Self>, interval_secs: u64) {
        if self
            .reporter_spawned
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let metrics = Arc::clone(self);
        let period = Duration::from_secs(interval_secs.max(5));
        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; skip it so each report covers a full window.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                log_snapshot(&metrics.take_window());
            }
        });
    }

    /// Render the startup-to-now counters in `format`, returning the content type and body.
    pub fn render(&self, format: MetricsFormat) -> (&'static str, String) {
        let snapshot = self.snapshot();
        match format {
            MetricsFormat::Json => (
                "application/json",
                serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string()),
            ),
            MetricsFormat::Prometheus => ("text/plain; version=0.0.4", render_prometheus(&snapshot)),
        }
    }
}

#[derive(Debug)]
struct Counters {
    rendered: u64,
    warned: u64,
    failed: u64,
    render_duration: Duration,
    png_bytes: u64,
    per_version: BTreeMap<i16, u64>,
    started: Instant,
}

impl Counters {
    fn new() -> Self {
        Self {
            rendered: 0,
            warned: 0,
            failed: 0,
            render_duration: Duration::ZERO,
            png_bytes: 0,
            per_version: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    fn record(&mut self, outcome: RenderOutcome, duration: Duration) {
        match outcome {
            RenderOutcome::Rendered { version, bytes } => {
                self.rendered += 1;
                self.render_duration += duration;
                self.png_bytes += bytes as u64;
                *self.per_version.entry(version).or_default() += 1;
            }
            RenderOutcome::Warned => self.warned += 1,
            RenderOutcome::Failed => self.failed += 1,
        }
    }

    fn snapshot(&self) -> Snapshot {
        let avg_render_ms = if self.rendered == 0 {
            0.0
        } else {
            self.render_duration.as_secs_f64() * 1_000.0 / self.rendered as f64
        };

        Snapshot {
            window_secs: self.started.elapsed().as_secs(),
            requests: self.rendered + self.warned + self.failed,
            rendered: self.rendered,
            warned: self.warned,
            failed: self.failed,
            avg_render_ms,
            png_bytes: self.png_bytes,
            per_version: self
                .per_version
                .iter()
                .map(|(&version, &count)| VersionCount { version, count })
                .collect(),
        }
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Seconds covered by the snapshot
    pub window_secs: u64,
    /// All submissions
    pub requests: u64,
    /// Submissions that produced a PNG
    pub rendered: u64,
    /// Submissions rejected for missing input
    pub warned: u64,
    /// Submissions that failed during generation
    pub failed: u64,
    /// Mean render latency of successful submissions
    pub avg_render_ms: f64,
    /// Total PNG bytes produced
    pub png_bytes: u64,
    /// Rendered symbols by version
    pub per_version: Vec<VersionCount>,
}

/// Number of symbols rendered at one version
#[derive(Debug, Clone, Serialize)]
pub struct VersionCount {
    /// Symbol version
    pub version: i16,
    /// Symbols rendered at that version
    pub count: u64,
}

fn log_snapshot(snapshot: &Snapshot) {
    if snapshot.requests == 0 {
        return;
    }

    let versions = snapshot
        .per_version
        .iter()
        .map(|entry| format!("v{}: {}", entry.version, entry.count))
        .collect::<Vec<_>>()
        .join(", ");

    info!(
        target: "linkqr::metrics",
        interval_secs = snapshot.window_secs,
        requests = snapshot.requests,
        rendered = snapshot.rendered,
        warned = snapshot.warned,
        failed = snapshot.failed,
        avg_render_ms = snapshot.avg_render_ms,
        png_bytes = snapshot.png_bytes,
        versions,
        "Render metrics window"
    );
}

fn render_prometheus(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    let _ = writeln!(
        &mut output,
        "# HELP linkqr_uptime_seconds Seconds since metrics collection started"
    );
    let _ = writeln!(&mut output, "# TYPE linkqr_uptime_seconds gauge");
    let _ = writeln!(&mut output, "linkqr_uptime_seconds {}", snapshot.window_secs);

    let _ = writeln!(
        &mut output,
        "# HELP linkqr_requests_total Submissions by outcome"
    );
    let _ = writeln!(&mut output, "# TYPE linkqr_requests_total counter");
    for (outcome, count) in [
        ("rendered", snapshot.rendered),
        ("warned", snapshot.warned),
        ("failed", snapshot.failed),
    ] {
        let _ = writeln!(
            &mut output,
            "linkqr_requests_total{{outcome=\"{outcome}\"}} {count}"
        );
    }

    let _ = writeln!(
        &mut output,
        "# HELP linkqr_render_latency_avg_seconds Mean latency of successful renders"
    );
    let _ = writeln!(&mut output, "# TYPE linkqr_render_latency_avg_seconds gauge");
    let _ = writeln!(
        &mut output,
        "linkqr_render_latency_avg_seconds {:.6}",
        snapshot.avg_render_ms / 1_000.0
    );

    let _ = writeln!(
        &mut output,
        "# HELP linkqr_png_bytes_total PNG bytes produced"
    );
    let _ = writeln!(&mut output, "# TYPE linkqr_png_bytes_total counter");
    let _ = writeln!(&mut output, "linkqr_png_bytes_total {}", snapshot.png_bytes);

    if !snapshot.per_version.is_empty() {
        let _ = writeln!(
            &mut output,
            "# HELP linkqr_symbols_by_version_total Rendered symbols by QR version"
        );
        let _ = writeln!(&mut output, "# TYPE linkqr_symbols_by_version_total counter");
        for entry in &snapshot.per_version {
            let _ = writeln!(
                &mut output,
                "linkqr_symbols_by_version_total{{version=\"{}\"}} {}",
                entry.version, entry.count
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metrics {
        let metrics = Metrics::new();
        metrics.record(
            RenderOutcome::Rendered {
                version: 1,
                bytes: 400,
            },
            Duration::from_millis(4),
        );
        metrics.record(
            RenderOutcome::Rendered {
                version: 3,
                bytes: 600,
            },
            Duration::from_millis(6),
        );
        metrics.record(RenderOutcome::Warned, Duration::ZERO);
        metrics.record(RenderOutcome::Failed, Duration::from_millis(1));
        metrics
    }

    #[test]
    fn counts_outcomes() {
        let snapshot = sample().snapshot();
        assert_eq!(snapshot.requests, 4);
        assert_eq!(snapshot.rendered, 2);
        assert_eq!(snapshot.warned, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.png_bytes, 1000);
        assert!((snapshot.avg_render_ms - 5.0).abs() < 1e-9);
        assert_eq!(snapshot.per_version.len(), 2);
        assert_eq!(snapshot.per_version[0].version, 1);
    }

    #[test]
    fn window_resets_but_totals_do_not() {
        let metrics = sample();
        assert_eq!(metrics.take_window().requests, 4);
        assert_eq!(metrics.take_window().requests, 0);
        assert_eq!(metrics.snapshot().requests, 4);
    }

    #[test]
    fn json_rendering() {
        let (content_type, body) = sample().render(MetricsFormat::Json);
        assert_eq!(content_type, "application/json");
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["rendered"], 2);
        assert_eq!(value["per_version"][1]["version"], 3);
    }

    #[test]
    fn prometheus_rendering() {
        let (content_type, body) = sample().render(MetricsFormat::Prometheus);
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("linkqr_requests_total{outcome=\"rendered\"} 2"));
        assert!(body.contains("linkqr_requests_total{outcome=\"warned\"} 1"));
        assert!(body.contains("linkqr_symbols_by_version_total{version=\"3\"} 1"));
        assert!(body.contains("linkqr_png_bytes_total 1000"));
    }
}
