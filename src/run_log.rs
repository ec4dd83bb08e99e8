//! Per-run log buffer.
//!
//! Every line is mirrored to `tracing` for the console and kept in order so a
//! failed run can ship its full history to the webhook.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Append-only log for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        self.push(Level::Info, msg.into());
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.push(Level::Warn, msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.push(Level::Error, msg.into());
    }

    fn push(&mut self, level: Level, msg: String) {
        match level {
            Level::Info => tracing::info!("{msg}"),
            Level::Warn => tracing::warn!("{msg}"),
            Level::Error => tracing::error!("{msg}"),
        }
        let ts = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "now".into());
        self.lines.push(format!("{ts} [{}] {msg}", level.tag()));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_order_and_level_tags() {
        let mut log = RunLog::new();
        log.info("fetching");
        log.warn("slow");
        log.error("gave up");

        let lines = log.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[INFO] fetching"));
        assert!(lines[1].ends_with("[WARN] slow"));
        assert!(lines[2].ends_with("[ERROR] gave up"));
        assert_eq!(log.to_text().lines().count(), 3);
    }
}
