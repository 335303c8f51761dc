use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

#[cfg(feature = "colorized_output")]
use console::style;

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No new series arrived within the series timeout (or the one-shot
    /// pass completed)
    Exhausted,
    /// A stop was requested
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => write!(f, "exhausted"),
            Termination::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final status of one metadata file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Every tilt was composed
    Composed {
        /// Series identifier
        ts_id: String,
        /// Images in the series
        tilts: usize,
    },
    /// The series was persisted with some tilts missing
    Partial {
        /// Series identifier
        ts_id: String,
        /// Images in the series
        tilts: usize,
        /// Tilts described by the metadata file
        expected: usize,
    },
    /// No series was produced
    Rejected(String),
    /// Abandoned by a stop request; not consumed
    Cancelled,
}

/// Outcome for one metadata file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    /// Metadata file
    pub path: PathBuf,
    /// What happened to it
    pub status: FileStatus,
}

/// Summary of a streaming run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// When the controller was created
    pub started: DateTime<Utc>,
    /// When the stream terminated
    pub finished: Option<DateTime<Utc>>,
    /// How the stream terminated
    pub termination: Option<Termination>,
    /// Per-file outcomes, in completion order
    pub outcomes: Vec<FileOutcome>,
}

impl RunReport {
    pub(crate) fn new(started: DateTime<Utc>) -> Self {
        Self {
            started,
            finished: None,
            termination: None,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, path: PathBuf, status: FileStatus) {
        self.outcomes.push(FileOutcome { path, status });
    }

    /// Files that produced a complete series.
    pub fn composed_count(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Composed { .. }))
    }

    /// Files that produced a partial series.
    pub fn partial_count(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Partial { .. }))
    }

    /// Files that produced no series.
    pub fn rejected_count(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Rejected(_)))
    }

    /// Files abandoned by a stop request.
    pub fn cancelled_count(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Cancelled))
    }

    fn count(&self, predicate: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    fn termination_label(&self) -> String {
        self.termination
            .map(|t| t.to_string())
            .unwrap_or_else(|| "running".to_string())
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static WARN: Emoji<'_, '_> = Emoji("⚠", "[PARTIAL]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[REJECTED]");
            static STOP: Emoji<'_, '_> = Emoji("■", "[CANCELLED]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Tilt-series Stream Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("=========================").cyan()));
            output.push_str(&format!(
                "{}: {}\n\n",
                style("Termination").bold(),
                self.termination_label()
            ));

            for outcome in &self.outcomes {
                let path = outcome.path.display();
                match &outcome.status {
                    FileStatus::Composed { ts_id, tilts } => output.push_str(&format!(
                        "[{}] {} - {} ({} tilts)\n",
                        OK,
                        style(path).green(),
                        ts_id,
                        tilts
                    )),
                    FileStatus::Partial {
                        ts_id,
                        tilts,
                        expected,
                    } => output.push_str(&format!(
                        "[{}] {} - {} ({} of {} tilts)\n",
                        WARN,
                        style(path).yellow(),
                        ts_id,
                        tilts,
                        expected
                    )),
                    FileStatus::Rejected(reason) => output.push_str(&format!(
                        "[{}] {} - {}: {}\n",
                        FAIL,
                        style(path).red(),
                        style("REJECTED").red().bold(),
                        reason
                    )),
                    FileStatus::Cancelled => {
                        output.push_str(&format!("[{}] {}\n", STOP, style(path).dim()))
                    }
                }
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} composed, {} partial, {} rejected, {} cancelled\n",
                style("Summary").bold(),
                style(self.composed_count()).green(),
                style(self.partial_count()).yellow(),
                style(self.rejected_count()).red(),
                self.cancelled_count()
            ));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tilt-series Stream Report")?;
        writeln!(f, "=========================")?;
        writeln!(f, "Termination: {}", self.termination_label())?;
        writeln!(f)?;

        for outcome in &self.outcomes {
            let path = outcome.path.display();
            match &outcome.status {
                FileStatus::Composed { ts_id, tilts } => {
                    writeln!(f, "[✓] {} - {} ({} tilts)", path, ts_id, tilts)?
                }
                FileStatus::Partial {
                    ts_id,
                    tilts,
                    expected,
                } => writeln!(
                    f,
                    "[⚠] {} - {} ({} of {} tilts)",
                    path, ts_id, tilts, expected
                )?,
                FileStatus::Rejected(reason) => writeln!(f, "[✗] {} - REJECTED: {}", path, reason)?,
                FileStatus::Cancelled => writeln!(f, "[■] {} - cancelled", path)?,
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} composed, {} partial, {} rejected, {} cancelled",
            self.composed_count(),
            self.partial_count(),
            self.rejected_count(),
            self.cancelled_count()
        )
    }
}
