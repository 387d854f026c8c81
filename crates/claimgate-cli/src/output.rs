//! Output formatting for the CLI.

use crate::cli::CliFormat;
use crate::error::Result;
use claimgate_domain::{EventKind, ProgressEvent};
use claimgate_pipeline::{RunOutcome, RunSummary};
use colored::*;
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: CliFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: CliFormat, color_enabled: bool) -> Self {
        Self { format, color_enabled }
    }

    /// Selected output format.
    pub fn format(&self) -> CliFormat {
        self.format
    }

    /// Format one progress event as a single line.
    pub fn event(&self, event: &ProgressEvent) -> String {
        let tag = format!("[{}]", event.component.as_str());
        let line = format!("{:<16} {}", tag, event.message);
        match event.kind {
            EventKind::Error => self.colorize(&line, "red"),
            EventKind::ToolCall => self.colorize(&line, "cyan"),
            EventKind::ToolResult => self.colorize(&line, "blue"),
            EventKind::Response => self.colorize(&line, "magenta"),
            EventKind::Status => line,
        }
    }

    /// Format the run summary as a two-column table.
    pub fn summary_table(&self, summary: &RunSummary) -> String {
        let rows = [
            ("Claims", summary.total_claims.to_string()),
            (
                "Classes A / B / C",
                format!("{} / {} / {}", summary.class_a, summary.class_b, summary.class_c),
            ),
            ("Fulfilled", summary.fulfilled.to_string()),
            ("Insufficient", summary.insufficient.to_string()),
            ("Conflict", summary.conflict.to_string()),
            ("Sources retrieved", summary.total_sources.to_string()),
            ("Sources indexed", summary.indexed_sources.to_string()),
            ("Sources cited", summary.cited_sources.to_string()),
            ("Words", summary.article_words.to_string()),
            ("Rewrites", summary.iterations.to_string()),
            ("Verdict", summary.verdict.as_str().to_string()),
            (
                "Tokens in / out",
                format!("{} / {}", summary.tokens.input, summary.tokens.output),
            ),
        ];

        let mut builder = Builder::default();
        builder.push_record(["Metric", "Value"]);
        for (name, value) in rows {
            builder.push_record([name.to_string(), value]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Columns::last()).with(Alignment::right()));
        table.to_string()
    }

    /// Final report of a run in the selected format.
    pub fn outcome(&self, outcome: &RunOutcome, article_path: &Path) -> Result<String> {
        match self.format {
            CliFormat::Json => {
                let report = serde_json::json!({
                    "run_id": outcome.run_id,
                    "article_path": article_path.display().to_string(),
                    "run_log_path": outcome.run_log_path.as_ref().map(|p| p.display().to_string()),
                    "summary": outcome.summary,
                    "review": outcome.review,
                });
                Ok(serde_json::to_string_pretty(&report)?)
            }
            CliFormat::Text => {
                let mut out = self.summary_table(&outcome.summary);
                out.push('\n');
                let headline = format!("Article written to {}", article_path.display());
                if outcome.summary.passed {
                    out.push_str(&self.success(&headline));
                } else {
                    out.push_str(&self.warning(&format!(
                        "{} (review not passed: {})",
                        headline,
                        outcome.summary.verdict.as_str()
                    )));
                }
                if let Some(log) = &outcome.run_log_path {
                    out.push('\n');
                    out.push_str(&self.info(&format!("Run log: {}", log.display())));
                }
                Ok(out)
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}
