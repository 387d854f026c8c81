//! Append-only run log
//!
//! One JSON object per line in `run_<uuid>.jsonl`. Every append is flushed,
//! so a crashed or aborted run still leaves a readable trace up to the last
//! record. A log without a directory keeps its records in memory only.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use claimgate_domain::{AgentRole, Component, ModelTier, ProgressEvent, ProgressSink, TokenUsage};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Still running
    Started,
    /// Finished normally
    Success,
    /// Failed
    Error,
    /// Interrupted by an abort request
    Aborted,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// An article was produced
    Completed,
    /// The run failed
    Error,
    /// The run was aborted
    Aborted,
}

/// Who performs a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Pipeline component
    pub component: Component,

    /// Agent role, for model-backed steps
    pub role: Option<AgentRole>,

    /// Model name
    pub model: Option<String>,

    /// Model tier
    pub tier: Option<ModelTier>,

    /// What the step does
    pub action: String,
}

impl StepInfo {
    /// A step without a model
    pub fn new(component: Component, action: impl Into<String>) -> Self {
        Self {
            component,
            role: None,
            model: None,
            tier: None,
            action: action.into(),
        }
    }

    /// Attach the agent that runs the step
    pub fn with_agent(mut self, role: AgentRole, tier: ModelTier, model: Option<String>) -> Self {
        self.role = Some(role);
        self.tier = Some(tier);
        self.model = model;
        self
    }
}

/// One line of the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum LogRecord {
    /// First record of every log
    RunStarted {
        /// Run id
        run_id: String,
        /// When
        timestamp: DateTime<Utc>,
        /// The user question
        question: String,
        /// Effective configuration
        config: serde_json::Value,
    },

    /// A step began
    StepStarted {
        /// Step number, 1-based
        step: u32,
        /// When
        timestamp: DateTime<Utc>,
        /// Who runs it
        #[serde(flatten)]
        info: StepInfo,
    },

    /// A step ended
    StepFinished {
        /// Step number
        step: u32,
        /// When
        timestamp: DateTime<Utc>,
        /// Outcome
        status: StepStatus,
        /// Wall time
        duration_ms: u64,
        /// Tokens spent
        tokens: TokenUsage,
        /// Failure message
        error: Option<String>,
        /// Step-specific numbers
        details: serde_json::Value,
    },

    /// A progress event
    Event {
        /// When
        timestamp: DateTime<Utc>,
        /// The event
        event: ProgressEvent,
    },

    /// Last record of a finished run
    RunFinished {
        /// When
        timestamp: DateTime<Utc>,
        /// Outcome
        status: RunStatus,
        /// Tokens over all steps
        total_tokens: TokenUsage,
        /// Failure message
        error: Option<String>,
    },
}

/// A step that has been started
#[derive(Debug)]
pub struct StepHandle {
    step: u32,
    started: Instant,
}

impl StepHandle {
    /// Step number
    pub fn number(&self) -> u32 {
        self.step
    }
}

#[derive(Debug, Default)]
struct State {
    writer: Option<BufWriter<File>>,
    records: Vec<LogRecord>,
    steps: u32,
    usage: TokenUsage,
}

/// The log of one run
#[derive(Debug)]
pub struct RunLog {
    run_id: String,
    path: Option<PathBuf>,
    state: Mutex<State>,
}

impl RunLog {
    /// Create `run_<uuid>.jsonl` in `dir`, creating the directory if needed
    pub fn create(dir: &Path, question: &str, config: serde_json::Value) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let run_id = Uuid::now_v7().to_string();
        let path = dir.join(format!("run_{}.jsonl", run_id));
        let file = OpenOptions::new().create_new(true).append(true).open(&path)?;

        let log = Self {
            run_id,
            path: Some(path),
            state: Mutex::new(State {
                writer: Some(BufWriter::new(file)),
                ..Default::default()
            }),
        };
        log.start(question, config);
        Ok(log)
    }

    /// A log that is never written to disk
    pub fn in_memory(question: &str, config: serde_json::Value) -> Self {
        let log = Self {
            run_id: Uuid::now_v7().to_string(),
            path: None,
            state: Mutex::new(State::default()),
        };
        log.start(question, config);
        log
    }

    fn start(&self, question: &str, config: serde_json::Value) {
        self.append(LogRecord::RunStarted {
            run_id: self.run_id.clone(),
            timestamp: Utc::now(),
            question: question.to_string(),
            config,
        });
    }

    /// Run id
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// File path, if written to disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record the start of a step
    pub fn start_step(&self, info: StepInfo) -> StepHandle {
        let step = {
            let mut state = self.lock();
            state.steps += 1;
            state.steps
        };
        self.append(LogRecord::StepStarted {
            step,
            timestamp: Utc::now(),
            info,
        });
        StepHandle {
            step,
            started: Instant::now(),
        }
    }

    /// Record the end of a step
    pub fn finish_step(
        &self,
        handle: StepHandle,
        status: StepStatus,
        tokens: TokenUsage,
        error: Option<String>,
        details: serde_json::Value,
    ) {
        self.lock().usage += tokens;
        self.append(LogRecord::StepFinished {
            step: handle.step,
            timestamp: Utc::now(),
            status,
            duration_ms: handle.started.elapsed().as_millis() as u64,
            tokens,
            error,
            details,
        });
    }

    /// Record a progress event
    pub fn event(&self, event: &ProgressEvent) {
        self.append(LogRecord::Event {
            timestamp: Utc::now(),
            event: event.clone(),
        });
    }

    /// Record the end of the run
    pub fn finish_run(&self, status: RunStatus, error: Option<String>) {
        let total_tokens = self.total_usage();
        self.append(LogRecord::RunFinished {
            timestamp: Utc::now(),
            status,
            total_tokens,
            error,
        });
    }

    /// Tokens recorded so far
    pub fn total_usage(&self) -> TokenUsage {
        self.lock().usage
    }

    /// Records appended so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().records.clone()
    }

    /// Read a log file back
    pub fn read(path: &Path) -> Result<Vec<LogRecord>> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    fn append(&self, record: LogRecord) {
        let mut state = self.lock();
        if let Some(writer) = state.writer.as_mut() {
            let written = serde_json::to_string(&record)
                .map_err(std::io::Error::from)
                .and_then(|line| {
                    writer.write_all(line.as_bytes())?;
                    writer.write_all(b"\n")?;
                    writer.flush()
                });
            if let Err(e) = written {
                warn!(error = %e, "run log append failed");
            }
        }
        state.records.push(record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Forwards events to another sink and records them in the run log
pub struct LoggingSink<'a> {
    log: &'a RunLog,
    inner: &'a dyn ProgressSink,
}

impl<'a> LoggingSink<'a> {
    /// Wrap `inner`
    pub fn new(log: &'a RunLog, inner: &'a dyn ProgressSink) -> Self {
        Self { log, inner }
    }
}

impl ProgressSink for LoggingSink<'_> {
    fn emit(&self, event: ProgressEvent) {
        self.log.event(&event);
        self.inner.emit(event);
    }
}
