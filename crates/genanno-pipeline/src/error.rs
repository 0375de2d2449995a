//! Error types for the annotation pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline-domain failures
///
/// Row-level problems never surface here: parsers log and skip them. These
/// variants are for conditions that end a branch (or, for the structural
/// model, the whole fusion step).
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Required input not found: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task '{task}' failed: {reason}")]
    Task { task: String, reason: String },

    #[error(transparent)]
    Common(#[from] genanno_common::AnnoError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn task(task: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Task {
            task: task.into(),
            reason: reason.into(),
        }
    }
}
