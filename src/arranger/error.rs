use thiserror::Error;

use crate::common::config::InvalidRule;
use crate::sys::command::CommandError;
use crate::sys::window::Pid;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no process matches {0:?}")]
    NoProcess(String),
    #[error("multiple processes match {pattern:?}: {pids:?}")]
    AmbiguousProcess { pattern: String, pids: Vec<Pid> },
    #[error("no window found")]
    NoWindow,
    #[error("window search failed: {0}")]
    Command(#[from] CommandError),
}

/// Why a rule was skipped. None of these stop the rest of the run.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Invalid(#[from] InvalidRule),
    #[error("there are only {available} screens available, can't use screen {screen}")]
    ScreenOutOfRange { screen: usize, available: usize },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
