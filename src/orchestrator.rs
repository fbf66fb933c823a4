//! Bounded, failure-isolated batch execution.

use futures_util::StreamExt;
use futures_util::stream;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;

use crate::engine::InstallReport;

/// Run `task` for every item with at most `limit` futures in flight.
///
/// Completion order is unspecified; the returned future resolves once every
/// item has finished.
pub async fn run_bounded<I, F, Fut>(items: I, limit: NonZeroUsize, task: F)
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = ()>,
{
    stream::iter(items)
        .for_each_concurrent(limit.get(), task)
        .await;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Uninstall,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully finished item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completed {
    Installed(InstallReport),
    Uninstalled { name: String },
}

impl Completed {
    pub fn name(&self) -> &str {
        match self {
            Completed::Installed(report) => &report.name,
            Completed::Uninstalled { name } => name,
        }
    }
}

/// A failed item. `name` is `None` when the descriptor was too malformed to
/// carry one.
#[derive(Debug)]
pub struct Failure {
    pub name: Option<String>,
    pub operation: Operation,
    pub error: anyhow::Error,
}

impl Failure {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Receives per-item results as they complete.
#[cfg_attr(test, mockall::automock)]
pub trait BatchObserver: Send + Sync {
    fn on_success(&self, completed: &Completed);
    fn on_error(&self, failure: &Failure);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
