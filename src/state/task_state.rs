/// Crawl task state definitions
///
/// This module defines the lifecycle a single crawl task moves through.
use std::fmt;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task has been created but has not started
    Pending,

    /// Task is trying to claim its URL in the visited set
    Claiming,

    /// The page is being fetched and persisted
    Fetching,

    /// Links are being extracted from the fetched body
    Extracting,

    /// Accepted links are being scheduled as child tasks
    Spawning,

    // ===== Finished States =====
    /// Another task already claimed the URL
    Skipped,

    /// Fetch, extraction and scheduling completed
    Done,

    /// Fetch or extraction failed; nothing is published
    Failed,

    // ===== Final State =====
    /// The task has been counted down and, if successful, published
    Reported,
}

impl TaskState {
    /// Returns true while the task still has work to do
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Claiming | Self::Fetching | Self::Extracting | Self::Spawning
        )
    }

    /// Returns true once the task has stopped working and awaits reporting
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Skipped | Self::Done | Self::Failed)
    }

    /// Returns true for the final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reported)
    }

    /// Returns true if the task may move from this state to `next`
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;

        matches!(
            (self, next),
            (Pending, Claiming)
                | (Claiming, Skipped)
                | (Claiming, Fetching)
                | (Fetching, Extracting)
                | (Fetching, Failed)
                | (Extracting, Spawning)
                | (Extracting, Failed)
                | (Spawning, Done)
                | (Skipped, Reported)
                | (Done, Reported)
                | (Failed, Reported)
        )
    }

    /// Short lowercase name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claiming => "claiming",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Spawning => "spawning",
            Self::Skipped => "skipped",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Reported => "reported",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
