//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskState`: Lifecycle of a single crawl task (claiming, fetching, extracting, ...)
//! - `VisitedSet`: URLs already claimed during the current crawl

mod task_state;
mod visited;

// Re-export main types
pub use task_state::TaskState;
pub use visited::VisitedSet;
