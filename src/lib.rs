//! Poll-driven task-board scheduler.
//!
//! Cards placed on a board's Queue list are launched as detached external
//! processes, subject to per-resource concurrency caps derived from card
//! labels, and moved through Ongoing to Done as their backing process
//! completes. One independent polling loop runs per configured board.

pub mod board;
pub mod config;
pub mod error;
pub mod process;
pub mod scheduler;
pub mod shutdown;

pub use error::{Result, TaskError};
