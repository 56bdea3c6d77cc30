//! # Trajectory control module
//!
//! Executes a planned command queue tick by tick, maintaining the live pose of the robot. Each
//! command is spread evenly over its ticks and the pose is set to the exact end pose of the
//! command on its final tick, so execution ends exactly where the plan says it will.
//!
//! Execution can be aborted through an [`AbortHandle`]. The abort takes effect at the next
//! command boundary, so a command is never left half done.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

pub use state::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared flag used to ask a running [`TrajCtrl`] to stop.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask execution to stop at the next command boundary.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::SeqCst)
    }
}
