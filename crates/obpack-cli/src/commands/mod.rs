//! The two things `obpack` can do.
//!
//! - [`release`] - build once and put the stylesheet in place
//! - [`dev`] - keep rebuilding and renaming until interrupted
//!
//! Each module exposes a `plan_*` function that takes its collaborators
//! explicitly and an `execute` wrapper that adds terminal output.

pub mod dev;
pub mod release;

pub use dev::{DevSession, plan_development};
pub use release::{ReleaseSummary, plan_release};
