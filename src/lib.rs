//! Post notifications via the macOS Notification Center on behalf of an
//! Alfred-style workflow.
//!
//! The first post copies a helper app into the workflow's cache directory,
//! gives it the workflow's icon and a bundle identifier derived from the
//! workflow's own, and then drives it as a child process. Subsequent posts
//! reuse the installed copy.
//!
//! The main API is [`notify()`] for the common case, or [`Notifier`] when
//! the caller wants to supply its own [`WorkflowContext`] or a timeout.

pub mod context;
pub mod notify;
pub mod provision;
pub mod resources;
pub mod sounds;

pub use context::WorkflowContext;
pub use notify::{notify, Notification, Notifier, NotifyError};
pub use provision::HelperBundle;
pub use sounds::SOUNDS;
