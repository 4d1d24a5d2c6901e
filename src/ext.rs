//! Collaborator contracts for downstream shells (notifications, progress, login navigation).
//!
//! The crate intentionally exposes traits with no-op defaults so the embedding shell can bring
//! its own toast/snackbar sink, progress bar, and router without expanding the surface of
//! `bearer-dispatch` itself.

pub mod login;
pub mod notifier;
pub mod progress;

pub use login::*;
pub use notifier::*;
pub use progress::*;
