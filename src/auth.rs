//! Credential models: redacted secrets, credential pairs, and the persisted user profile.

pub mod secret;
pub mod session;

pub use secret::*;
pub use session::*;
