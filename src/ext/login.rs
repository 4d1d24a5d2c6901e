//! Login navigation hook invoked when a session terminates.

/// Shell-provided navigation to the login entry point.
///
/// The dispatcher invokes this exactly once per terminal refresh failure, after clearing the
/// persisted session keys.
pub trait LoginRedirect
where
	Self: Send + Sync,
{
	/// Navigates the user to the login entry point.
	fn redirect_to_login(&self);
}

/// Redirect hook that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRedirect;
impl LoginRedirect for NoopRedirect {
	fn redirect_to_login(&self) {}
}
