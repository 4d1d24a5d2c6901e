//! Global progress-indicator hooks wrapped in an RAII guard.

// self
use crate::_prelude::*;

/// Start/finish callbacks for a shell-provided progress indicator.
pub trait ProgressHook
where
	Self: Send + Sync,
{
	/// Called when a dispatcher call begins.
	fn started(&self);

	/// Called when the call settles, successfully or not.
	fn finished(&self);
}

/// Progress hook that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProgress;
impl ProgressHook for NoopProgress {
	fn started(&self) {}

	fn finished(&self) {}
}

/// RAII guard that fires [`ProgressHook::finished`] on drop, so the indicator always stops even
/// when a call exits early with an error.
pub struct ProgressGuard(Arc<dyn ProgressHook>);
impl ProgressGuard {
	/// Starts the indicator and returns the guard that will stop it.
	pub fn start(hook: Arc<dyn ProgressHook>) -> Self {
		hook.started();

		Self(hook)
	}
}
impl Drop for ProgressGuard {
	fn drop(&mut self) {
		self.0.finished();
	}
}
impl Debug for ProgressGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ProgressGuard(..)")
	}
}
