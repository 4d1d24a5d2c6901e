//! User-facing notification sink for transient call failures.

// self
use crate::_prelude::*;

/// Severity label attached to each notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
	/// Informational message.
	Info,
	/// Recoverable problem worth surfacing.
	Warning,
	/// Failed call or terminated session.
	Error,
}
impl Severity {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Severity::Info => "info",
			Severity::Warning => "warning",
			Severity::Error => "error",
		}
	}
}
impl Display for Severity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Non-blocking sink for user-facing messages.
///
/// Implementations must return promptly; the dispatcher calls this inline on its own task.
pub trait Notifier
where
	Self: Send + Sync,
{
	/// Delivers a transient message to the user.
	fn notify(&self, severity: Severity, message: &str);
}

/// Notifier that discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;
impl Notifier for NoopNotifier {
	fn notify(&self, _severity: Severity, _message: &str) {}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn severity_labels_are_stable() {
		assert_eq!(Severity::Info.as_str(), "info");
		assert_eq!(Severity::Warning.to_string(), "warning");
		assert_eq!(Severity::Error.as_str(), "error");
	}
}
