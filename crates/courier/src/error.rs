use std::time::Duration;

use thiserror::Error;

/// Synchronous errors returned by the actor surface.
///
/// Faults raised by user code on a dispatch loop are never reported here;
/// they are caught and logged by the actor's [`ProtectedCall`](crate::ProtectedCall).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorError {
	/// The target actor has exited and no longer accepts messages.
	#[error("actor {name} has exited")]
	Unavailable { name: String },
	/// No actor is registered under the requested name.
	#[error("actor {name} not found")]
	NotFound { name: String },
	/// A timer was requested with a duration it cannot run with.
	#[error("invalid timer duration {duration:?}: {reason}")]
	InvalidTimerDuration { duration: Duration, reason: &'static str },
}

impl ActorError {
	pub(crate) fn unavailable(name: impl Into<String>) -> Self {
		Self::Unavailable { name: name.into() }
	}

	pub(crate) fn not_found(name: impl Into<String>) -> Self {
		Self::NotFound { name: name.into() }
	}
}

pub type Result<T, E = ActorError> = std::result::Result<T, E>;

/// Runtime fault recovered while running user code on a dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fault in {label}: {message}")]
pub struct DispatchFault {
	label: &'static str,
	message: String,
}

impl DispatchFault {
	pub fn new(label: &'static str, message: impl Into<String>) -> Self {
		Self {
			label,
			message: message.into(),
		}
	}

	/// Which unit of work faulted (`dispatch`, `bootstrap`, `timer`, ...).
	pub fn label(&self) -> &'static str {
		self.label
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}
