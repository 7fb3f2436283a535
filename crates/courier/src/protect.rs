//! Protected execution of user code.
//!
//! Dispatchers, bootstraps, ack callbacks and timer callbacks all run through
//! an actor's [`ProtectedCall`] strategy so a fault in one message never takes
//! down the dispatch loop or reaches a sender.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::DispatchFault;

/// Strategy that runs one unit of work without propagating its faults.
pub trait ProtectedCall: Send + Sync + 'static {
	/// Runs `work`, converting a fault into [`DispatchFault`].
	///
	/// `label` names the kind of work for diagnostics.
	fn run(&self, label: &'static str, work: &mut dyn FnMut()) -> Result<(), DispatchFault>;
}

/// Default strategy: catches panics and logs them at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatchUnwind;

impl ProtectedCall for CatchUnwind {
	fn run(&self, label: &'static str, work: &mut dyn FnMut()) -> Result<(), DispatchFault> {
		catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
			let fault = DispatchFault::new(label, panic_message(payload.as_ref()));
			tracing::error!(unit = label, fault = %fault.message(), "courier.fault_recovered");
			fault
		})
	}
}

/// Runs `work` under `guard`, returning its output unless it faulted.
pub(crate) fn protect<R>(guard: &dyn ProtectedCall, label: &'static str, work: impl FnOnce() -> R) -> Option<R> {
	let mut work = Some(work);
	let mut output = None;
	let _ = guard.run(label, &mut || {
		if let Some(work) = work.take() {
			output = Some(work());
		}
	});
	output
}

/// Extracts the human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		(*msg).to_owned()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_owned()
	}
}

#[cfg(test)]
mod tests;
