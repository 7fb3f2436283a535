use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{ForeverTimer, OnceTimer, forever, once};
use crate::protect::{ProtectedCall, protect};

type Cleanup = Box<dyn FnOnce() + Send>;

/// Which underlying timer currently drives a [`OnceForeverTimer`].
enum Phase {
	/// Waiting for the initial delay.
	Once(OnceTimer),
	/// The initial fire is running on the once timer's task. A stop landing
	/// here waits on `Slot::cleaned` for the fire to run cleanup.
	Firing,
	/// Repeating at the second interval.
	Forever(ForeverTimer),
	Stopped,
}

struct Slot {
	phase: Phase,
	/// Owned by whoever ends the once phase: a stop, or the first fire.
	cleanup: Option<Cleanup>,
	/// Signalled once the first fire has run cleanup after a stop.
	cleaned: Arc<Notify>,
}

/// Handle to a timer that fires once after a delay, then repeats.
///
/// The current phase lives behind one lock, so stop and reset always act on
/// the live underlying timer. A stop issued before the first fire completes
/// guarantees the repeating phase never starts.
pub struct OnceForeverTimer {
	slot: Arc<Mutex<Slot>>,
	cleaned: Arc<Notify>,
	guard: Arc<dyn ProtectedCall>,
}

/// Starts a timer that runs `fire` after `delay`, then every `interval`.
///
/// `fire` and `cleanup` follow the contract of [`forever`].
///
/// # Panics
///
/// Panics if `interval` is zero.
pub fn once_forever<F, C>(delay: Duration, interval: Duration, fire: F, cleanup: C, guard: Arc<dyn ProtectedCall>) -> OnceForeverTimer
where
	F: FnMut() -> ControlFlow<()> + Send + 'static,
	C: FnOnce() + Send + 'static,
{
	assert!(!interval.is_zero(), "forever timer interval must be > 0");
	let cleaned = Arc::new(Notify::new());
	let slot = Arc::new(Mutex::new(Slot {
		phase: Phase::Stopped,
		cleanup: Some(Box::new(cleanup)),
		cleaned: Arc::clone(&cleaned),
	}));

	let fire_slot = Arc::clone(&slot);
	let fire_guard = Arc::clone(&guard);
	{
		// Held while arming so the first fire always observes `Phase::Once`.
		let mut armed = slot.lock();
		armed.phase = Phase::Once(once(
			delay,
			move || enter_forever(&fire_slot, interval, fire, fire_guard),
			Arc::clone(&guard),
		));
	}

	OnceForeverTimer { slot, cleaned, guard }
}

fn enter_forever<F>(slot: &Mutex<Slot>, interval: Duration, mut fire: F, guard: Arc<dyn ProtectedCall>)
where
	F: FnMut() -> ControlFlow<()> + Send + 'static,
{
	{
		let mut current = slot.lock();
		if !matches!(current.phase, Phase::Once(_)) {
			return;
		}
		current.phase = Phase::Firing;
	}

	let flow = protect(guard.as_ref(), "timer.once_forever", &mut fire).unwrap_or(ControlFlow::Continue(()));

	let mut current = slot.lock();
	let cleanup = current.cleanup.take();
	if flow.is_break() || matches!(current.phase, Phase::Stopped) {
		current.phase = Phase::Stopped;
		let cleaned = Arc::clone(&current.cleaned);
		drop(current);
		if let Some(cleanup) = cleanup {
			let _ = protect(guard.as_ref(), "timer.cleanup", cleanup);
		}
		// Stores a permit, so a stopper that has not started waiting still wakes.
		cleaned.notify_one();
		return;
	}
	let cleanup = cleanup.unwrap_or_else(|| Box::new(|| {}));
	current.phase = Phase::Forever(forever(interval, fire, cleanup, guard));
}

impl OnceForeverTimer {
	fn take_phase(&self) -> (Phase, Option<Cleanup>) {
		let mut current = self.slot.lock();
		let phase = std::mem::replace(&mut current.phase, Phase::Stopped);
		let cleanup = match phase {
			Phase::Once(_) => current.cleanup.take(),
			_ => None,
		};
		(phase, cleanup)
	}

	fn finish_once_phase(&self, timer: &OnceTimer, cleanup: Option<Cleanup>) {
		timer.stop();
		if let Some(cleanup) = cleanup {
			let _ = protect(self.guard.as_ref(), "timer.cleanup", cleanup);
		}
	}

	/// Stops whichever phase is current and waits until cleanup has run.
	///
	/// A stop landing during the first fire waits for that fire to return.
	/// Must not be awaited from inside `fire`; use [`Self::request_stop`]
	/// there. Returns `true` if this call stopped a live timer.
	pub async fn stop(&self) -> bool {
		match self.take_phase() {
			(Phase::Once(timer), cleanup) => {
				self.finish_once_phase(&timer, cleanup);
				true
			}
			// The in-flight first fire observes `Stopped` and runs cleanup.
			(Phase::Firing, _) => {
				self.cleaned.notified().await;
				true
			}
			(Phase::Forever(timer), _) => timer.stop().await,
			(Phase::Stopped, _) => false,
		}
	}

	/// Non-waiting form of [`Self::stop`].
	pub fn request_stop(&self) -> bool {
		match self.take_phase() {
			(Phase::Once(timer), cleanup) => {
				self.finish_once_phase(&timer, cleanup);
				true
			}
			(Phase::Firing, _) => true,
			(Phase::Forever(timer), _) => timer.request_stop(),
			(Phase::Stopped, _) => false,
		}
	}

	/// Resets the initial delay during the once phase, or the interval
	/// afterwards.
	pub fn reset(&self, duration: Duration) -> bool {
		match &self.slot.lock().phase {
			Phase::Once(timer) => timer.reset(duration),
			Phase::Forever(timer) => timer.reset(duration),
			Phase::Firing | Phase::Stopped => false,
		}
	}

	/// Returns `true` until the timer has been stopped or has self-stopped.
	pub fn is_active(&self) -> bool {
		match &self.slot.lock().phase {
			Phase::Once(_) | Phase::Firing => true,
			Phase::Forever(timer) => timer.is_active(),
			Phase::Stopped => false,
		}
	}
}

impl std::fmt::Debug for OnceForeverTimer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let phase = match &self.slot.lock().phase {
			Phase::Once(_) => "once",
			Phase::Firing => "firing",
			Phase::Forever(_) => "forever",
			Phase::Stopped => "stopped",
		};
		f.debug_struct("OnceForeverTimer").field("phase", &phase).finish()
	}
}
