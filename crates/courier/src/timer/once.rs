use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::protect::{ProtectedCall, protect};
use crate::spawn::spawn;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const STOPPED: u8 = 2;

/// Handle to a one-shot timer.
#[derive(Debug)]
pub struct OnceTimer {
	state: Arc<AtomicU8>,
	resets: mpsc::UnboundedSender<Duration>,
	cancel: CancellationToken,
}

/// Starts a timer that runs `fire` once, `delay` from now.
pub fn once<F>(delay: Duration, fire: F, guard: Arc<dyn ProtectedCall>) -> OnceTimer
where
	F: FnOnce() + Send + 'static,
{
	let state = Arc::new(AtomicU8::new(ARMED));
	let (resets, mut reset_rx) = mpsc::unbounded_channel::<Duration>();
	let cancel = CancellationToken::new();

	let task_state = Arc::clone(&state);
	let task_cancel = cancel.clone();
	spawn("timer.once", async move {
		let sleep = tokio::time::sleep(delay);
		tokio::pin!(sleep);
		let mut resets_open = true;
		loop {
			tokio::select! {
				biased;
				() = task_cancel.cancelled() => return,
				reset = reset_rx.recv(), if resets_open => match reset {
					Some(delay) => sleep.as_mut().reset(Instant::now() + delay),
					None => resets_open = false,
				},
				() = &mut sleep => break,
			}
		}
		if task_state.compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire).is_ok() {
			let _ = protect(guard.as_ref(), "timer.once", fire);
		}
	});

	OnceTimer { state, resets, cancel }
}

impl OnceTimer {
	/// Prevents the timer from firing.
	///
	/// Returns `true` if this call stopped an armed timer, `false` if it had
	/// already fired or been stopped. A `true` result guarantees the fire
	/// callback never runs.
	pub fn stop(&self) -> bool {
		let stopped = self
			.state
			.compare_exchange(ARMED, STOPPED, Ordering::AcqRel, Ordering::Acquire)
			.is_ok();
		self.cancel.cancel();
		stopped
	}

	/// Re-arms the pending fire to happen `delay` from now.
	///
	/// Returns `false` once the timer has fired or been stopped. A reset that
	/// races with the deadline may be ignored.
	pub fn reset(&self, delay: Duration) -> bool {
		self.is_active() && self.resets.send(delay).is_ok()
	}

	/// Returns `true` while the timer is armed.
	pub fn is_active(&self) -> bool {
		self.state.load(Ordering::Acquire) == ARMED
	}
}
