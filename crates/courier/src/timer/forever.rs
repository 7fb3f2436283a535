use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::protect::{ProtectedCall, protect};
use crate::spawn::spawn;

enum Control {
	Reset(Duration),
	Stop(Option<oneshot::Sender<()>>),
}

/// Handle to a repeating timer.
#[derive(Debug)]
pub struct ForeverTimer {
	ctrl: mpsc::UnboundedSender<Control>,
}

impl std::fmt::Debug for Control {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Reset(period) => f.debug_tuple("Reset").field(period).finish(),
			Self::Stop(ack) => f.debug_tuple("Stop").field(&ack.is_some()).finish(),
		}
	}
}

fn ticker(period: Duration) -> Interval {
	let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	ticker
}

/// Starts a timer that runs `fire` every `interval`, first one interval from now.
///
/// `fire` returning [`ControlFlow::Break`] stops the timer from inside its own
/// task. `cleanup` runs exactly once on the timer task when it stops, for
/// whatever reason.
///
/// # Panics
///
/// Panics if `interval` is zero.
pub fn forever<F, C>(interval: Duration, mut fire: F, cleanup: C, guard: Arc<dyn ProtectedCall>) -> ForeverTimer
where
	F: FnMut() -> ControlFlow<()> + Send + 'static,
	C: FnOnce() + Send + 'static,
{
	assert!(!interval.is_zero(), "forever timer interval must be > 0");
	let (ctrl, mut ctrl_rx) = mpsc::unbounded_channel();

	spawn("timer.forever", async move {
		let mut ticks = ticker(interval);
		let mut ctrl_open = true;
		let ack = loop {
			tokio::select! {
				biased;
				cmd = ctrl_rx.recv(), if ctrl_open => match cmd {
					Some(Control::Reset(period)) => ticks = ticker(period),
					Some(Control::Stop(ack)) => break ack,
					None => ctrl_open = false,
				},
				_ = ticks.tick() => {
					let flow = protect(guard.as_ref(), "timer.forever", &mut fire).unwrap_or(ControlFlow::Continue(()));
					if flow.is_break() {
						tracing::trace!("timer.forever.self_stop");
						break None;
					}
				}
			}
		};
		drop(ctrl_rx);
		let _ = protect(guard.as_ref(), "timer.cleanup", cleanup);
		if let Some(ack) = ack {
			let _ = ack.send(());
		}
	});

	ForeverTimer { ctrl }
}

impl ForeverTimer {
	/// Stops the timer and waits until its task has run `cleanup`.
	///
	/// Returns `true` if this call stopped a running timer.
	pub async fn stop(&self) -> bool {
		let (ack, acked) = oneshot::channel();
		if self.ctrl.send(Control::Stop(Some(ack))).is_err() {
			return false;
		}
		acked.await.is_ok()
	}

	/// Asks the timer to stop without waiting for the acknowledgement.
	pub fn request_stop(&self) -> bool {
		self.ctrl.send(Control::Stop(None)).is_ok()
	}

	/// Restarts the period: next fire `interval` from now, then every `interval`.
	pub fn reset(&self, interval: Duration) -> bool {
		!interval.is_zero() && self.ctrl.send(Control::Reset(interval)).is_ok()
	}

	/// Returns `true` until the timer task has finished.
	pub fn is_active(&self) -> bool {
		!self.ctrl.is_closed()
	}
}
