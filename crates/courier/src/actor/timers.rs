//! Actor-side timer adapter.
//!
//! A timer fire never runs user code on the timer task. It only enqueues a
//! fired message into the owning actor's mailbox; the callback registered
//! under the timer's session then runs on the dispatch loop like any other
//! message.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::context::{TimerCallback, TimerEntry};
use super::message::{Message, SessionId};
use super::{ActorContext, ActorRef};
use crate::error::{ActorError, Result};
use crate::timer::{self, ForeverTimer, OnceForeverTimer, OnceTimer};

pub(crate) enum TimerKind {
	/// Zero-delay once timer: fired message injected at registration.
	Immediate,
	Once(OnceTimer),
	Forever(ForeverTimer),
	OnceForever(OnceForeverTimer),
}

impl TimerKind {
	/// Once kinds drop their entry on fire; repeating kinds on cleanup.
	fn is_once(&self) -> bool {
		matches!(self, Self::Immediate | Self::Once(_))
	}
}

/// State shared between a [`TimerHandle`] and the loop's session entry.
pub(crate) struct TimerControl {
	session: SessionId,
	stopped: AtomicBool,
	kind: TimerKind,
}

impl TimerControl {
	/// Returns `true` if this call moved the timer to stopped.
	pub(crate) fn mark_stopped(&self) -> bool {
		!self.stopped.swap(true, Ordering::AcqRel)
	}

	pub(crate) fn is_stopped(&self) -> bool {
		self.stopped.load(Ordering::Acquire)
	}

	/// Marks the timer stopped and asks the underlying timer to stop
	/// without waiting for it.
	pub(crate) fn halt(&self) -> bool {
		if !self.mark_stopped() {
			return false;
		}
		match &self.kind {
			TimerKind::Immediate => {}
			TimerKind::Once(timer) => {
				timer.stop();
			}
			TimerKind::Forever(timer) => {
				timer.request_stop();
			}
			TimerKind::OnceForever(timer) => {
				timer.request_stop();
			}
		}
		true
	}
}

/// Handle to a timer owned by an actor.
///
/// Cloning shares the same timer. Dropping every handle leaves the timer
/// running.
#[derive(Clone)]
pub struct TimerHandle {
	control: Arc<TimerControl>,
	owner: ActorRef,
}

impl TimerHandle {
	pub fn session(&self) -> SessionId {
		self.control.session
	}

	/// Stops the timer without waiting for its task.
	///
	/// Once this returns, the callback is never invoked again, even for a fire
	/// already queued in the mailbox. Returns `false` if the timer had already
	/// fired (once kinds) or been stopped. Safe to call from the timer's own
	/// callback.
	pub fn cancel(&self) -> bool {
		let halted = self.control.halt();
		if halted && self.control.kind.is_once() {
			forget(&self.owner, self.control.session);
		}
		halted
	}

	/// Stops the timer and, for repeating timers, waits until its task has
	/// acknowledged and run cleanup.
	///
	/// Returns `false` if the timer was already stopped, including a
	/// repeating timer that stopped itself after its owner exited.
	pub async fn stop(&self) -> bool {
		if !self.control.mark_stopped() {
			return false;
		}
		match &self.control.kind {
			TimerKind::Immediate => {
				forget(&self.owner, self.control.session);
				true
			}
			TimerKind::Once(timer) => {
				timer.stop();
				forget(&self.owner, self.control.session);
				true
			}
			TimerKind::Forever(timer) => timer.stop().await,
			TimerKind::OnceForever(timer) => timer.stop().await,
		}
	}

	/// Re-arms the pending delay (once phase) or restarts the interval
	/// (repeating phase). Returns `false` if the timer is no longer live.
	pub fn reset(&self, duration: Duration) -> bool {
		if self.control.is_stopped() {
			return false;
		}
		match &self.control.kind {
			TimerKind::Immediate => false,
			TimerKind::Once(timer) => timer.reset(duration),
			TimerKind::Forever(timer) => timer.reset(duration),
			TimerKind::OnceForever(timer) => timer.reset(duration),
		}
	}

	pub fn is_active(&self) -> bool {
		if self.control.is_stopped() {
			return false;
		}
		match &self.control.kind {
			TimerKind::Immediate => true,
			TimerKind::Once(timer) => timer.is_active(),
			TimerKind::Forever(timer) => timer.is_active(),
			TimerKind::OnceForever(timer) => timer.is_active(),
		}
	}
}

impl std::fmt::Debug for TimerHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TimerHandle")
			.field("owner", &self.owner.name())
			.field("session", &self.control.session)
			.field("stopped", &self.control.is_stopped())
			.finish()
	}
}

/// Per-actor timer factory, obtained from [`ActorContext::timer`].
pub struct Timers<'c, 'a> {
	ctx: &'c mut ActorContext<'a>,
}

impl<'c, 'a> Timers<'c, 'a> {
	pub(crate) fn new(ctx: &'c mut ActorContext<'a>) -> Self {
		Self { ctx }
	}

	/// Runs `callback` once on this actor's loop, `delay` from now.
	///
	/// A zero delay queues the fire behind every message already in the
	/// mailbox without arming a timer.
	pub fn once<F>(self, delay: Duration, callback: F) -> TimerHandle
	where
		F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
	{
		let session = self.ctx.state.next_session();
		let owner = self.ctx.actor;
		let kind = if delay.is_zero() {
			if owner.deliver(Message::OnceTimerFired { session }).is_err() {
				tracing::trace!(actor = owner.name(), %session, "timer.fire_dropped");
			}
			TimerKind::Immediate
		} else {
			let target = owner.clone();
			TimerKind::Once(timer::once(
				delay,
				move || {
					if target.deliver(Message::OnceTimerFired { session }).is_err() {
						tracing::trace!(actor = target.name(), %session, "timer.fire_dropped");
					}
				},
				Arc::clone(owner.guard()),
			))
		};

		let mut callback = Some(callback);
		self.register(
			session,
			kind,
			Box::new(move |ctx: &mut ActorContext<'_>| {
				if let Some(callback) = callback.take() {
					callback(ctx);
				}
			}),
		)
	}

	/// Runs `callback` on this actor's loop every `interval`, first one
	/// interval from now.
	pub fn forever<F>(self, interval: Duration, callback: F) -> Result<TimerHandle>
	where
		F: FnMut(&mut ActorContext<'_>) + Send + 'static,
	{
		check_interval(interval)?;
		let session = self.ctx.state.next_session();
		let owner = self.ctx.actor;
		let timer = timer::forever(
			interval,
			repeat_fire(owner.clone(), session),
			forget_on_cleanup(owner.clone(), session),
			Arc::clone(owner.guard()),
		);
		Ok(self.register(session, TimerKind::Forever(timer), Box::new(callback)))
	}

	/// Runs `callback` once after `delay`, then every `interval`.
	///
	/// A zero `delay` is the same as [`forever`](Self::forever).
	pub fn once_forever<F>(self, delay: Duration, interval: Duration, callback: F) -> Result<TimerHandle>
	where
		F: FnMut(&mut ActorContext<'_>) + Send + 'static,
	{
		if delay.is_zero() {
			return self.forever(interval, callback);
		}
		check_interval(interval)?;
		let session = self.ctx.state.next_session();
		let owner = self.ctx.actor;
		let timer = timer::once_forever(
			delay,
			interval,
			repeat_fire(owner.clone(), session),
			forget_on_cleanup(owner.clone(), session),
			Arc::clone(owner.guard()),
		);
		Ok(self.register(session, TimerKind::OnceForever(timer), Box::new(callback)))
	}

	fn register(self, session: SessionId, kind: TimerKind, callback: TimerCallback) -> TimerHandle {
		// Fires land in the mailbox, so inserting after the timer is armed is
		// still ahead of any fire this loop can observe.
		let control = Arc::new(TimerControl {
			session,
			stopped: AtomicBool::new(false),
			kind,
		});
		self.ctx.state.timers.insert(
			session,
			TimerEntry {
				callback: Some(callback),
				control: Arc::clone(&control),
			},
		);
		TimerHandle {
			control,
			owner: self.ctx.actor.clone(),
		}
	}
}

fn check_interval(interval: Duration) -> Result<()> {
	if interval.is_zero() {
		return Err(ActorError::InvalidTimerDuration {
			duration: interval,
			reason: "repeating interval must be positive",
		});
	}
	Ok(())
}

/// Fire callback of repeating timers: stops the timer once the owner is gone.
fn repeat_fire(target: ActorRef, session: SessionId) -> impl FnMut() -> ControlFlow<()> + Send + 'static {
	move || match target.deliver(Message::ForeverTimerFired { session }) {
		Ok(()) => ControlFlow::Continue(()),
		Err(_) => {
			tracing::trace!(actor = target.name(), %session, "timer.owner_exited");
			ControlFlow::Break(())
		}
	}
}

fn forget_on_cleanup(owner: ActorRef, session: SessionId) -> impl FnOnce() + Send + 'static {
	move || forget(&owner, session)
}

/// Removes a session entry on the owner's loop.
fn forget(owner: &ActorRef, session: SessionId) {
	let _ = owner.deliver(Message::Run(Box::new(move |ctx: &mut ActorContext<'_>| {
		ctx.state.timers.remove(&session);
	})));
}
