use std::collections::HashMap;
use std::sync::Arc;

use super::ActorRef;
use super::message::{Message, SessionId};
use super::timers::{TimerControl, Timers};
use crate::error::Result;
use crate::log::ActorLogger;
use crate::value::{Ack, Request, RequestKind, Value};

/// User handler mapping inbound requests to acks.
///
/// Always invoked on the owning actor's dispatch loop. Closures of the shape
/// `FnMut(&mut ActorContext<'_>, Request) -> Ack` implement it.
pub trait Dispatcher: Send + 'static {
	fn dispatch(&mut self, ctx: &mut ActorContext<'_>, request: Request) -> Ack;
}

impl<F> Dispatcher for F
where
	F: FnMut(&mut ActorContext<'_>, Request) -> Ack + Send + 'static,
{
	fn dispatch(&mut self, ctx: &mut ActorContext<'_>, request: Request) -> Ack {
		self(ctx, request)
	}
}

pub(crate) type AckCallback = Box<dyn FnOnce(&mut ActorContext<'_>, Ack) + Send>;
pub(crate) type TimerCallback = Box<dyn FnMut(&mut ActorContext<'_>) + Send>;

pub(crate) struct TimerEntry {
	/// `None` while the callback is running.
	pub(crate) callback: Option<TimerCallback>,
	pub(crate) control: Arc<TimerControl>,
}

/// Loop-owned actor state. Never shared: only the dispatch task holds it.
#[derive(Default)]
pub(crate) struct ActorState {
	next_session: u64,
	pub(crate) calls: HashMap<SessionId, AckCallback>,
	pub(crate) timers: HashMap<SessionId, TimerEntry>,
	pub(crate) dispatcher: Option<Box<dyn Dispatcher>>,
	/// Set while the installed dispatcher is lent out to a running dispatch.
	pub(crate) dispatcher_lent: bool,
}

impl ActorState {
	pub(crate) fn next_session(&mut self) -> SessionId {
		self.next_session = self.next_session.wrapping_add(1);
		SessionId::new(self.next_session)
	}
}

/// Access to an actor's private state, handed to code running on its loop.
///
/// Bootstraps, dispatchers, ack callbacks, timer callbacks and
/// [`ActorRef::run`] tasks all receive one. It cannot be obtained anywhere
/// else, so the session counter and both session maps only change on the
/// actor's own loop.
pub struct ActorContext<'a> {
	pub(crate) actor: &'a ActorRef,
	pub(crate) state: &'a mut ActorState,
}

impl<'a> ActorContext<'a> {
	pub(crate) fn new(actor: &'a ActorRef, state: &'a mut ActorState) -> Self {
		Self { actor, state }
	}

	pub fn actor(&self) -> &'a ActorRef {
		self.actor
	}

	pub fn name(&self) -> &'a str {
		self.actor.name()
	}

	pub fn logger(&self) -> &'a ActorLogger {
		self.actor.logger()
	}

	/// Installs a closure dispatcher, replacing any previous one.
	///
	/// Called from inside a dispatch, the replacement handles the next message.
	pub fn set_dispatcher<F>(&mut self, dispatcher: F)
	where
		F: FnMut(&mut ActorContext<'_>, Request) -> Ack + Send + 'static,
	{
		self.install_dispatcher(dispatcher);
	}

	/// Installs any [`Dispatcher`] implementation.
	pub fn install_dispatcher(&mut self, dispatcher: impl Dispatcher) {
		self.state.dispatcher = Some(Box::new(dispatcher));
		self.state.dispatcher_lent = false;
	}

	/// Removes the dispatcher; later requests are logged and dropped.
	pub fn clear_dispatcher(&mut self) {
		self.state.dispatcher = None;
		self.state.dispatcher_lent = false;
	}

	pub fn has_dispatcher(&self) -> bool {
		self.state.dispatcher.is_some() || self.state.dispatcher_lent
	}

	/// Calls `tag(args)` on `target`; `on_ack` later runs on this loop with
	/// the target's ack.
	///
	/// Fails with [`ActorError::Unavailable`](crate::ActorError::Unavailable)
	/// when `target` has exited, in which case nothing stays registered and
	/// `on_ack` never runs. A target that never answers leaves the callback
	/// pending until [`cancel_call`](Self::cancel_call) or exit.
	pub fn call<F>(&mut self, target: &ActorRef, tag: impl Into<String>, args: Vec<Value>, on_ack: F) -> Result<SessionId>
	where
		F: FnOnce(&mut ActorContext<'_>, Ack) + Send + 'static,
	{
		let session = self.state.next_session();
		self.state.calls.insert(session, Box::new(on_ack));

		let request = Request::new(RequestKind::Call, tag, args);
		let msg = Message::CallRequest {
			request,
			reply_to: self.actor.clone(),
			session,
		};
		if let Err(err) = target.deliver(msg) {
			self.state.calls.remove(&session);
			return Err(err);
		}
		Ok(session)
	}

	/// Forgets a pending call. A late ack for it becomes a no-op.
	///
	/// Returns `true` if the call was still pending.
	pub fn cancel_call(&mut self, session: SessionId) -> bool {
		self.state.calls.remove(&session).is_some()
	}

	/// Fire-and-forget send to `target`.
	pub fn send(&self, target: &ActorRef, tag: impl Into<String>, args: Vec<Value>) -> Result<()> {
		target.send(tag, args)
	}

	/// Timer factory whose callbacks run on this loop.
	pub fn timer(&mut self) -> Timers<'_, 'a> {
		Timers::new(self)
	}

	/// Stops the timer registered under `session` and drops its callback.
	///
	/// Returns `true` if a live timer was registered under `session`.
	pub fn cancel_timer(&mut self, session: SessionId) -> bool {
		match self.state.timers.remove(&session) {
			Some(entry) => {
				entry.control.halt();
				true
			}
			None => false,
		}
	}

	/// Marks this actor exited; the loop stops before its next message.
	pub fn exit(&self) {
		self.actor.exit();
	}

	/// Calls still waiting for an ack.
	pub fn pending_calls(&self) -> usize {
		self.state.calls.len()
	}

	/// Timers whose session entry is still registered.
	pub fn pending_timers(&self) -> usize {
		self.state.timers.len()
	}
}

impl std::fmt::Debug for ActorContext<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActorContext")
			.field("actor", &self.actor.name())
			.field("pending_calls", &self.state.calls.len())
			.field("pending_timers", &self.state.timers.len())
			.field("has_dispatcher", &self.has_dispatcher())
			.finish()
	}
}
