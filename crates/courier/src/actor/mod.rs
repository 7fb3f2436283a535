//! Actors: a mailbox, a dispatch loop, and loop-owned session state.
//!
//! Every piece of user code attached to an actor (bootstrap, dispatcher, ack
//! callbacks, timer callbacks, [`ActorRef::run`] tasks) executes on that
//! actor's dispatch loop, one message at a time, under the actor's
//! [`ProtectedCall`] strategy.

mod context;
mod dispatch;
mod message;
mod timers;

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use context::{ActorContext, Dispatcher};
use message::Message;
pub use message::SessionId;
pub use timers::{TimerHandle, Timers};

use crate::error::{ActorError, Result};
use crate::log::{ActorLogger, LogLevel, LogSink, TracingSink};
use crate::mailbox::{MailboxSender, mailbox};
use crate::protect::{CatchUnwind, ProtectedCall};
use crate::value::{Request, RequestKind, Value};

/// Creation-time configuration for one actor.
#[derive(Clone)]
pub struct ActorSpec {
	name: String,
	guard: Arc<dyn ProtectedCall>,
	log_level: LogLevel,
	log_sink: Arc<dyn LogSink>,
}

impl ActorSpec {
	/// Creates a spec with the [`CatchUnwind`] strategy and `Debug` logging
	/// into `tracing`.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			guard: Arc::new(CatchUnwind),
			log_level: LogLevel::default(),
			log_sink: Arc::new(TracingSink),
		}
	}

	/// Sets the strategy used to run user code on the loop.
	#[must_use]
	pub fn protected_call(mut self, guard: Arc<dyn ProtectedCall>) -> Self {
		self.guard = guard;
		self
	}

	/// Sets the minimum level of the actor's logger.
	#[must_use]
	pub fn log_level(mut self, level: LogLevel) -> Self {
		self.log_level = level;
		self
	}

	/// Routes the actor's log lines to `sink` instead of `tracing`.
	#[must_use]
	pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
		self.log_sink = sink;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

impl fmt::Debug for ActorSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActorSpec").field("name", &self.name).field("log_level", &self.log_level).finish_non_exhaustive()
	}
}

impl From<&str> for ActorSpec {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for ActorSpec {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}

struct ActorShared {
	name: String,
	mailbox: MailboxSender<Message>,
	exited: CancellationToken,
	/// Cancelled once bootstrap has returned, faulted, or been dropped unrun.
	booted: CancellationToken,
	logger: ActorLogger,
	guard: Arc<dyn ProtectedCall>,
}

/// Cloneable reference to a running (or exited) actor.
///
/// Equality is identity: two refs are equal when they point at the same actor.
#[derive(Clone)]
pub struct ActorRef {
	inner: Arc<ActorShared>,
}

impl ActorRef {
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn logger(&self) -> &ActorLogger {
		&self.inner.logger
	}

	/// Fire-and-forget: enqueues `tag(args)` for this actor's dispatcher.
	///
	/// Fails with [`ActorError::Unavailable`] once the actor has exited.
	pub fn send(&self, tag: impl Into<String>, args: Vec<Value>) -> Result<()> {
		self.deliver(Message::Send(Request::new(RequestKind::Send, tag, args)))
	}

	/// Runs `task` on this actor's loop, after everything already queued.
	pub fn run<F>(&self, task: F) -> Result<()>
	where
		F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
	{
		self.deliver(Message::Run(Box::new(task)))
	}

	/// Stops the actor before its next message.
	///
	/// Non-blocking. A message already being handled completes; queued ones
	/// are dropped and later sends fail.
	pub fn exit(&self) {
		if self.inner.exited.is_cancelled() {
			return;
		}
		self.inner.exited.cancel();
		self.inner.mailbox.close();
		tracing::debug!(actor = self.name(), "actor.exit_requested");
	}

	pub fn is_exited(&self) -> bool {
		self.inner.exited.is_cancelled()
	}

	pub(crate) fn deliver(&self, msg: Message) -> Result<()> {
		if self.is_exited() {
			return Err(ActorError::unavailable(self.name()));
		}
		self.inner.mailbox.send(msg).map_err(|_| ActorError::unavailable(self.name()))
	}

	pub(crate) fn guard(&self) -> &Arc<dyn ProtectedCall> {
		&self.inner.guard
	}

	pub(crate) fn exited_token(&self) -> &CancellationToken {
		&self.inner.exited
	}

	/// Resolves once bootstrap has finished on the loop.
	pub(crate) async fn booted(&self) {
		self.inner.booted.cancelled().await;
	}

	/// Blocks the current thread until bootstrap has finished on the loop.
	pub(crate) fn booted_blocking(&self) {
		crate::spawn::runtime_handle().block_on(self.booted());
	}
}

impl PartialEq for ActorRef {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for ActorRef {}

impl fmt::Debug for ActorRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActorRef")
			.field("name", &self.name())
			.field("exited", &self.is_exited())
			.field("queued", &self.inner.mailbox.len())
			.finish()
	}
}

/// Starts an actor and returns once `bootstrap` has run on its loop.
///
/// `bootstrap` is the first message the loop handles and runs under the
/// spec's [`ProtectedCall`] strategy; a faulting bootstrap still completes
/// creation. Actors live until [`ActorRef::exit`].
///
/// Code already on an actor loop cannot await; it uses [`start_actor`].
pub async fn create_actor<F>(spec: impl Into<ActorSpec>, bootstrap: F) -> ActorRef
where
	F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
{
	let actor = start_actor(spec, bootstrap);
	actor.booted().await;
	actor
}

/// [`create_actor`] for threads outside any runtime.
///
/// # Panics
///
/// Panics when called from within an async runtime.
pub fn create_actor_blocking<F>(spec: impl Into<ActorSpec>, bootstrap: F) -> ActorRef
where
	F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
{
	let actor = start_actor(spec, bootstrap);
	actor.booted_blocking();
	actor
}

/// Starts an actor without waiting for `bootstrap`.
///
/// Every message sent to the returned ref is still handled after
/// `bootstrap`, since it is first in the mailbox.
pub fn start_actor<F>(spec: impl Into<ActorSpec>, bootstrap: F) -> ActorRef
where
	F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
{
	let spec = spec.into();
	let (tx, rx) = mailbox();
	let actor = ActorRef {
		inner: Arc::new(ActorShared {
			logger: ActorLogger::with_sink(&spec.name, spec.log_level, spec.log_sink),
			name: spec.name,
			mailbox: tx,
			exited: CancellationToken::new(),
			booted: CancellationToken::new(),
			guard: spec.guard,
		}),
	};

	// Dropped when bootstrap returns or unwinds, or with the message if the
	// actor exits before its loop runs.
	let done = actor.inner.booted.clone().drop_guard();
	let bootstrap = move |ctx: &mut ActorContext<'_>| {
		let _done = done;
		bootstrap(ctx);
	};
	// A fresh mailbox is open.
	let _ = actor.inner.mailbox.send(Message::Bootstrap(Box::new(bootstrap)));
	dispatch::start(actor.clone(), rx);
	actor
}
