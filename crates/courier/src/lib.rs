//! Lightweight actor runtime.
//!
//! Each actor is a sequential unit of execution with a private mailbox. Actors
//! talk only through messages: fire-and-forget sends, asynchronous call/ack
//! pairs correlated by session id, and timer fires routed back through the
//! owner's mailbox. All state an actor owns is touched by its dispatch loop
//! alone.
//!
//! # Core Types
//!
//! - [`ActorRef`] - Cloneable reference used to send to an actor
//! - [`ActorContext`] - Loop-only access to an actor's dispatcher, calls and timers
//! - [`ActorSpec`] - Creation-time configuration
//! - [`Request`] / [`Ack`] / [`Value`] - Message payloads
//! - [`Registry`] - Name to actor map with atomic get-or-create
//!
//! # Modules
//!
//! - [`timer`] - Process-wide timer primitives below the actor layer
//! - [`log`] - Per-actor leveled logging and subscriber setup
//! - [`mailbox`] - Unbounded FIFO mailbox

mod actor;
mod error;
pub mod log;
pub mod mailbox;
mod protect;
mod registry;
mod spawn;
pub mod timer;
mod value;

pub use actor::{
	ActorContext, ActorRef, ActorSpec, Dispatcher, SessionId, TimerHandle, Timers, create_actor, create_actor_blocking, start_actor,
};
pub use error::{ActorError, DispatchFault, Result};
pub use log::{ActorLogger, LogLevel, LogSink, TracingSink};
pub use protect::{CatchUnwind, ProtectedCall};
pub use registry::Registry;
use tokio::sync::oneshot;
pub use value::{Ack, Opaque, Request, RequestKind, Value};

/// Fire-and-forget send to `target`.
pub fn send(target: &ActorRef, tag: impl Into<String>, args: Vec<Value>) -> Result<()> {
	target.send(tag, args)
}

/// Calls `tag(args)` on `target` on behalf of `source`.
///
/// The call is registered on `source`'s loop, behind anything already queued
/// there; `on_ack` later runs on that loop with `target`'s ack. Resolves once
/// the request is in `target`'s mailbox, not when it is answered.
///
/// Fails with [`ActorError::Unavailable`] if either actor has exited. On
/// failure nothing stays registered and `on_ack` never runs.
pub async fn call<F>(source: &ActorRef, target: &ActorRef, tag: impl Into<String>, args: Vec<Value>, on_ack: F) -> Result<SessionId>
where
	F: FnOnce(&mut ActorContext<'_>, Ack) + Send + 'static,
{
	let (tx, rx) = oneshot::channel();
	let target = target.clone();
	let tag = tag.into();
	source.run(move |ctx| {
		let _ = tx.send(ctx.call(&target, tag, args, on_ack));
	})?;
	rx.await.map_err(|_| ActorError::unavailable(source.name()))?
}

/// [`Registry::get_or_create`] on the process-wide registry.
pub async fn get_or_create_named<F>(spec: impl Into<ActorSpec>, bootstrap: F) -> ActorRef
where
	F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
{
	Registry::global().get_or_create(spec, bootstrap).await
}

/// [`Registry::get_or_create_blocking`] on the process-wide registry.
pub fn get_or_create_named_blocking<F>(spec: impl Into<ActorSpec>, bootstrap: F) -> ActorRef
where
	F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
{
	Registry::global().get_or_create_blocking(spec, bootstrap)
}

/// Looks up `name` in the process-wide registry.
pub fn lookup(name: &str) -> Option<ActorRef> {
	Registry::global().lookup(name)
}

/// [`send`] to the actor registered under `name`.
pub fn send_by_name(name: &str, tag: impl Into<String>, args: Vec<Value>) -> Result<()> {
	resolve(name)?.send(tag, args)
}

/// [`call`] between two actors registered by name.
pub async fn call_by_name<F>(source: &str, target: &str, tag: impl Into<String>, args: Vec<Value>, on_ack: F) -> Result<SessionId>
where
	F: FnOnce(&mut ActorContext<'_>, Ack) + Send + 'static,
{
	let source = resolve(source)?;
	let target = resolve(target)?;
	call(&source, &target, tag, args, on_ack).await
}

fn resolve(name: &str) -> Result<ActorRef> {
	lookup(name).ok_or_else(|| ActorError::not_found(name))
}
