//! The per-actor dispatch loop.

use tracing::Instrument;

use super::context::ActorState;
use super::message::{Message, SessionId, Task};
use super::{ActorContext, ActorRef};
use crate::mailbox::MailboxReceiver;
use crate::protect::protect;
use crate::value::{Ack, Request};

/// Spawns the loop that owns `actor`'s state until it exits.
pub(crate) fn start(actor: ActorRef, rx: MailboxReceiver<Message>) {
	let span = tracing::debug_span!("actor", name = %actor.name());
	crate::spawn::spawn("actor.dispatch", run(actor, rx).instrument(span));
}

async fn run(actor: ActorRef, rx: MailboxReceiver<Message>) {
	let mut state = ActorState::default();
	tracing::debug!("actor.start");

	loop {
		// Exit is observed here, before blocking for the next message.
		let msg = tokio::select! {
			biased;
			() = actor.exited_token().cancelled() => break,
			msg = rx.recv() => {
				let Some(msg) = msg else {
					break;
				};
				msg
			}
		};
		tracing::trace!(kind = msg.kind(), "actor.recv");
		let mut ctx = ActorContext::new(&actor, &mut state);
		handle(&mut ctx, msg);
	}

	tracing::debug!(pending_calls = state.calls.len(), pending_timers = state.timers.len(), "actor.exit");
}

fn handle(ctx: &mut ActorContext<'_>, msg: Message) {
	match msg {
		Message::Bootstrap(task) => run_task(ctx, "bootstrap", task),
		Message::Run(task) => run_task(ctx, "run", task),
		Message::Send(request) => {
			let _ = dispatch_request(ctx, request);
		}
		Message::CallRequest { request, reply_to, session } => {
			let Some(ack) = dispatch_request(ctx, request) else {
				return;
			};
			if reply_to.deliver(Message::CallAck { session, ack }).is_err() {
				tracing::debug!(caller = reply_to.name(), %session, "call.reply_dropped");
			}
		}
		Message::CallAck { session, ack } => deliver_ack(ctx, session, ack),
		Message::OnceTimerFired { session } => fire_timer(ctx, session, true),
		Message::ForeverTimerFired { session } => fire_timer(ctx, session, false),
	}
}

fn run_task(ctx: &mut ActorContext<'_>, label: &'static str, task: Task) {
	let actor = ctx.actor();
	let _ = protect(actor.guard().as_ref(), label, || task(ctx));
}

/// Runs the installed dispatcher. `None` when there is none or it faulted.
fn dispatch_request(ctx: &mut ActorContext<'_>, request: Request) -> Option<Ack> {
	let Some(mut dispatcher) = ctx.state.dispatcher.take() else {
		ctx.logger().warn(format_args!("no dispatcher installed, dropping {request}"));
		return None;
	};
	ctx.state.dispatcher_lent = true;

	let actor = ctx.actor();
	let ack = protect(actor.guard().as_ref(), "dispatch", || dispatcher.dispatch(ctx, request));

	// Replaced or cleared during the dispatch: the new value wins.
	if ctx.state.dispatcher_lent {
		ctx.state.dispatcher_lent = false;
		ctx.state.dispatcher = Some(dispatcher);
	}
	ack
}

fn deliver_ack(ctx: &mut ActorContext<'_>, session: SessionId, ack: Ack) {
	let Some(on_ack) = ctx.state.calls.remove(&session) else {
		tracing::trace!(%session, "call.ack_unmatched");
		return;
	};
	let actor = ctx.actor();
	let _ = protect(actor.guard().as_ref(), "call.ack", || on_ack(ctx, ack));
}

fn fire_timer(ctx: &mut ActorContext<'_>, session: SessionId, once: bool) {
	let callback = if once {
		let Some(entry) = ctx.state.timers.remove(&session) else {
			return;
		};
		// Fired once kinds count as stopped so a later cancel reports `false`.
		if !entry.control.mark_stopped() {
			return;
		}
		entry.callback
	} else {
		let Some(entry) = ctx.state.timers.get_mut(&session) else {
			return;
		};
		if entry.control.is_stopped() {
			return;
		}
		entry.callback.take()
	};
	let Some(mut callback) = callback else {
		return;
	};

	let actor = ctx.actor();
	let _ = protect(actor.guard().as_ref(), "timer", || callback(ctx));

	if !once && let Some(entry) = ctx.state.timers.get_mut(&session) {
		entry.callback = Some(callback);
	}
}
