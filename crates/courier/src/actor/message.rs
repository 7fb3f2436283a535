use std::fmt;

use super::{ActorContext, ActorRef};
use crate::value::{Ack, Request};

/// Per-actor correlation token for a pending call or a live timer.
///
/// Allocated from a wrapping counter; only live entries need to be distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
	pub(crate) const fn new(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Closure executed on an actor's dispatch loop.
pub(crate) type Task = Box<dyn FnOnce(&mut ActorContext<'_>) + Send>;

/// Mailbox envelope.
pub(crate) enum Message {
	/// Creation-time initializer; always the first message of a mailbox.
	Bootstrap(Task),
	Send(Request),
	CallRequest {
		request: Request,
		reply_to: ActorRef,
		session: SessionId,
	},
	CallAck {
		session: SessionId,
		ack: Ack,
	},
	OnceTimerFired {
		session: SessionId,
	},
	ForeverTimerFired {
		session: SessionId,
	},
	/// Runtime-internal or user task funneled onto the loop.
	Run(Task),
}

impl Message {
	pub(crate) fn kind(&self) -> &'static str {
		match self {
			Self::Bootstrap(_) => "bootstrap",
			Self::Send(_) => "send",
			Self::CallRequest { .. } => "call_request",
			Self::CallAck { .. } => "call_ack",
			Self::OnceTimerFired { .. } => "once_timer_fired",
			Self::ForeverTimerFired { .. } => "forever_timer_fired",
			Self::Run(_) => "run",
		}
	}
}

impl fmt::Debug for Message {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Send(request) => f.debug_tuple("Send").field(request).finish(),
			Self::CallRequest { request, reply_to, session } => f
				.debug_struct("CallRequest")
				.field("request", request)
				.field("reply_to", &reply_to.name())
				.field("session", session)
				.finish(),
			Self::CallAck { session, ack } => f.debug_struct("CallAck").field("session", session).field("ack", ack).finish(),
			Self::OnceTimerFired { session } | Self::ForeverTimerFired { session } => {
				f.debug_struct(self.kind()).field("session", session).finish()
			}
			Self::Bootstrap(_) | Self::Run(_) => f.write_str(self.kind()),
		}
	}
}
