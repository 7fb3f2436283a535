use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Mailbox send error. Carries the rejected message back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxClosed<T>(pub T);

struct MailboxState<T> {
	queue: VecDeque<T>,
	closed: bool,
}

struct MailboxInner<T> {
	state: Mutex<MailboxState<T>>,
	notify_recv: Notify,
}

/// Multi-producer actor mailbox sender.
pub struct MailboxSender<T> {
	inner: Arc<MailboxInner<T>>,
}

/// Actor mailbox receiver.
pub struct MailboxReceiver<T> {
	inner: Arc<MailboxInner<T>>,
}

impl<T> Clone for MailboxSender<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

/// Creates an unbounded FIFO mailbox.
///
/// Enqueue never waits: a full mailbox does not exist, so producers running on
/// timer tasks or inside another actor's dispatch step are never suspended.
pub fn mailbox<T>() -> (MailboxSender<T>, MailboxReceiver<T>) {
	let inner = Arc::new(MailboxInner {
		state: Mutex::new(MailboxState {
			queue: VecDeque::new(),
			closed: false,
		}),
		notify_recv: Notify::new(),
	});
	(MailboxSender { inner: Arc::clone(&inner) }, MailboxReceiver { inner })
}

impl<T> MailboxSender<T> {
	/// Appends one message. Fails once the mailbox is closed.
	pub fn send(&self, msg: T) -> Result<(), MailboxClosed<T>> {
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(MailboxClosed(msg));
		}
		state.queue.push_back(msg);
		drop(state);
		self.inner.notify_recv.notify_one();
		Ok(())
	}

	/// Closes the mailbox. Later sends fail; the receiver wakes up.
	///
	/// Messages still queued are dropped, outside the lock.
	pub fn close(&self) {
		let discarded = {
			let mut state = self.inner.state.lock();
			state.closed = true;
			std::mem::take(&mut state.queue)
		};
		self.inner.notify_recv.notify_waiters();
		self.inner.notify_recv.notify_one();
		drop(discarded);
	}

	/// Returns whether the mailbox has been closed.
	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Returns current queue length.
	pub fn len(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	/// Returns `true` when no message is queued.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T> MailboxReceiver<T> {
	/// Receives one message. Returns `None` once the mailbox is closed.
	///
	/// Queued messages are not drained after close: an exited actor stops at
	/// its next receive.
	pub async fn recv(&self) -> Option<T> {
		loop {
			let notified = self.inner.notify_recv.notified();
			tokio::pin!(notified);
			// Register before inspecting state so a close between the check and
			// the await still wakes us.
			notified.as_mut().enable();
			{
				let mut state = self.inner.state.lock();
				if state.closed {
					return None;
				}
				if let Some(msg) = state.queue.pop_front() {
					return Some(msg);
				}
			}
			notified.await;
		}
	}
}
