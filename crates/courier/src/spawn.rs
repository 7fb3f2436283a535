use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

/// Returns the ambient runtime handle, or the lazily built process runtime.
///
/// Actors may be created from plain threads (tests, `main` before a runtime
/// exists, blocking pools), so a fallback runtime is kept for the process
/// lifetime.
pub(crate) fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("courier-global")
			.build()
			.expect("failed to build courier global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns one runtime task (dispatch loop or timer) tagged with `label`.
pub(crate) fn spawn<F>(label: &'static str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(task = label, "courier.spawn");
	runtime_handle().spawn(fut)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn spawn_outside_runtime_uses_global_runtime() {
		let (tx, rx) = std::sync::mpsc::channel();
		let _task = spawn("test.plain-thread", async move {
			let _ = tx.send(tokio::runtime::Handle::try_current().is_ok());
		});
		let inside = rx.recv_timeout(std::time::Duration::from_secs(2)).expect("task should run on the global runtime");
		assert!(inside);
	}

	#[tokio::test]
	async fn spawn_inside_runtime_uses_ambient_handle() {
		let value = spawn("test.ambient", async { 7 }).await.expect("task should complete");
		assert_eq!(value, 7);
	}
}
