use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::actor::{ActorContext, ActorRef, ActorSpec, start_actor};

/// Name to actor map with atomic get-or-create.
///
/// Entries are never removed; an exited actor stays registered under its
/// name and rejects messages.
#[derive(Debug, Default)]
pub struct Registry {
	actors: Mutex<HashMap<String, ActorRef>>,
}

impl Registry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Process-wide registry, empty at startup.
	pub fn global() -> &'static Registry {
		static GLOBAL: OnceLock<Registry> = OnceLock::new();
		GLOBAL.get_or_init(Registry::new)
	}

	/// Returns the actor registered under the spec's name, creating it with
	/// `bootstrap` if absent.
	///
	/// Resolves once the actor's bootstrap has run, whichever caller created
	/// it. Concurrent first calls for one name build exactly one actor; the
	/// losers' `bootstrap` is dropped unused.
	pub async fn get_or_create<F>(&self, spec: impl Into<ActorSpec>, bootstrap: F) -> ActorRef
	where
		F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
	{
		let actor = self.get_or_start(spec.into(), bootstrap);
		actor.booted().await;
		actor
	}

	/// [`Self::get_or_create`] for threads outside any runtime.
	///
	/// # Panics
	///
	/// Panics when called from within an async runtime.
	pub fn get_or_create_blocking<F>(&self, spec: impl Into<ActorSpec>, bootstrap: F) -> ActorRef
	where
		F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
	{
		let actor = self.get_or_start(spec.into(), bootstrap);
		actor.booted_blocking();
		actor
	}

	/// Lookup and start under one lock; starting only queues `bootstrap`.
	fn get_or_start<F>(&self, spec: ActorSpec, bootstrap: F) -> ActorRef
	where
		F: FnOnce(&mut ActorContext<'_>) + Send + 'static,
	{
		let mut actors = self.actors.lock();
		if let Some(actor) = actors.get(spec.name()) {
			return actor.clone();
		}
		let actor = start_actor(spec, bootstrap);
		actors.insert(actor.name().to_owned(), actor.clone());
		tracing::debug!(actor = actor.name(), "registry.created");
		actor
	}

	pub fn lookup(&self, name: &str) -> Option<ActorRef> {
		self.actors.lock().get(name).cloned()
	}

	pub fn len(&self) -> usize {
		self.actors.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.actors.lock().keys().cloned().collect();
		names.sort();
		names
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::{Arc, Barrier};

	use super::*;

	#[tokio::test]
	async fn second_get_or_create_returns_the_same_actor() {
		let registry = Registry::new();
		let first = registry.get_or_create("x", |_ctx| {}).await;
		let second = registry.get_or_create("x", |_ctx| panic!("existing actor is reused")).await;

		assert_eq!(first, second);
		assert_eq!(registry.lookup("x"), Some(first.clone()));
		assert_eq!(registry.lookup("y"), None);
		assert_eq!(registry.names(), vec!["x".to_owned()]);
		first.exit();
	}

	#[test]
	fn concurrent_first_creation_builds_one_actor() {
		let registry = Arc::new(Registry::new());
		let bootstraps = Arc::new(AtomicUsize::new(0));
		let barrier = Arc::new(Barrier::new(8));

		let workers: Vec<_> = (0..8)
			.map(|_| {
				let registry = Arc::clone(&registry);
				let bootstraps = Arc::clone(&bootstraps);
				let barrier = Arc::clone(&barrier);
				std::thread::spawn(move || {
					barrier.wait();
					registry.get_or_create_blocking("contended", move |_ctx| {
						bootstraps.fetch_add(1, Ordering::SeqCst);
					})
				})
			})
			.collect();
		let actors: Vec<ActorRef> = workers.into_iter().map(|w| w.join().expect("worker should not panic")).collect();

		assert!(actors.windows(2).all(|pair| pair[0] == pair[1]));
		assert_eq!(registry.len(), 1);
		// Every caller, winner or not, returns after the one bootstrap ran.
		assert_eq!(bootstraps.load(Ordering::SeqCst), 1);
		actors[0].exit();
	}

	#[tokio::test]
	async fn exited_actors_stay_registered() {
		let registry = Registry::new();
		let actor = registry.get_or_create("gone", |_ctx| {}).await;
		actor.exit();
		let again = registry.get_or_create("gone", |_ctx| {}).await;
		assert!(again.is_exited());
		assert_eq!(again, actor);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn losing_caller_waits_for_the_winning_bootstrap() {
		let registry = Arc::new(Registry::new());
		let (release, gate) = std::sync::mpsc::channel::<()>();
		let booted = Arc::new(AtomicUsize::new(0));
		let marker = Arc::clone(&booted);

		let winner = registry.get_or_start(ActorSpec::new("slow"), move |_ctx| {
			let _ = gate.recv();
			marker.fetch_add(1, Ordering::SeqCst);
		});
		let loser = {
			let registry = Arc::clone(&registry);
			tokio::spawn(async move { registry.get_or_create("slow", |_ctx| {}).await })
		};
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		assert!(!loser.is_finished(), "loser returned before bootstrap ran");

		release.send(()).expect("bootstrap is waiting");
		let loser = loser.await.expect("caller should not panic");
		assert_eq!(booted.load(Ordering::SeqCst), 1);
		assert_eq!(loser, winner);
		winner.exit();
	}
}
