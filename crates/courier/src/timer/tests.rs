use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::*;
use crate::ProtectedCall;
use crate::protect::CatchUnwind;

fn guard() -> Arc<dyn ProtectedCall> {
	Arc::new(CatchUnwind)
}

fn counter() -> (Arc<AtomicUsize>, impl FnMut() -> ControlFlow<()> + Send + 'static) {
	let fires = Arc::new(AtomicUsize::new(0));
	let counted = Arc::clone(&fires);
	(fires, move || {
		counted.fetch_add(1, Ordering::SeqCst);
		ControlFlow::Continue(())
	})
}

#[tokio::test]
async fn once_fires_after_delay() {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let start = Instant::now();
	let timer = once(
		Duration::from_millis(30),
		move || {
			let _ = tx.send(Instant::now());
		},
		guard(),
	);
	assert!(timer.is_active());

	let fired_at = tokio::time::timeout(Duration::from_secs(2), rx.recv())
		.await
		.expect("once timer should fire")
		.expect("sender alive until fire");
	assert!(fired_at.duration_since(start) >= Duration::from_millis(30));
	assert!(!timer.is_active());
	assert!(!timer.stop(), "stop after fire reports nothing stopped");
}

#[tokio::test]
async fn once_stop_prevents_fire() {
	let fired = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&fired);
	let timer = once(Duration::from_millis(30), move || flag.store(true, Ordering::SeqCst), guard());

	assert!(timer.stop());
	assert!(!timer.stop(), "second stop is a no-op");
	assert!(!timer.reset(Duration::from_millis(1)));

	tokio::time::sleep(Duration::from_millis(80)).await;
	assert!(!fired.load(Ordering::SeqCst));
}

#[tokio::test]
async fn once_reset_moves_deadline() {
	let fired = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&fired);
	let timer = once(Duration::from_millis(20), move || flag.store(true, Ordering::SeqCst), guard());

	assert!(timer.reset(Duration::from_millis(150)));
	tokio::time::sleep(Duration::from_millis(60)).await;
	assert!(!fired.load(Ordering::SeqCst), "reset should postpone the fire");

	tokio::time::sleep(Duration::from_millis(200)).await;
	assert!(fired.load(Ordering::SeqCst));
}

#[tokio::test]
async fn forever_repeats_until_stopped_and_runs_cleanup() {
	let (fires, fire) = counter();
	let cleaned = Arc::new(AtomicBool::new(false));
	let cleaned_flag = Arc::clone(&cleaned);
	let timer = forever(Duration::from_millis(10), fire, move || cleaned_flag.store(true, Ordering::SeqCst), guard());

	tokio::time::sleep(Duration::from_millis(80)).await;
	assert!(timer.stop().await);
	assert!(cleaned.load(Ordering::SeqCst), "stop returns only after cleanup ran");
	assert!(!timer.is_active());

	let seen = fires.load(Ordering::SeqCst);
	assert!(seen >= 3, "expected at least 3 fires in 80ms at 10ms, got {seen}");

	tokio::time::sleep(Duration::from_millis(40)).await;
	assert_eq!(fires.load(Ordering::SeqCst), seen, "no fire after stop returned");
	assert!(!timer.stop().await, "second stop is a no-op");
}

#[tokio::test]
async fn forever_does_not_fire_immediately() {
	let (fires, fire) = counter();
	let timer = forever(Duration::from_millis(50), fire, || {}, guard());
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert_eq!(fires.load(Ordering::SeqCst), 0);
	timer.stop().await;
}

#[tokio::test]
async fn forever_self_stops_on_break() {
	let fires = Arc::new(AtomicUsize::new(0));
	let counted = Arc::clone(&fires);
	let cleanups = Arc::new(AtomicUsize::new(0));
	let cleanup_count = Arc::clone(&cleanups);
	let timer = forever(
		Duration::from_millis(5),
		move || {
			if counted.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
				ControlFlow::Break(())
			} else {
				ControlFlow::Continue(())
			}
		},
		move || {
			cleanup_count.fetch_add(1, Ordering::SeqCst);
		},
		guard(),
	);

	tokio::time::sleep(Duration::from_millis(80)).await;
	assert_eq!(fires.load(Ordering::SeqCst), 3);
	assert_eq!(cleanups.load(Ordering::SeqCst), 1);
	assert!(!timer.is_active());
	assert!(!timer.stop().await);
}

#[tokio::test]
async fn forever_survives_faulting_fire() {
	let fires = Arc::new(AtomicUsize::new(0));
	let counted = Arc::clone(&fires);
	let timer = forever(
		Duration::from_millis(5),
		move || {
			if counted.fetch_add(1, Ordering::SeqCst) == 0 {
				panic!("first tick faults");
			}
			ControlFlow::Continue(())
		},
		|| {},
		guard(),
	);

	tokio::time::sleep(Duration::from_millis(60)).await;
	assert!(timer.stop().await);
	assert!(fires.load(Ordering::SeqCst) >= 2, "timer keeps ticking after a faulting fire");
}

#[tokio::test]
async fn forever_reset_changes_period() {
	let (fires, fire) = counter();
	let timer = forever(Duration::from_millis(200), fire, || {}, guard());
	assert!(timer.reset(Duration::from_millis(10)));
	assert!(!timer.reset(Duration::ZERO));

	tokio::time::sleep(Duration::from_millis(80)).await;
	assert!(timer.stop().await);
	assert!(fires.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn once_forever_fires_once_then_repeats() {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let start = Instant::now();
	let timer = once_forever(
		Duration::from_millis(60),
		Duration::from_millis(20),
		move || {
			let _ = tx.send(Instant::now());
			ControlFlow::Continue(())
		},
		|| {},
		guard(),
	);

	let mut stamps = Vec::new();
	for _ in 0..4 {
		let at = tokio::time::timeout(Duration::from_secs(2), rx.recv())
			.await
			.expect("timer should keep firing")
			.expect("sender alive");
		stamps.push(at.duration_since(start));
	}
	assert!(timer.stop().await);

	assert!(stamps[0] >= Duration::from_millis(60), "first fire honours the once delay: {stamps:?}");
	for pair in stamps.windows(2) {
		assert!(pair[1] - pair[0] >= Duration::from_millis(10), "later fires follow the interval: {stamps:?}");
	}
}

#[tokio::test]
async fn once_forever_stop_during_once_phase_cancels_everything() {
	let (fires, fire) = counter();
	let cleanups = Arc::new(AtomicUsize::new(0));
	let cleanup_count = Arc::clone(&cleanups);
	let timer = once_forever(
		Duration::from_millis(30),
		Duration::from_millis(5),
		fire,
		move || {
			cleanup_count.fetch_add(1, Ordering::SeqCst);
		},
		guard(),
	);

	assert!(timer.request_stop());
	assert!(!timer.is_active());
	tokio::time::sleep(Duration::from_millis(80)).await;

	assert_eq!(fires.load(Ordering::SeqCst), 0, "forever phase must never start");
	assert_eq!(cleanups.load(Ordering::SeqCst), 1);
	assert!(!timer.stop().await);
}

#[tokio::test]
async fn once_forever_stop_in_forever_phase_waits_for_cleanup() {
	let (fires, fire) = counter();
	let cleaned = Arc::new(AtomicBool::new(false));
	let cleaned_flag = Arc::clone(&cleaned);
	let timer = once_forever(
		Duration::from_millis(5),
		Duration::from_millis(5),
		fire,
		move || cleaned_flag.store(true, Ordering::SeqCst),
		guard(),
	);

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(fires.load(Ordering::SeqCst) >= 2);
	assert!(timer.stop().await);
	assert!(cleaned.load(Ordering::SeqCst));
	assert!(format!("{timer:?}").contains("stopped"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn once_forever_stop_during_first_fire_waits_for_cleanup() {
	let (started_tx, mut started) = mpsc::unbounded_channel();
	let fires = Arc::new(AtomicUsize::new(0));
	let fire_count = Arc::clone(&fires);
	let cleaned = Arc::new(AtomicBool::new(false));
	let cleaned_flag = Arc::clone(&cleaned);
	let timer = once_forever(
		Duration::from_millis(10),
		Duration::from_millis(10),
		move || {
			fire_count.fetch_add(1, Ordering::SeqCst);
			let _ = started_tx.send(());
			std::thread::sleep(Duration::from_millis(200));
			ControlFlow::Continue(())
		},
		move || cleaned_flag.store(true, Ordering::SeqCst),
		guard(),
	);

	tokio::time::timeout(Duration::from_secs(2), started.recv())
		.await
		.expect("first fire starts")
		.expect("fire holds its sender");
	assert!(timer.stop().await);
	assert!(cleaned.load(Ordering::SeqCst), "cleanup runs before stop returns");

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(fires.load(Ordering::SeqCst), 1, "repeating phase never starts");
	assert!(!timer.is_active());
}
