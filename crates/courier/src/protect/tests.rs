use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

#[test]
fn extracts_static_str_payload() {
	let err = CatchUnwind.run("test", &mut || panic!("boom-str")).unwrap_err();
	assert_eq!(err.label(), "test");
	assert!(err.message().contains("boom-str"), "expected 'boom-str', got: {}", err.message());
}

#[test]
fn extracts_string_payload() {
	let err = CatchUnwind.run("test", &mut || panic!("{}", String::from("boom-string"))).unwrap_err();
	assert!(err.message().contains("boom-string"), "expected 'boom-string', got: {}", err.message());
}

#[test]
fn reports_non_string_payload() {
	let payload: Box<dyn Any + Send> = Box::new(17u32);
	assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
}

#[test]
fn protect_returns_output_of_clean_work() {
	assert_eq!(protect(&CatchUnwind, "test", || 40 + 2), Some(42));
}

#[test]
fn protect_swallows_fault() {
	let out: Option<u32> = protect(&CatchUnwind, "test", || panic!("nope"));
	assert_eq!(out, None);
}

struct CountingGuard {
	faults: Arc<AtomicUsize>,
}

impl ProtectedCall for CountingGuard {
	fn run(&self, label: &'static str, work: &mut dyn FnMut()) -> Result<(), DispatchFault> {
		CatchUnwind.run(label, work).inspect_err(|_| {
			self.faults.fetch_add(1, Ordering::SeqCst);
		})
	}
}

#[test]
fn custom_strategy_observes_faults() {
	let faults = Arc::new(AtomicUsize::new(0));
	let guard = CountingGuard { faults: Arc::clone(&faults) };

	let _ = protect(&guard, "test", || ());
	let _: Option<()> = protect(&guard, "test", || panic!("first"));
	let _: Option<()> = protect(&guard, "test", || panic!("second"));

	assert_eq!(faults.load(Ordering::SeqCst), 2);
}
