//! Cancellable delays.
//!
//! A [`Generation`] hands out [`Ticket`]s; issuing a new ticket invalidates
//! every older one. The [`Debouncer`] pairs this with a [`Delay`] so only the
//! last trigger inside a window survives, and the same tickets let async
//! callers drop host results that arrive after the configuration moved on.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

/// Window that coalesces bursts of edits into one projection run.
pub const DEBOUNCE_MS: u32 = 300;

/// Source of sleeps, so tests can control time.
pub trait Delay {
	fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()>;
}

/// Browser timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimerDelay;

impl Delay for TimerDelay {
	fn sleep(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
		Box::pin(gloo_timers::future::TimeoutFuture::new(ms))
	}
}

/// Monotonic counter shared by all tickets it issued.
#[derive(Clone, Debug, Default)]
pub struct Generation(Rc<Cell<u64>>);

impl Generation {
	/// Issues a ticket and invalidates all earlier ones.
	pub fn advance(&self) -> Ticket {
		let issued = self.0.get() + 1;
		self.0.set(issued);
		Ticket {
			issued,
			source: self.clone(),
		}
	}
}

/// Proof that no newer request has been made since this one.
#[derive(Clone, Debug)]
pub struct Ticket {
	issued: u64,
	source: Generation,
}

impl Ticket {
	pub fn is_current(&self) -> bool {
		self.source.0.get() == self.issued
	}
}

/// Coalesces triggers that arrive within `window_ms` of each other.
pub struct Debouncer {
	delay: Box<dyn Delay>,
	window_ms: u32,
	generation: Generation,
}

impl Debouncer {
	pub fn new(delay: impl Delay + 'static, window_ms: u32) -> Self {
		Self {
			delay: Box::new(delay),
			window_ms,
			generation: Generation::default(),
		}
	}

	/// Supersedes any pending trigger and resolves after the window with a
	/// ticket, or `None` if a newer trigger arrived meanwhile.
	///
	/// The ticket is taken when this is called, not when the future is polled.
	pub fn trigger(&self) -> impl Future<Output = Option<Ticket>> + 'static {
		let ticket = self.generation.advance();
		let sleep = self.delay.sleep(self.window_ms);
		async move {
			sleep.await;
			ticket.is_current().then_some(ticket)
		}
	}

	/// A ticket that skips the window but still supersedes pending triggers.
	pub fn immediate(&self) -> Ticket {
		self.generation.advance()
	}
}

#[cfg(test)]
pub(crate) mod testing {
	use std::cell::RefCell;
	use std::rc::Rc;

	use futures::channel::oneshot;
	use futures::future::LocalBoxFuture;
	use futures::FutureExt;

	use super::Delay;

	/// Sleeps that only finish when the test says so.
	#[derive(Clone, Default)]
	pub struct ManualDelay {
		pending: Rc<RefCell<Vec<oneshot::Sender<()>>>>,
	}

	impl ManualDelay {
		pub fn elapse(&self) {
			for tx in self.pending.borrow_mut().drain(..) {
				let _ = tx.send(());
			}
		}

		pub fn waiting(&self) -> usize {
			self.pending.borrow().len()
		}
	}

	impl Delay for ManualDelay {
		fn sleep(&self, _ms: u32) -> LocalBoxFuture<'static, ()> {
			let (tx, rx) = oneshot::channel();
			self.pending.borrow_mut().push(tx);
			rx.map(|_| ()).boxed_local()
		}
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::LocalPool;
	use futures::task::LocalSpawnExt;

	use super::testing::ManualDelay;
	use super::*;

	#[test]
	fn newer_ticket_invalidates_older() {
		let generation = Generation::default();
		let first = generation.advance();
		assert!(first.is_current());
		let second = generation.advance();
		assert!(!first.is_current());
		assert!(second.is_current());
	}

	#[test]
	fn only_last_trigger_in_window_fires() {
		let delay = ManualDelay::default();
		let debouncer = Debouncer::new(delay.clone(), DEBOUNCE_MS);
		let fired = Rc::new(Cell::new(0));
		let mut pool = LocalPool::new();

		for _ in 0..5 {
			let pending = debouncer.trigger();
			let fired = fired.clone();
			pool.spawner()
				.spawn_local(async move {
					if pending.await.is_some() {
						fired.set(fired.get() + 1);
					}
				})
				.unwrap();
		}
		pool.run_until_stalled();
		assert_eq!(delay.waiting(), 5);

		delay.elapse();
		pool.run_until_stalled();
		assert_eq!(fired.get(), 1);
	}

	#[test]
	fn immediate_ticket_drops_pending_trigger() {
		let delay = ManualDelay::default();
		let debouncer = Debouncer::new(delay.clone(), DEBOUNCE_MS);
		let pending = debouncer.trigger();
		let ticket = debouncer.immediate();
		delay.elapse();
		assert!(futures::executor::block_on(pending).is_none());
		assert!(ticket.is_current());
	}
}
