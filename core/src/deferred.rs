//! Single-assignment result cell with continuation chaining.
//!
//! A future is split into two handles over one shared cell:
//!
//! - [`Completer`] is the write side. Exactly one `resolve`/`reject` succeeds;
//!   every later attempt returns [`BridgeError::InvalidState`].
//! - [`Deferred`] is the read side. It can be cloned freely, queried without
//!   blocking, chained with [`Deferred::on_completion`] / [`Deferred::then`],
//!   awaited (`.await`), or waited on from a plain thread.
//!
//! Continuations run synchronously on whichever thread settles the cell, in
//! registration order. A continuation registered after the cell settled runs
//! immediately, before `on_completion` returns. The cell lock is never held
//! while user code runs, so a continuation may freely dispatch more work or
//! register further continuations.

use std::collections::HashMap;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use relay_types::BridgeError;

type Continuation<T> = Box<dyn FnOnce(&Deferred<T>) + Send>;

enum State<T> {
    Pending,
    Completed(T),
    Faulted(BridgeError),
}

struct Inner<T> {
    state: State<T>,
    continuations: Vec<Continuation<T>>,
    /// One slot per live [`Wait`], keyed by the slot id it was handed.
    wakers: HashMap<u64, Waker>,
    next_waiter: u64,
}

impl<T> Inner<T> {
    fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending)
    }
}

impl<T: Clone> Inner<T> {
    /// `None` while pending.
    fn outcome(&self) -> Option<Result<T, BridgeError>> {
        match &self.state {
            State::Pending => None,
            State::Completed(value) => Some(Ok(value.clone())),
            State::Faulted(error) => Some(Err(error.clone())),
        }
    }
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    settled: Condvar,
}

impl<T> Shared<T> {
    fn new(state: State<T>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                state,
                continuations: Vec::new(),
                wakers: HashMap::new(),
                next_waiter: 0,
            }),
            settled: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The one Pending -> terminal transition.
    fn settle(self: &Arc<Self>, state: State<T>) -> Result<(), BridgeError> {
        let (continuations, wakers) = {
            let mut inner = self.lock();
            if !inner.is_pending() {
                return Err(BridgeError::InvalidState {
                    reason: "future is already settled",
                });
            }
            inner.state = state;
            (
                std::mem::take(&mut inner.continuations),
                std::mem::take(&mut inner.wakers),
            )
        };

        self.settled.notify_all();
        for waker in wakers.into_values() {
            waker.wake();
        }

        let view = Deferred {
            shared: Arc::clone(self),
        };
        for continuation in continuations {
            continuation(&view);
        }
        Ok(())
    }
}

/// Write side of a future.
///
/// Not cloneable: whoever holds the `Completer` is the only party allowed to
/// settle the future. Dropping a `Completer` that never settled rejects the
/// future with [`BridgeError::Abandoned`] so readers are not left waiting on
/// a producer that no longer exists.
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completer<T> {
    /// Create a new pending future.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Shared::new(State::Pending),
        }
    }

    /// A read handle onto the same future.
    #[must_use]
    pub fn deferred(&self) -> Deferred<T> {
        Deferred {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn resolve(&self, value: T) -> Result<(), BridgeError> {
        self.shared.settle(State::Completed(value))
    }

    pub fn reject(&self, error: BridgeError) -> Result<(), BridgeError> {
        self.shared.settle(State::Faulted(error))
    }

    /// Resolve or reject depending on `outcome`.
    pub fn settle(&self, outcome: Result<T, BridgeError>) -> Result<(), BridgeError> {
        match outcome {
            Ok(value) => self.resolve(value),
            Err(error) => self.reject(error),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.shared.lock().is_pending()
    }
}

impl<T> Default for Completer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.is_pending() {
            let _ = self.shared.settle(State::Faulted(BridgeError::Abandoned));
        }
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Read side of a future.
pub struct Deferred<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Deferred<T> {
    /// A future that is already completed with `value`.
    #[must_use]
    pub fn completed(value: T) -> Self {
        Self {
            shared: Shared::new(State::Completed(value)),
        }
    }

    /// A future that is already faulted with `error`.
    #[must_use]
    pub fn faulted(error: BridgeError) -> Self {
        Self {
            shared: Shared::new(State::Faulted(error)),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.shared.lock().is_pending()
    }

    /// True once the future reached either terminal state, faulted included.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        !self.is_pending()
    }

    #[must_use]
    pub fn is_faulted(&self) -> bool {
        matches!(self.shared.lock().state, State::Faulted(_))
    }

    /// The stored error, if faulted.
    #[must_use]
    pub fn error(&self) -> Option<BridgeError> {
        match &self.shared.lock().state {
            State::Faulted(error) => Some(error.clone()),
            State::Pending | State::Completed(_) => None,
        }
    }

    fn subscribe(&self, continuation: Continuation<T>) {
        {
            let mut inner = self.shared.lock();
            if inner.is_pending() {
                inner.continuations.push(continuation);
                return;
            }
        }
        continuation(self);
    }
}

impl<T: Clone> Deferred<T> {
    /// Never blocks. Returns `InvalidState` while pending, and the original
    /// error when faulted.
    pub fn result(&self) -> Result<T, BridgeError> {
        self.shared
            .lock()
            .outcome()
            .unwrap_or(Err(BridgeError::InvalidState {
                reason: "result read while the future is pending",
            }))
    }

    /// Block the current thread until the future settles.
    ///
    /// Must not be called on the thread that is expected to deliver the
    /// outcome; use `.await` from async code instead.
    pub fn wait_blocking(&self) -> Result<T, BridgeError> {
        let mut inner = self.shared.lock();
        loop {
            if let Some(outcome) = inner.outcome() {
                return outcome;
            }
            inner = self
                .shared
                .settled
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_blocking`](Self::wait_blocking) but gives up after
    /// `timeout`, returning `None`. The future itself stays pending.
    pub fn wait_blocking_timeout(&self, timeout: Duration) -> Option<Result<T, BridgeError>> {
        let inner = self.shared.lock();
        let (inner, _) = self
            .shared
            .settled
            .wait_timeout_while(inner, timeout, |inner| inner.is_pending())
            .unwrap_or_else(PoisonError::into_inner);
        inner.outcome()
    }
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// Register `continuation` to run once this future settles.
    ///
    /// Runs immediately if the future is already terminal. The returned
    /// future settles with this future's outcome after the continuation has
    /// run, or with [`BridgeError::ContinuationPanicked`] if it panicked.
    pub fn on_completion<F>(&self, continuation: F) -> Deferred<T>
    where
        F: FnOnce(&Deferred<T>) + Send + 'static,
    {
        let chained = Completer::new();
        let next = chained.deferred();
        self.subscribe(Box::new(move |antecedent: &Deferred<T>| {
            let ran = panic::catch_unwind(AssertUnwindSafe(|| continuation(antecedent)));
            let outcome = match ran {
                Ok(()) => antecedent.result(),
                Err(_) => {
                    tracing::error!("future continuation panicked");
                    Err(BridgeError::ContinuationPanicked)
                }
            };
            let _ = chained.settle(outcome);
        }));
        next
    }

    /// Map this future's outcome into a new future.
    pub fn then<U, F>(&self, map: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(Result<T, BridgeError>) -> Result<U, BridgeError> + Send + 'static,
    {
        let chained = Completer::new();
        let next = chained.deferred();
        self.subscribe(Box::new(move |antecedent: &Deferred<T>| {
            let input = antecedent.result();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| map(input))).unwrap_or_else(|_| {
                tracing::error!("future mapping panicked");
                Err(BridgeError::ContinuationPanicked)
            });
            let _ = chained.settle(outcome);
        }));
        next
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.shared.lock().state {
            State::Pending => "pending",
            State::Completed(_) => "completed",
            State::Faulted(_) => "faulted",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

/// Suspends an async task until the future settles.
///
/// Holds at most one waker slot in the cell. The slot is refreshed on every
/// poll and released when the `Wait` is dropped.
pub struct Wait<T> {
    shared: Arc<Shared<T>>,
    slot: Option<u64>,
}

impl<T> Wait<T> {
    fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared, slot: None }
    }
}

impl<T: Clone> Future for Wait<T> {
    type Output = Result<T, BridgeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut inner = this.shared.lock();
        if let Some(outcome) = inner.outcome() {
            this.slot = None;
            return Poll::Ready(outcome);
        }
        let slot = *this.slot.get_or_insert_with(|| {
            let id = inner.next_waiter;
            inner.next_waiter += 1;
            id
        });
        match inner.wakers.get_mut(&slot) {
            Some(waker) if waker.will_wake(cx.waker()) => {}
            Some(waker) => waker.clone_from(cx.waker()),
            None => {
                inner.wakers.insert(slot, cx.waker().clone());
            }
        }
        Poll::Pending
    }
}

impl<T> Drop for Wait<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.shared.lock().wakers.remove(&slot);
        }
    }
}

impl<T: Clone> IntoFuture for Deferred<T> {
    type Output = Result<T, BridgeError>;
    type IntoFuture = Wait<T>;

    fn into_future(self) -> Self::IntoFuture {
        Wait::new(self.shared)
    }
}

impl<T: Clone> IntoFuture for &Deferred<T> {
    type Output = Result<T, BridgeError>;
    type IntoFuture = Wait<T>;

    fn into_future(self) -> Self::IntoFuture {
        Wait::new(Arc::clone(&self.shared))
    }
}
