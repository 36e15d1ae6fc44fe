//! In-process foreign surfaces for tests and local runs.
//!
//! [`SyncSurface`] answers on the dispatching stack, before `invoke` returns.
//! [`ManualSurface`] parks every call so a test can answer it later, from
//! any thread, in any order.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use relay_types::Token;

use crate::surface::{ForeignCall, ForeignSurface, SurfaceError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted answer for one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Number(f64),
    Void,
    Error(String),
    /// Never call back.
    Silent,
    /// Deliver the same success payload twice.
    Twice(String),
    /// Refuse the call from `invoke`.
    Refuse(String),
}

impl Reply {
    pub fn text(payload: impl Into<String>) -> Self {
        Self::Text(payload.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Answer `call` through its sink, on the current stack.
    pub fn deliver(self, call: ForeignCall) -> Result<(), SurfaceError> {
        match self {
            Reply::Text(payload) => {
                call.succeed(&payload);
            }
            Reply::Number(value) => {
                call.succeed_number(value);
            }
            Reply::Void => {
                call.succeed_void();
            }
            Reply::Error(message) => {
                call.fail(&message);
            }
            Reply::Silent => {}
            Reply::Twice(payload) => {
                let token = call.token().value();
                call.sink().on_success(token, &payload);
                call.sink().on_success(token, &payload);
            }
            Reply::Refuse(reason) => return Err(SurfaceError::Unavailable(reason)),
        }
        Ok(())
    }
}

/// A call as [`SyncSurface`] saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub token: Token,
    pub operation: String,
    pub args: String,
}

/// Foreign surface that answers synchronously from a script.
///
/// Operations with no scripted reply and no fallback are refused with
/// [`SurfaceError::UnknownOperation`].
#[derive(Debug, Default)]
pub struct SyncSurface {
    name: Option<String>,
    replies: Mutex<HashMap<String, Reply>>,
    fallback: Option<Reply>,
    values: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<RecordedCall>>,
    sync_calls: Mutex<Vec<(String, String)>>,
}

impl SyncSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn reply(self, operation: &str, reply: Reply) -> Self {
        self.set_reply(operation, reply);
        self
    }

    /// Reply used for operations without a scripted one.
    #[must_use]
    pub fn fallback(mut self, reply: Reply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Value returned by `invoke_sync(operation, ..)`.
    #[must_use]
    pub fn value(self, operation: &str, value: impl Into<String>) -> Self {
        lock(&self.values).insert(operation.to_string(), value.into());
        self
    }

    pub fn set_reply(&self, operation: &str, reply: Reply) {
        lock(&self.replies).insert(operation.to_string(), reply);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .map(|call| call.operation.clone())
            .collect()
    }

    /// `(operation, args)` of every `invoke_sync`, in order.
    #[must_use]
    pub fn sync_calls(&self) -> Vec<(String, String)> {
        lock(&self.sync_calls).clone()
    }

    fn reply_for(&self, operation: &str) -> Option<Reply> {
        lock(&self.replies)
            .get(operation)
            .cloned()
            .or_else(|| self.fallback.clone())
    }
}

impl ForeignSurface for SyncSurface {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("sync")
    }

    fn invoke(&self, call: ForeignCall) -> Result<(), SurfaceError> {
        lock(&self.calls).push(RecordedCall {
            token: call.token(),
            operation: call.operation().to_string(),
            args: call.args().to_string(),
        });

        let reply = self
            .reply_for(call.operation())
            .ok_or_else(|| SurfaceError::UnknownOperation(call.operation().to_string()))?;

        reply.deliver(call)
    }

    fn invoke_sync(&self, operation: &str, args: &str) -> Result<String, SurfaceError> {
        lock(&self.sync_calls).push((operation.to_string(), args.to_string()));
        lock(&self.values)
            .get(operation)
            .cloned()
            .ok_or_else(|| SurfaceError::UnknownOperation(operation.to_string()))
    }
}

/// Foreign surface that holds calls until the test answers them.
#[derive(Debug, Default)]
pub struct ManualSurface {
    calls: Mutex<VecDeque<ForeignCall>>,
}

impl ManualSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest unanswered call.
    #[must_use]
    pub fn next_call(&self) -> Option<ForeignCall> {
        lock(&self.calls).pop_front()
    }

    #[must_use]
    pub fn take_calls(&self) -> Vec<ForeignCall> {
        lock(&self.calls).drain(..).collect()
    }

    #[must_use]
    pub fn pending_calls(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl ForeignSurface for ManualSurface {
    fn name(&self) -> &str {
        "manual"
    }

    fn invoke(&self, call: ForeignCall) -> Result<(), SurfaceError> {
        lock(&self.calls).push_back(call);
        Ok(())
    }
}
