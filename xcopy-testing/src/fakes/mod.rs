// SPDX-License-Identifier: GPL-3.0-only

//! In-memory arrays implementing the vendor API seams
//!
//! Every fake keeps its objects behind a `Mutex`, counts calls by API method
//! name and can be told to throttle or fail a method. Duplicate mapping
//! requests are rejected the way the real arrays reject them, so a second
//! `map` that reaches the array shows up as an error.

mod infinibox;
mod par3;
mod powerflex;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use xcopy_adapters::ApiError;
use xcopy_adapters::error::ApiResult;

pub use infinibox::FakeInfinibox;
pub use par3::FakePar3;
pub use powerflex::FakePowerFlex;

/// Call accounting and injected faults, keyed by API method name.
#[derive(Debug, Default)]
pub struct FaultPlan {
    calls: BTreeMap<String, usize>,
    throttled: BTreeMap<String, u32>,
    failures: BTreeMap<String, ApiError>,
}

impl FaultPlan {
    /// Records a call and returns the fault injected for it, if any.
    pub fn enter(&mut self, method: &str) -> ApiResult<()> {
        *self.calls.entry(method.to_string()).or_default() += 1;

        if let Some(remaining) = self.throttled.get_mut(method)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(ApiError::RateLimited(format!("{method}: too many requests")));
        }

        match self.failures.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Answers the next `times` calls of `method` with a throttling error.
    pub fn throttle(&mut self, method: &str, times: u32) {
        self.throttled.insert(method.to_string(), times);
    }

    /// Fails every call of `method` until cleared.
    pub fn fail(&mut self, method: &str, error: ApiError) {
        self.failures.insert(method.to_string(), error);
    }

    pub fn clear(&mut self, method: &str) {
        self.failures.remove(method);
        self.throttled.remove(method);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.get(method).copied().unwrap_or(0)
    }
}

pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fault controls shared by every fake array.
pub trait FaultInjection {
    fn with_faults<R>(&self, f: impl FnOnce(&mut FaultPlan) -> R) -> R;

    fn throttle(&self, method: &str, times: u32) {
        self.with_faults(|faults| faults.throttle(method, times));
    }

    fn fail(&self, method: &str, error: ApiError) {
        self.with_faults(|faults| faults.fail(method, error));
    }

    fn clear(&self, method: &str) {
        self.with_faults(|faults| faults.clear(method));
    }

    fn calls(&self, method: &str) -> usize {
        self.with_faults(|faults| faults.calls(method))
    }
}
