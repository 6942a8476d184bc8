// src/crawl/admission.rs
// =============================================================================
// This module decides whether a URL may be visited.
//
// Every candidate URL goes through admit(), which runs these checks in order:
// 1. Crawl stopped?                  -> refuse
// 2. Different hostname from seed?   -> refuse
// 3. Normalized key already claimed? -> refuse
// 4. Budget already used up?         -> refuse (and make sure we're stopped)
// 5. Otherwise claim the key. If that claim used the last slot of the
//    budget, raise the stop signal so nothing else gets in.
//
// Steps 3-5 run under a single Mutex, so "check if visited" and "mark as
// visited" are one atomic step. Two tasks racing for the same page can't
// both win, and no more than max_pages keys can ever be claimed.
//
// The stop signal is sticky: once raised it stays raised, and every later
// admit() call sees it at step 1.
// =============================================================================

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::normalize::{normalize_url, NormalizedKey};

/// Result of offering a URL to admit()
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The caller owns this key and must fetch it.
    /// `last` is true for the claim that used up the budget.
    Claimed { key: NormalizedKey, last: bool },
    /// Not allowed to visit
    Refused(Refusal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    Stopped,
    OutOfDomain,
    Duplicate,
    BudgetExhausted,
}

/// Visited set + page budget + stop signal
pub struct AdmissionControl {
    seed_host: Option<String>,
    max_pages: usize,
    visited: Mutex<HashSet<NormalizedKey>>,
    stop: CancellationToken,
}

impl AdmissionControl {
    // Parameters:
    //   seed: the crawl's starting URL; its hostname is the crawl boundary
    //   max_pages: budget (values below 1 are treated as 1)
    //   stop: the sticky stop signal, shared with the engine
    pub fn new(seed: &Url, max_pages: usize, stop: CancellationToken) -> Self {
        Self {
            seed_host: seed.host_str().map(str::to_string),
            max_pages: max_pages.max(1),
            visited: Mutex::new(HashSet::new()),
            stop,
        }
    }

    pub fn admit(&self, candidate: &Url) -> Admission {
        if self.stop.is_cancelled() {
            return Admission::Refused(Refusal::Stopped);
        }

        if self.seed_host.is_none() || candidate.host_str() != self.seed_host.as_deref() {
            return Admission::Refused(Refusal::OutOfDomain);
        }

        let key = normalize_url(candidate);

        // A panic elsewhere can't leave the set half-updated (insert is the
        // only mutation), so a poisoned lock is still safe to use
        let mut visited = self.visited.lock().unwrap_or_else(PoisonError::into_inner);

        if visited.contains(&key) {
            return Admission::Refused(Refusal::Duplicate);
        }

        // A sibling may have used the last slot after our step 1 check
        if visited.len() >= self.max_pages {
            self.stop.cancel();
            return Admission::Refused(Refusal::BudgetExhausted);
        }

        visited.insert(key.clone());
        let last = visited.len() == self.max_pages;
        if last {
            self.stop.cancel();
        }

        Admission::Claimed { key, last }
    }

    /// Number of keys claimed so far
    pub fn claimed(&self) -> usize {
        self.visited.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn stop_signal(&self) -> &CancellationToken {
        &self.stop
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a std Mutex and not tokio::sync::Mutex?
//    - We never .await while holding the lock
//    - The std Mutex is faster for short, synchronous critical sections
//    - tokio's Mutex is only needed when a guard lives across an .await
//
// 2. What is lock poisoning?
//    - If a thread panics while holding a std Mutex, the Mutex is "poisoned"
//    - lock() then returns Err, carrying the guard anyway
//    - PoisonError::into_inner hands us that guard so we can keep going
//
// 3. What is CancellationToken?
//    - A cloneable flag from tokio-util
//    - cancel() raises it, is_cancelled() reads it, cancelled().await waits
//    - Once raised it can never be lowered again (exactly what we want)
// -----------------------------------------------------------------------------
