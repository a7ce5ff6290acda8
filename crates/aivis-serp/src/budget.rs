//! Per-provider spend tracking with rolling-window quotas.
//!
//! Reservations happen *before* any network call and commits *after* every
//! attempt, so a failed call still consumes its attempt cost. The ledger is
//! a single mutex-guarded map; no interleaving of concurrent reservations
//! can overspend a quota.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::provider::ProviderId;

/// Outcome of a reservation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetDecision {
    Allow,
    Deny(String),
}

#[derive(Debug)]
struct Ledger {
    window_start: Instant,
    spent: u64,
    reserved: u64,
    quota: u64,
}

impl Ledger {
    /// Reset spend when the current time has crossed the window boundary.
    /// In-flight reservations carry over; they belong to calls already made.
    fn roll(&mut self, window: Duration, now: Instant) {
        if now.duration_since(self.window_start) >= window {
            self.window_start = now;
            self.spent = 0;
        }
    }

    fn committed(&self) -> u64 {
        self.spent.saturating_add(self.reserved)
    }

    fn remaining_fraction(&self) -> f64 {
        if self.quota == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.quota.saturating_sub(self.committed()) as f64 / self.quota as f64;
        fraction
    }
}

/// Tracks spend and quota per provider over a rolling window.
pub struct BudgetManager {
    window: Duration,
    ledgers: Mutex<HashMap<ProviderId, Ledger>>,
}

impl BudgetManager {
    #[must_use]
    pub fn new(window: Duration, quotas: impl IntoIterator<Item = (ProviderId, u64)>) -> Self {
        let now = Instant::now();
        let ledgers = quotas
            .into_iter()
            .map(|(id, quota)| {
                (
                    id,
                    Ledger {
                        window_start: now,
                        spent: 0,
                        reserved: 0,
                        quota,
                    },
                )
            })
            .collect();
        Self {
            window,
            ledgers: Mutex::new(ledgers),
        }
    }

    /// Reserve `estimated` credits against a provider's quota.
    ///
    /// Must be called before the network call; pair every `Allow` with a
    /// later [`commit`](Self::commit) regardless of the call's outcome.
    pub fn reserve(&self, provider: ProviderId, estimated: u64) -> BudgetDecision {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(ledger) = ledgers.get_mut(&provider) else {
            return BudgetDecision::Deny(format!("provider {provider} has no budget ledger"));
        };
        ledger.roll(self.window, Instant::now());

        if ledger.committed().saturating_add(estimated) > ledger.quota {
            return BudgetDecision::Deny(format!(
                "{} of {} credits committed, {estimated} requested",
                ledger.committed(),
                ledger.quota
            ));
        }
        ledger.reserved += estimated;
        BudgetDecision::Allow
    }

    /// Release a reservation and record the actual cost of the attempt.
    ///
    /// `reserved` must match the estimate passed to `reserve`; `actual` is
    /// the success cost for completed calls or the attempt cost for failed
    /// ones.
    pub fn commit(&self, provider: ProviderId, reserved: u64, actual: u64) {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ledger) = ledgers.get_mut(&provider) {
            ledger.reserved = ledger.reserved.saturating_sub(reserved);
            ledger.spent = ledger.spent.saturating_add(actual);
        }
    }

    /// Providers ranked most-headroom-first: remaining-quota fraction
    /// descending, ties broken by the static cheapest-first priority.
    #[must_use]
    pub fn provider_order(&self) -> Vec<ProviderId> {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let mut ranked: Vec<(ProviderId, f64)> = ledgers
            .iter_mut()
            .map(|(id, ledger)| {
                ledger.roll(self.window, now);
                (*id, ledger.remaining_fraction())
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.static_priority().cmp(&b.0.static_priority()))
        });
        ranked.into_iter().map(|(id, _)| id).collect()
    }

    /// Credits spent (committed, not reserved) in the current window.
    #[must_use]
    pub fn spent(&self, provider: ProviderId) -> u64 {
        let ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        ledgers.get(&provider).map_or(0, |l| l.spent)
    }
}
