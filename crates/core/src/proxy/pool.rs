//! Round-robin proxy pool with health tracking.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    ProxyEndpoint, ProxyError, ProxyHealth, ProxyLease, ProxyOutcome, ProxyPoolConfig, ProxyStatus,
};
use crate::metrics;

struct ProxySlot {
    endpoint: ProxyEndpoint,
    health: ProxyHealth,
    consecutive_failures: u32,
    /// Number of cooldowns served since the last success.
    cooldown_level: u32,
    cooldown_until: Option<Instant>,
}

impl ProxySlot {
    fn new(endpoint: ProxyEndpoint) -> Self {
        Self {
            endpoint,
            health: ProxyHealth::Healthy,
            consecutive_failures: 0,
            cooldown_level: 0,
            cooldown_until: None,
        }
    }
}

struct PoolState {
    slots: Vec<ProxySlot>,
    cursor: usize,
}

impl PoolState {
    fn revive_expired(&mut self, now: Instant) {
        for slot in &mut self.slots {
            if slot.health == ProxyHealth::CoolingDown
                && slot.cooldown_until.is_some_and(|until| until <= now)
            {
                slot.health = ProxyHealth::Healthy;
                slot.consecutive_failures = 0;
                slot.cooldown_until = None;
                metrics::PROXY_TRANSITIONS
                    .with_label_values(&[ProxyHealth::Healthy.as_str()])
                    .inc();
                info!(proxy = %slot.endpoint, "Proxy cooldown expired");
            }
        }
    }
}

/// Pool of outbound proxies shared by every fetch of every run.
///
/// `acquire` hands out healthy proxies round-robin; `report` feeds each
/// request's outcome back so failing proxies cool down (soft failures) or
/// get banned (hard failures). Health survives across runs and is only
/// reset by [`ProxyPool::reload`].
///
/// A pool with no entries is a direct pool: every lease connects without a
/// proxy and reports are ignored.
pub struct ProxyPool {
    failure_threshold: u32,
    base_cooldown: Duration,
    max_cooldown: Duration,
    state: Mutex<PoolState>,
}

impl ProxyPool {
    pub fn new(config: &ProxyPoolConfig, endpoints: Vec<ProxyEndpoint>) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            base_cooldown: config.base_cooldown(),
            max_cooldown: config.max_cooldown(),
            state: Mutex::new(PoolState {
                slots: endpoints.into_iter().map(ProxySlot::new).collect(),
                cursor: 0,
            }),
        }
    }

    /// Build a pool from configuration, parsing every entry.
    pub fn from_config(config: &ProxyPoolConfig) -> Result<Self, ProxyError> {
        Ok(Self::new(config, config.endpoints()?))
    }

    /// A pool without proxies.
    pub fn direct() -> Self {
        Self::new(&ProxyPoolConfig::default(), Vec::new())
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_direct(&self) -> bool {
        self.lock().slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lease the next healthy proxy.
    pub fn acquire(&self) -> Result<ProxyLease, ProxyError> {
        let mut state = self.lock();
        if state.slots.is_empty() {
            return Ok(ProxyLease::direct());
        }

        let now = Instant::now();
        state.revive_expired(now);

        let count = state.slots.len();
        for offset in 0..count {
            let index = (state.cursor + offset) % count;
            if state.slots[index].health == ProxyHealth::Healthy {
                state.cursor = (index + 1) % count;
                return Ok(ProxyLease {
                    slot: Some(index),
                    endpoint: Some(state.slots[index].endpoint.clone()),
                });
            }
        }

        let retry_after = state
            .slots
            .iter()
            .filter_map(|slot| slot.cooldown_until)
            .min()
            .map(|until| until.saturating_duration_since(now));

        Err(ProxyError::NoProxyAvailable { retry_after })
    }

    /// Record the outcome of a request made with `lease`.
    pub fn report(&self, lease: &ProxyLease, outcome: ProxyOutcome) {
        let Some(index) = lease.slot else {
            return;
        };

        let mut state = self.lock();
        let Some(slot) = state.slots.get_mut(index) else {
            debug!("Ignoring report for lease from a previous pool generation");
            return;
        };
        if Some(&slot.endpoint) != lease.endpoint.as_ref() || slot.health == ProxyHealth::Banned {
            return;
        }

        match outcome {
            ProxyOutcome::Success => {
                slot.consecutive_failures = 0;
                slot.cooldown_level = 0;
            }
            ProxyOutcome::SoftFailure => {
                slot.consecutive_failures += 1;
                if slot.health == ProxyHealth::Healthy
                    && slot.consecutive_failures >= self.failure_threshold
                {
                    let cooldown = self.cooldown_for(slot.cooldown_level);
                    slot.health = ProxyHealth::CoolingDown;
                    slot.cooldown_until = Some(Instant::now() + cooldown);
                    slot.cooldown_level += 1;
                    slot.consecutive_failures = 0;
                    metrics::PROXY_TRANSITIONS
                        .with_label_values(&[ProxyHealth::CoolingDown.as_str()])
                        .inc();
                    warn!(
                        proxy = %slot.endpoint,
                        cooldown_secs = cooldown.as_secs(),
                        "Proxy cooling down after repeated failures"
                    );
                }
            }
            ProxyOutcome::HardFailure => {
                slot.health = ProxyHealth::Banned;
                slot.cooldown_until = None;
                metrics::PROXY_TRANSITIONS
                    .with_label_values(&[ProxyHealth::Banned.as_str()])
                    .inc();
                warn!(proxy = %slot.endpoint, "Proxy banned");
            }
        }
    }

    fn cooldown_for(&self, level: u32) -> Duration {
        let factor = 2u32.saturating_pow(level.min(16));
        self.base_cooldown.saturating_mul(factor).min(self.max_cooldown)
    }

    /// Number of proxies that can be leased right now.
    pub fn healthy_count(&self) -> usize {
        let mut state = self.lock();
        state.revive_expired(Instant::now());
        state
            .slots
            .iter()
            .filter(|slot| slot.health == ProxyHealth::Healthy)
            .count()
    }

    pub fn snapshot(&self) -> Vec<ProxyStatus> {
        let state = self.lock();
        let now = Instant::now();
        state
            .slots
            .iter()
            .map(|slot| ProxyStatus {
                address: slot.endpoint.address.clone(),
                health: slot.health,
                consecutive_failures: slot.consecutive_failures,
                cooldown_level: slot.cooldown_level,
                cooldown_remaining_ms: slot
                    .cooldown_until
                    .map(|until| until.saturating_duration_since(now).as_millis() as u64),
            })
            .collect()
    }

    /// Replace the pool contents, resetting all health state.
    pub fn reload(&self, endpoints: Vec<ProxyEndpoint>) {
        let mut state = self.lock();
        state.slots = endpoints.into_iter().map(ProxySlot::new).collect();
        state.cursor = 0;
        info!("Proxy pool reloaded with {} entries", state.slots.len());
    }
}
