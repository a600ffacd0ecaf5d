use crate::config::GuardConfig;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// Remembers which user actions have already been handled.
///
/// An action id can be claimed once. Claims expire after `ttl`, and once more
/// than `capacity` ids are held the oldest claims are dropped first.
#[derive(Debug)]
pub struct ActionGuard {
    ttl: Duration,
    capacity: usize,
    claimed: HashMap<String, Instant>,
    /// Claim order, oldest first. May hold ids already released.
    order: VecDeque<String>,
}

impl ActionGuard {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            claimed: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.capacity)
    }

    /// Claims `action_id`. Returns false if it is already claimed.
    pub fn try_claim(&mut self, action_id: &str) -> bool {
        let now = Instant::now();
        self.expire(now);

        if self.claimed.contains_key(action_id) {
            return false;
        }
        self.claimed.insert(action_id.to_string(), now);
        self.order.push_back(action_id.to_string());

        while self.claimed.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.claimed.remove(&oldest);
        }
        true
    }

    /// Releases a claim so the action can be retried.
    pub fn release(&mut self, action_id: &str) -> bool {
        let released = self.claimed.remove(action_id).is_some();
        if released {
            self.order.retain(|id| id != action_id);
        }
        released
    }

    pub fn is_claimed(&self, action_id: &str) -> bool {
        self.claimed
            .get(action_id)
            .is_some_and(|at| at.elapsed() < self.ttl)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    fn expire(&mut self, now: Instant) {
        while let Some(oldest) = self.order.front() {
            let expired = self
                .claimed
                .get(oldest)
                .is_none_or(|at| now.duration_since(*at) >= self.ttl);
            if !expired {
                break;
            }
            if let Some(id) = self.order.pop_front() {
                self.claimed.remove(&id);
            }
        }
    }
}

impl Default for ActionGuard {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default())
    }
}
