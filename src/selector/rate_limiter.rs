//! Rate limiting: at most `max_instances` interventions per user within a
//! rolling window. Counts persisted `intervention_instances` rows rather
//! than keeping in-memory timestamps, so the limit holds across process
//! restarts.

use chrono::{DateTime, Duration, Utc};

use crate::storage::Warehouse;

pub struct RateLimiter {
    window: Duration,
    max_instances: usize,
}

impl RateLimiter {
    pub fn new(window: Duration, max_instances: usize) -> Self {
        Self { window, max_instances }
    }

    /// True if the user has not yet hit `max_instances` interventions
    /// created within the trailing window, as of `now`.
    pub fn can_recommend(&self, warehouse: &Warehouse, user_id: &str, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let since = now - self.window;
        let recent = warehouse.instances.created_since(user_id, since)?;
        Ok(recent.len() < self.max_instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstanceStatus, InterventionInstance};
    use uuid::Uuid;

    fn instance(user_id: &str, created_at: DateTime<Utc>) -> InterventionInstance {
        InterventionInstance {
            instance_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            metric: "stress".into(),
            level: "high".into(),
            surface: "notification".into(),
            intervention_key: "stress_high_notification".into(),
            created_at,
            scheduled_at: created_at,
            sent_at: None,
            status: InstanceStatus::Created,
            trace_id: "t".into(),
        }
    }

    #[test]
    fn allows_first_recommendation() {
        let warehouse = Warehouse::open_temporary();
        let limiter = RateLimiter::new(Duration::minutes(30), 3);
        assert!(limiter.can_recommend(&warehouse, "u1", Utc::now()).unwrap());
    }

    #[test]
    fn blocks_once_the_window_is_full() {
        let warehouse = Warehouse::open_temporary();
        let limiter = RateLimiter::new(Duration::minutes(30), 3);
        let now = Utc::now();
        for _ in 0..3 {
            warehouse.instances.insert(&instance("u1", now)).unwrap();
        }
        assert!(!limiter.can_recommend(&warehouse, "u1", now).unwrap());
    }

    #[test]
    fn allows_a_different_user_independently() {
        let warehouse = Warehouse::open_temporary();
        let limiter = RateLimiter::new(Duration::minutes(30), 3);
        let now = Utc::now();
        for _ in 0..3 {
            warehouse.instances.insert(&instance("u1", now)).unwrap();
        }
        assert!(limiter.can_recommend(&warehouse, "u2", now).unwrap());
    }

    #[test]
    fn allows_again_after_the_window_expires() {
        let warehouse = Warehouse::open_temporary();
        let limiter = RateLimiter::new(Duration::minutes(30), 3);
        let now = Utc::now();
        for _ in 0..3 {
            warehouse
                .instances
                .insert(&instance("u1", now - Duration::minutes(45)))
                .unwrap();
        }
        assert!(limiter.can_recommend(&warehouse, "u1", now).unwrap());
    }
}
