use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use sorteio_db::{LotteryError, Result};

pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Relógio parado, para testes.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Validade "suave": um cache vencido dispara uma tentativa de atualização,
/// mas continua utilizável se ela falhar.
#[derive(Clone)]
pub struct FreshnessPolicy {
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl FreshnessPolicy {
    /// Recusa validades menores que um dia ou fora do intervalo representável.
    pub fn new(max_age_days: i64, clock: Arc<dyn Clock>) -> Result<Self> {
        let max_age = Duration::try_days(max_age_days)
            .filter(|_| max_age_days >= 1)
            .ok_or_else(|| {
                LotteryError::InvalidParameter(format!(
                    "validade do cache deve ser um número positivo de dias, recebido: {}",
                    max_age_days
                ))
            })?;
        Ok(Self { max_age, clock })
    }

    pub fn is_stale(&self, last_modified: DateTime<Utc>) -> bool {
        self.clock.now().signed_duration_since(last_modified) > self.max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy_at(now: DateTime<Utc>) -> FreshnessPolicy {
        FreshnessPolicy::new(DEFAULT_MAX_AGE_DAYS, Arc::new(FixedClock(now))).unwrap()
    }

    #[test]
    fn test_recent_file_is_fresh() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let policy = policy_at(now);
        assert!(!policy.is_stale(now - Duration::days(1)));
        assert!(!policy.is_stale(now));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let policy = policy_at(now);
        assert!(!policy.is_stale(now - Duration::days(7)));
        assert!(policy.is_stale(now - Duration::days(7) - Duration::seconds(1)));
        assert!(policy.is_stale(now - Duration::days(30)));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        assert!(!policy_at(now).is_stale(now + Duration::hours(3)));
    }

    #[test]
    fn test_invalid_max_age_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        for days in [0, -3, i64::MAX, i64::MIN] {
            let result = FreshnessPolicy::new(days, Arc::new(FixedClock(now)));
            assert!(matches!(result, Err(LotteryError::InvalidParameter(_))), "{days}");
        }
        assert!(FreshnessPolicy::new(1, Arc::new(FixedClock(now))).is_ok());
    }
}
