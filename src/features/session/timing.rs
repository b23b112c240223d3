use chrono::{DateTime, Utc};

use crate::{config::app_config::QuizConfig, features::session::models::TimingVerdict};

/// Binds acceptance of an answer to a plausible human response latency,
/// measured from the moment the question became current.
pub fn validate_timing(
    viewed_at: DateTime<Utc>,
    now: DateTime<Utc>,
    rules: &QuizConfig,
) -> TimingVerdict {
    let elapsed = now - viewed_at;

    if elapsed < rules.min_question_time() {
        TimingVerdict::TooQuick
    } else if elapsed > rules.max_question_time() {
        TimingVerdict::TooSlow
    } else {
        TimingVerdict::Valid
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn viewed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn bounds_are_inclusive() {
        let rules = QuizConfig::default();
        let t0 = viewed_at();

        assert_eq!(
            validate_timing(t0, t0 + Duration::milliseconds(999), &rules),
            TimingVerdict::TooQuick
        );
        assert_eq!(
            validate_timing(t0, t0 + Duration::seconds(1), &rules),
            TimingVerdict::Valid
        );
        assert_eq!(
            validate_timing(t0, t0 + Duration::minutes(10), &rules),
            TimingVerdict::Valid
        );
        assert_eq!(
            validate_timing(t0, t0 + Duration::minutes(10) + Duration::milliseconds(1), &rules),
            TimingVerdict::TooSlow
        );
    }

    #[test]
    fn clock_skew_counts_as_too_quick() {
        let rules = QuizConfig::default();
        let t0 = viewed_at();
        assert_eq!(
            validate_timing(t0, t0 - Duration::seconds(5), &rules),
            TimingVerdict::TooQuick
        );
    }
}
