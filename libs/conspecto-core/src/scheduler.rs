//! SM-2 spaced repetition scheduler.
//!
//! Pure: given the same state, quality, and clock, the output is
//! always the same. Persistence belongs to the caller.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Quality, ReviewHistoryItem, ReviewState};

/// Scheduling constants, passed explicitly to ease tuning in tests.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Floor for the ease factor.
    pub minimum_ease: f64,
    /// Interval after the first successful review.
    pub first_interval_days: u32,
    /// Interval after the second successful review.
    pub second_interval_days: u32,
    /// Qualities below this reset the repetition count.
    pub passing_quality: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            minimum_ease: 1.3,
            first_interval_days: 1,
            second_interval_days: 6,
            passing_quality: 3,
        }
    }
}

/// SM-2 scheduler over a [`ReviewState`].
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Compute the state after one review at `now`.
    ///
    /// Failing recall resets repetition and interval; passing recall
    /// grows the interval (1 day, 6 days, then previous * ease). The
    /// ease factor is adjusted on every review and floored at
    /// `minimum_ease`. The history entry is appended last, so the
    /// returned history is chronological.
    pub fn schedule(&self, state: &ReviewState, quality: Quality, now: DateTime<Utc>) -> ReviewState {
        let q = quality.value();

        let (repetition, interval_days) = if q < self.config.passing_quality {
            (0, 1)
        } else {
            let repetition = state.repetition + 1;
            let interval = match repetition {
                1 => self.config.first_interval_days,
                2 => self.config.second_interval_days,
                // Interval grows with the ease factor as it was before
                // this review.
                _ => (state.interval_days as f64 * state.ease_factor).round() as u32,
            };
            (repetition, interval)
        };

        // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
        let spread = (Quality::MAX - q) as f64;
        let ease_factor = (state.ease_factor + (0.1 - spread * (0.08 + spread * 0.02)))
            .max(self.config.minimum_ease);

        let mut history = state.history.clone();
        history.push(ReviewHistoryItem { date: now, quality });

        ReviewState {
            repetition,
            interval_days,
            ease_factor,
            last_review: Some(now),
            next_review: Some(now + Duration::days(interval_days as i64)),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn first_perfect_review() {
        let scheduler = Scheduler::default();
        let t = now();
        let next = scheduler.schedule(&ReviewState::default(), q(5), t);

        assert_eq!(next.repetition, 1);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.last_review, Some(t));
        assert_eq!(next.next_review, Some(t + Duration::days(1)));
        // 2.5 + (0.1 - 0 * (0.08 + 0 * 0.02)) = 2.6
        assert!((next.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn second_passing_review_gets_six_days() {
        let scheduler = Scheduler::default();
        let t = now();
        let first = scheduler.schedule(&ReviewState::default(), q(5), t);
        let second = scheduler.schedule(&first, q(5), t + Duration::days(1));

        assert_eq!(second.repetition, 2);
        assert_eq!(second.interval_days, 6);
    }

    #[test]
    fn third_review_multiplies_by_ease() {
        let scheduler = Scheduler::default();
        let state = ReviewState {
            repetition: 2,
            interval_days: 6,
            ease_factor: 2.5,
            ..Default::default()
        };
        let next = scheduler.schedule(&state, q(4), now());

        assert_eq!(next.repetition, 3);
        assert_eq!(next.interval_days, 15); // round(6 * 2.5)
    }

    #[test]
    fn failing_review_resets_regardless_of_progress() {
        let scheduler = Scheduler::default();
        for quality in 0..3 {
            let state = ReviewState {
                repetition: 7,
                interval_days: 42,
                ease_factor: 2.5,
                ..Default::default()
            };
            let next = scheduler.schedule(&state, q(quality), now());
            assert_eq!(next.repetition, 0);
            assert_eq!(next.interval_days, 1);
            assert!(next.ease_factor < 2.5);
        }
    }

    #[test]
    fn ease_factor_floors_at_minimum() {
        let scheduler = Scheduler::default();
        let mut state = ReviewState {
            repetition: 5,
            interval_days: 10,
            ease_factor: 1.35,
            ..Default::default()
        };
        for _ in 0..10 {
            state = scheduler.schedule(&state, q(0), now());
            assert!(state.ease_factor >= 1.3);
        }
        assert!((state.ease_factor - 1.3).abs() < 1e-9);
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let scheduler = Scheduler::default();
        let state = ReviewState {
            repetition: 3,
            interval_days: 15,
            ease_factor: 2.2,
            ..Default::default()
        };
        let t = now();
        assert_eq!(
            scheduler.schedule(&state, q(4), t),
            scheduler.schedule(&state, q(4), t)
        );
    }

    #[test]
    fn history_grows_by_one_per_review_in_order() {
        let scheduler = Scheduler::default();
        let mut state = ReviewState::default();
        let t = now();
        for i in 0..5u8 {
            state = scheduler.schedule(&state, q(i), t + Duration::days(i as i64));
            assert_eq!(state.history.len(), (i + 1) as usize);
        }
        let dates: Vec<_> = state.history.iter().map(|h| h.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn next_review_never_precedes_last_review() {
        let scheduler = Scheduler::default();
        let mut state = ReviewState::default();
        for quality in [5, 5, 2, 3, 0, 4] {
            state = scheduler.schedule(&state, q(quality), now());
            assert!(state.next_review.unwrap() >= state.last_review.unwrap());
        }
    }

    #[test]
    fn custom_config_changes_early_intervals() {
        let scheduler = Scheduler::new(SchedulerConfig {
            first_interval_days: 2,
            second_interval_days: 10,
            ..Default::default()
        });
        let first = scheduler.schedule(&ReviewState::default(), q(4), now());
        assert_eq!(first.interval_days, 2);
        let second = scheduler.schedule(&first, q(4), now());
        assert_eq!(second.interval_days, 10);
    }
}
