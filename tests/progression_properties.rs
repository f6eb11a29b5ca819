//! Property tests for the level curve, gain formula and idempotent credit

mod common;

use proptest::prelude::*;
use std::sync::Arc;

use common::{engine, user, woodcutting};
use skillforge::core::ManualClock;
use skillforge::progression::{
    cumulative_exp_for_level, experience_gain, level_for_experience, required_exp_for_level, SkillProgress,
};
use skillforge::MemoryBackend;

const MAX_LEVEL: u32 = 99;

proptest! {
    #[test]
    fn level_is_monotonic_in_experience(a in 0u64..10_000_000, b in 0u64..10_000_000) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(level_for_experience(low, MAX_LEVEL) <= level_for_experience(high, MAX_LEVEL));
    }

    #[test]
    fn level_stays_in_range(exp in any::<u64>()) {
        let level = level_for_experience(exp, MAX_LEVEL);
        prop_assert!((1..=MAX_LEVEL).contains(&level));
    }

    #[test]
    fn thresholds_are_exact(level in 1u32..40) {
        let threshold = cumulative_exp_for_level(level);
        prop_assert_eq!(level_for_experience(threshold, MAX_LEVEL), level);
        if threshold > 0 {
            prop_assert_eq!(level_for_experience(threshold - 1, MAX_LEVEL), level - 1);
        }
    }

    #[test]
    fn required_experience_grows(level in 1u32..60) {
        prop_assert!(required_exp_for_level(level + 1) > required_exp_for_level(level));
    }

    #[test]
    fn gain_matches_integer_formula(base in 0u64..100_000, level in 1u32..=MAX_LEVEL) {
        let gain = experience_gain(base, level);
        prop_assert_eq!(gain, base * (10 + level as u64) / 10);
        prop_assert!(gain >= base);
        prop_assert!(experience_gain(base, level + 1) >= gain);
    }

    #[test]
    fn level_progress_is_a_fraction(exp in 0u64..10_000_000) {
        let progress = SkillProgress::new(exp).level_progress(MAX_LEVEL);
        prop_assert!((0.0..=1.0).contains(&progress));
    }

    /// Experience never decreases and each interval credits once,
    /// however many times completion is attempted
    #[test]
    fn repeated_completion_credits_once(sessions in 1usize..6, attempts in 1usize..5) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let store = Arc::new(MemoryBackend::new());
            let clock = Arc::new(ManualClock::starting_now());
            let engine = engine(&store, &clock);

            let mut last = 0;
            let mut expected = 0;
            for _ in 0..sessions {
                let interval = engine.start_training(&woodcutting()).await.unwrap().interval().clone();
                clock.advance_secs(60);

                let level = SkillProgress::new(expected).level(MAX_LEVEL);
                expected += experience_gain(10, level);
                for _ in 0..attempts {
                    engine.complete(&interval).await.unwrap();
                    let now = store.experience_of(&user(), &woodcutting());
                    assert!(now >= last);
                    last = now;
                }
                assert_eq!(store.experience_of(&user(), &woodcutting()), expected);
            }
        });
    }
}
