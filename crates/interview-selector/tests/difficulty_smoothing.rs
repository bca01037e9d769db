// Property tests for the moving-average difficulty transition (spec.md
// §4.F/§8): the next difficulty is always within [1,4], never moves by more
// than one step, and is a pure deterministic function of the current
// difficulty and the recent evaluation scores.

use interview_core::model::Evaluation;
use interview_selector::difficulty::{smoothed_difficulty, MAX_DIFFICULTY, MIN_DIFFICULTY};
use proptest::prelude::*;

fn eval(score: f64) -> Evaluation {
    Evaluation {
        score,
        feedback: String::new(),
        strengths: vec![],
        weaknesses: vec![],
        suggestions: vec![],
        sub_scores: Default::default(),
        next_difficulty: 1,
    }
}

proptest! {
    #[test]
    fn stays_within_bounds_and_steps_at_most_one(
        current in MIN_DIFFICULTY..=MAX_DIFFICULTY,
        scores in prop::collection::vec(0.0f64..=1.0f64, 0..10),
    ) {
        let evals: Vec<Evaluation> = scores.iter().map(|s| eval(*s)).collect();
        let next = smoothed_difficulty(current, &evals, 3, MAX_DIFFICULTY);

        prop_assert!(next >= MIN_DIFFICULTY && next <= MAX_DIFFICULTY);
        let delta = (next as i32 - current as i32).abs();
        prop_assert!(delta <= 1);
    }

    #[test]
    fn is_deterministic(
        current in MIN_DIFFICULTY..=MAX_DIFFICULTY,
        scores in prop::collection::vec(0.0f64..=1.0f64, 0..10),
    ) {
        let evals: Vec<Evaluation> = scores.iter().map(|s| eval(*s)).collect();
        let a = smoothed_difficulty(current, &evals, 3, MAX_DIFFICULTY);
        let b = smoothed_difficulty(current, &evals, 3, MAX_DIFFICULTY);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn high_average_never_decreases_difficulty(
        current in MIN_DIFFICULTY..=MAX_DIFFICULTY,
        high_scores in prop::collection::vec(0.8f64..=1.0f64, 1..5),
    ) {
        let evals: Vec<Evaluation> = high_scores.iter().map(|s| eval(*s)).collect();
        let next = smoothed_difficulty(current, &evals, 3, MAX_DIFFICULTY);
        prop_assert!(next >= current);
    }

    #[test]
    fn low_average_never_increases_difficulty(
        current in MIN_DIFFICULTY..=MAX_DIFFICULTY,
        low_scores in prop::collection::vec(0.0f64..0.6f64, 1..5),
    ) {
        let evals: Vec<Evaluation> = low_scores.iter().map(|s| eval(*s)).collect();
        let next = smoothed_difficulty(current, &evals, 3, MAX_DIFFICULTY);
        prop_assert!(next <= current);
    }
}
