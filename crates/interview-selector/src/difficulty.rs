//! Smoothed difficulty progression (spec §4.F): a moving average over the
//! last few evaluations for a skill, banded into a single-step adjustment.

use interview_core::model::Evaluation;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 4;

pub fn moving_average_score(evaluations: &[Evaluation], window_size: usize) -> f64 {
    if evaluations.is_empty() {
        return 0.5;
    }
    let start = evaluations.len().saturating_sub(window_size);
    let window = &evaluations[start..];
    window.iter().map(|e| e.score).sum::<f64>() / window.len() as f64
}

/// Smooth `current` toward the moving average of `recent_evaluations`,
/// clamped to a ±1 step and to `[MIN_DIFFICULTY, ceiling]`.
pub fn smoothed_difficulty(current: u8, recent_evaluations: &[Evaluation], window_size: usize, ceiling: u8) -> u8 {
    if recent_evaluations.is_empty() {
        return current;
    }
    let avg = moving_average_score(recent_evaluations, window_size);
    let current = current as i32;

    let target = if avg >= 0.8 {
        current + 1
    } else if avg >= 0.6 {
        current
    } else {
        current - 1
    };

    let change = (target - current).clamp(-1, 1);
    (current + change).clamp(MIN_DIFFICULTY as i32, ceiling as i32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(score: f64) -> Evaluation {
        Evaluation { score, feedback: String::new(), strengths: vec![], weaknesses: vec![], suggestions: vec![], sub_scores: Default::default(), next_difficulty: 1 }
    }

    #[test]
    fn excellent_average_steps_up_by_one() {
        let evals = vec![eval(0.9), eval(0.85), eval(0.95)];
        assert_eq!(smoothed_difficulty(2, &evals, 3, MAX_DIFFICULTY), 3);
    }

    #[test]
    fn poor_average_steps_down_by_one() {
        let evals = vec![eval(0.2), eval(0.3), eval(0.1)];
        assert_eq!(smoothed_difficulty(2, &evals, 3, MAX_DIFFICULTY), 1);
    }

    #[test]
    fn never_jumps_more_than_one_band() {
        // A single excellent score after nothing else still only moves one step.
        let evals = vec![eval(1.0)];
        assert_eq!(smoothed_difficulty(1, &evals, 3, MAX_DIFFICULTY), 2);
    }

    #[test]
    fn clamps_to_difficulty_bounds() {
        let evals = vec![eval(0.1)];
        assert_eq!(smoothed_difficulty(MIN_DIFFICULTY, &evals, 3, MAX_DIFFICULTY), MIN_DIFFICULTY);
        let evals = vec![eval(0.95)];
        assert_eq!(smoothed_difficulty(MAX_DIFFICULTY, &evals, 3, MAX_DIFFICULTY), MAX_DIFFICULTY);
    }
}
