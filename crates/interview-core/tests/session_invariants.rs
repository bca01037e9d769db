// Property tests for the session record invariants in spec.md §3/§8:
// total_questions == len(asked) == sum(phase counts), and the sliding
// conversation window never exceeds its capacity, across arbitrary
// sequences of appended turns.

use interview_core::model::{
    Evaluation, InterviewPhase, Question, QuestionType, ResumeSnapshot, Session, SessionConfig,
};
use proptest::prelude::*;

fn base_session(window_capacity: usize) -> Session {
    Session::new(
        "candidate-1",
        SessionConfig { role: "backend-developer".into(), duration_minutes: 30, max_questions: 15, experience_level: None },
        ResumeSnapshot::default(),
        window_capacity,
    )
}

fn arb_phase() -> impl Strategy<Value = InterviewPhase> {
    prop_oneof![
        Just(InterviewPhase::Introduction),
        Just(InterviewPhase::Projects),
        Just(InterviewPhase::StandoutSkills),
        Just(InterviewPhase::RoleSkills),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_after_any_turn_sequence(
        window_capacity in 0usize..8,
        turns in prop::collection::vec((arb_phase(), 0.0f64..1.0f64), 0..40),
    ) {
        let mut session = base_session(window_capacity);
        for (phase, score) in turns {
            let mut question = Question::new("prompt text", "Python", 2, QuestionType::Conceptual);
            question.context.phase = Some(phase);
            let evaluation = Evaluation { score, ..Evaluation::fallback(2) };
            session.append_turn(question, "answer".to_string(), evaluation);
        }
        prop_assert!(session.invariants_hold());
        prop_assert_eq!(session.total_questions as usize, session.asked_questions.len());
        prop_assert!(session.conversation_window.len() <= window_capacity);
    }

    #[test]
    fn window_never_exceeds_capacity_and_keeps_most_recent(
        window_capacity in 1usize..6,
        n in 0usize..30,
    ) {
        let mut session = base_session(window_capacity);
        for i in 0..n {
            let question = Question::new(format!("q{i}"), "Python", 2, QuestionType::Conceptual);
            session.append_turn(question, format!("answer{i}"), Evaluation::fallback(2));
        }
        prop_assert!(session.conversation_window.len() <= window_capacity);
        if n > 0 {
            let expected_last = format!("q{}", n - 1);
            prop_assert_eq!(&session.conversation_window.last().unwrap().question.prompt, &expected_last);
        }
    }
}
