//! Report generation (spec §4.I). Grounded on the original
//! `report_generator.py` (transcript assembly, completion-ratio scoring
//! caps, coding-performance breakdown).

use std::collections::HashMap;

use interview_core::model::{QuestionType, Session};
use interview_providers::llm::{LlmGateway, Task};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingDifficultyBreakdown {
    pub attempted: u32,
    pub solved: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingPerformance {
    pub total_coding_questions: u32,
    pub coding_questions_solved: u32,
    pub success_rate: f64,
    pub by_difficulty: HashMap<String, CodingDifficultyBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewReport {
    pub session_id: String,
    pub overall_score: Option<f64>,
    pub section_scores: HashMap<String, f64>,
    pub coding_performance: CodingPerformance,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub detailed_feedback: String,
    pub recommendation: String,
    pub improvement_suggestions: Vec<String>,
    pub questions_answered: u32,
    pub expected_questions: u32,
}

/// Build a human-readable transcript from the bounded conversation window,
/// falling back to question + evaluation-feedback summaries when the
/// window is empty (spec §4.I).
pub fn build_transcript(session: &Session) -> String {
    if !session.conversation_window.is_empty() {
        return session
            .conversation_window
            .iter()
            .map(|turn| format!("Interviewer: {}\nCandidate: {}", turn.question.prompt, turn.answer_text))
            .collect::<Vec<_>>()
            .join("\n\n");
    }
    if session.asked_questions.is_empty() {
        return "No transcript available.".to_string();
    }
    let all_evaluations: Vec<_> = session.answered_skills.values().flatten().collect();
    session
        .asked_questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let answer_summary = all_evaluations
                .get(i)
                .map(|e| format!("[Answer evaluated - {}]", e.feedback.chars().take(100).collect::<String>()))
                .unwrap_or_else(|| "[Answer provided]".to_string());
            format!("Interviewer: {}\nCandidate: {answer_summary}", q.prompt)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn skill_scores(session: &Session) -> HashMap<String, f64> {
    session
        .answered_skills
        .iter()
        .filter(|(_, evals)| !evals.is_empty())
        .map(|(skill, evals)| (skill.clone(), evals.iter().map(|e| e.score).sum::<f64>() / evals.len() as f64))
        .collect()
}

fn difficulty_band(difficulty: u8) -> &'static str {
    match difficulty {
        0..=2 => "easy",
        3 => "medium",
        _ => "hard",
    }
}

/// Per-question coding pass/fail, keyed by occurrence order within each
/// skill's evaluation list (spec §4.I coding success rate): `answered_skills`
/// groups evaluations by skill in the same order `asked_questions` records
/// them, so the Nth coding question on a skill maps to the Nth evaluation
/// for that skill, not "any evaluation on this skill ever scored well".
fn coding_performance(session: &Session) -> CodingPerformance {
    let mut by_difficulty: HashMap<String, CodingDifficultyBreakdown> = ["easy", "medium", "hard"]
        .into_iter()
        .map(|k| (k.to_string(), CodingDifficultyBreakdown { attempted: 0, solved: 0 }))
        .collect();

    let mut seen_for_skill: HashMap<&str, usize> = HashMap::new();
    let mut total = 0u32;
    let mut solved = 0u32;
    for q in &session.asked_questions {
        let occurrence = seen_for_skill.entry(q.skill.as_str()).or_insert(0);
        let this_occurrence = *occurrence;
        *occurrence += 1;

        if q.question_type != QuestionType::Coding {
            continue;
        }
        total += 1;
        let band = difficulty_band(q.difficulty);
        let entry = by_difficulty.get_mut(band).expect("band always present");
        entry.attempted += 1;
        let question_solved = session
            .answered_skills
            .get(&q.skill)
            .and_then(|evals| evals.get(this_occurrence))
            .map(|e| e.score >= 0.6)
            .unwrap_or(false);
        if question_solved {
            solved += 1;
            entry.solved += 1;
        }
    }

    if total == 0 {
        return CodingPerformance { total_coding_questions: 0, coding_questions_solved: 0, success_rate: 0.0, by_difficulty };
    }

    CodingPerformance {
        total_coding_questions: total,
        coding_questions_solved: solved,
        success_rate: (solved as f64 / total as f64 * 1000.0).round() / 10.0,
        by_difficulty,
    }
}

/// Completion-capped overall score (spec §4.I). Returns `None` when zero
/// questions were answered.
fn overall_score(session: &Session) -> Option<f64> {
    let all_scores: Vec<f64> = session.answered_skills.values().flatten().map(|e| e.score).collect();
    if all_scores.is_empty() {
        return None;
    }
    let base_score = all_scores.iter().sum::<f64>() / all_scores.len() as f64;

    let questions_answered = session.asked_questions.len() as u32;
    let expected = session.config.max_questions.max(1);
    let completion_ratio = (questions_answered as f64 / expected as f64).min(1.0);

    let mut adjusted = base_score * completion_ratio;
    if completion_ratio < 0.5 {
        adjusted = adjusted.min(base_score * 0.6);
    } else if completion_ratio < 0.75 {
        adjusted = adjusted.min(base_score * 0.8);
    }
    Some(adjusted.min(base_score))
}

fn recommendation_for(overall: Option<f64>) -> String {
    match overall {
        None => "no_assessment".to_string(),
        Some(score) if score >= 0.85 => "strong_hire".to_string(),
        Some(score) if score >= 0.7 => "hire".to_string(),
        Some(score) if score >= 0.5 => "maybe".to_string(),
        Some(_) => "no_hire".to_string(),
    }
}

#[derive(Deserialize, Default)]
struct LlmReportFields {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    detailed_feedback: String,
    #[serde(default)]
    improvement_suggestions: Vec<String>,
}

fn parse_llm_report(raw: &str) -> LlmReportFields {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Build the full report for a completed (or in-progress, for a partial
/// preview) session (spec §4.I). Computed metrics always win over whatever
/// the LLM returns; the LLM call failing still yields a deterministic report.
pub async fn generate_report(llm: &LlmGateway, session: &Session) -> InterviewReport {
    let section_scores = skill_scores(session);
    let coding = coding_performance(session);
    let overall = overall_score(session);
    let recommendation = recommendation_for(overall);
    let questions_answered = session.asked_questions.len() as u32;
    let expected_questions = session.config.max_questions;

    if questions_answered == 0 {
        return InterviewReport {
            session_id: session.id.as_str().to_string(),
            overall_score: None,
            section_scores,
            coding_performance: coding,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            detailed_feedback: "The candidate did not answer any questions.".to_string(),
            recommendation: "no_assessment".to_string(),
            improvement_suggestions: Vec::new(),
            questions_answered,
            expected_questions,
        };
    }

    let transcript = build_transcript(session);
    let prompt = format!(
        "Write a hiring report for this technical interview transcript.\n\nRole: {}\n\nTranscript:\n{transcript}\n\n\
         Return strict JSON only: {{\"strengths\": [string], \"weaknesses\": [string], \
         \"detailed_feedback\": string, \"improvement_suggestions\": [string]}}",
        session.config.role,
    );

    let llm_fields = match llm
        .generate(Task::ReportGeneration, "You are an experienced technical hiring manager.", &prompt, 0.4, 1200, Some(session.id.as_str()))
        .await
    {
        Ok(raw) => parse_llm_report(&raw),
        Err(e) => {
            warn!(error = %e, session = session.id.as_str(), "report generation LLM call failed, using deterministic fallback");
            LlmReportFields {
                detailed_feedback: "Automated narrative feedback was unavailable for this report; scores were computed from recorded evaluations.".to_string(),
                ..Default::default()
            }
        }
    };

    InterviewReport {
        session_id: session.id.as_str().to_string(),
        overall_score: overall,
        section_scores,
        coding_performance: coding,
        strengths: llm_fields.strengths,
        weaknesses: llm_fields.weaknesses,
        detailed_feedback: llm_fields.detailed_feedback,
        recommendation,
        improvement_suggestions: llm_fields.improvement_suggestions,
        questions_answered,
        expected_questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_core::model::{Evaluation, Question, ResumeSnapshot, SessionConfig};
    use proptest::prelude::*;

    fn base_session() -> Session {
        Session::new(
            "candidate-1",
            SessionConfig { role: "backend-developer".into(), duration_minutes: 30, max_questions: 4, experience_level: None },
            ResumeSnapshot::default(),
            5,
        )
    }

    #[test]
    fn zero_answers_yields_no_assessment_score() {
        let session = base_session();
        assert_eq!(overall_score(&session), None);
        assert_eq!(recommendation_for(None), "no_assessment");
    }

    #[test]
    fn low_completion_caps_score_at_60_percent_of_base() {
        let mut session = base_session();
        let q = Question::new("q", "Python", 2, QuestionType::Conceptual);
        session.append_turn(q, "answer".into(), Evaluation { score: 1.0, ..Evaluation::fallback(2) });
        let score = overall_score(&session).unwrap();
        assert!(score <= 1.0 * 0.6 + 1e-9, "expected capped score, got {score}");
    }

    #[test]
    fn transcript_falls_back_to_question_and_feedback_when_window_empty() {
        let mut session = base_session();
        session.window_capacity = 0;
        let q = Question::new("What is a mutex?", "Python", 2, QuestionType::Conceptual);
        session.append_turn(q, "answer".into(), Evaluation::fallback(2));
        let transcript = build_transcript(&session);
        assert!(transcript.contains("What is a mutex?"));
    }

    #[test]
    fn coding_performance_counts_by_difficulty_band() {
        let mut session = base_session();
        let q = Question::new("solve it", "problem-solving", 4, QuestionType::Coding);
        session.append_turn(q, "code".into(), Evaluation { score: 0.9, ..Evaluation::fallback(4) });
        let perf = coding_performance(&session);
        assert_eq!(perf.total_coding_questions, 1);
        assert_eq!(perf.coding_questions_solved, 1);
        assert_eq!(perf.by_difficulty.get("hard").unwrap().solved, 1);
    }

    #[test]
    fn coding_performance_matches_each_question_to_its_own_evaluation() {
        let mut session = base_session();
        let q1 = Question::new("solve easy", "problem-solving", 1, QuestionType::Coding);
        session.append_turn(q1, "code".into(), Evaluation { score: 0.2, ..Evaluation::fallback(1) });
        let q2 = Question::new("solve hard", "problem-solving", 4, QuestionType::Coding);
        session.append_turn(q2, "code".into(), Evaluation { score: 0.9, ..Evaluation::fallback(4) });

        let perf = coding_performance(&session);
        assert_eq!(perf.total_coding_questions, 2);
        assert_eq!(perf.coding_questions_solved, 1, "only the second, higher-scored question should count as solved");
        assert_eq!(perf.by_difficulty.get("easy").unwrap().solved, 0);
        assert_eq!(perf.by_difficulty.get("hard").unwrap().solved, 1);
    }

    proptest! {
        /// Overall score never exceeds the completion-weighted base score,
        /// and respects the 0.6/0.8 caps below 50%/75% completion
        /// (spec.md §4.I, §8 invariant).
        #[test]
        fn overall_score_respects_completion_caps(
            scores in prop::collection::vec(0.0f64..=1.0f64, 1..20),
            max_questions in 1u32..25,
        ) {
            let mut session = Session::new(
                "candidate-1",
                SessionConfig { role: "backend-developer".into(), duration_minutes: 30, max_questions, experience_level: None },
                ResumeSnapshot::default(),
                5,
            );
            for (i, score) in scores.iter().enumerate() {
                let q = Question::new(format!("q{i}"), "Python", 2, QuestionType::Conceptual);
                session.append_turn(q, "answer".into(), Evaluation { score: *score, ..Evaluation::fallback(2) });
            }

            let base_score = scores.iter().sum::<f64>() / scores.len() as f64;
            let completion_ratio = (scores.len() as f64 / max_questions.max(1) as f64).min(1.0);

            let score = overall_score(&session).expect("at least one answered question");
            prop_assert!(score <= base_score * completion_ratio + 1e-9);
            if completion_ratio < 0.5 {
                prop_assert!(score <= base_score * 0.6 + 1e-9);
            } else if completion_ratio < 0.75 {
                prop_assert!(score <= base_score * 0.8 + 1e-9);
            }
        }
    }
}
