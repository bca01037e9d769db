//! Turn pipeline (spec §4.G): evaluate the candidate's answer and pick the
//! next question concurrently, then advance session state. Grounded on the
//! original `answer_evaluator.py` (evaluation prompt/criteria, JSON schema)
//! and the teacher's task-concurrency idiom in its agent runtime.

use interview_core::error::{InterviewError, Result};
use interview_core::model::{Evaluation, FlowState, InterviewStatus, Question, QuestionType, Session};
use interview_providers::llm::{LlmGateway, Task};
use interview_selector::NextStep;
use interview_session::SessionManager;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Per-question-type evaluation rubric weights, echoed into the prompt so
/// the model scores against the dimensions that actually matter for that
/// question type (spec §4.G / original evaluation criteria table).
fn criteria_for(question_type: &QuestionType) -> &'static [(&'static str, f64)] {
    match question_type {
        QuestionType::Conceptual => &[("accuracy", 0.4), ("completeness", 0.3), ("clarity", 0.2), ("examples", 0.1)],
        QuestionType::Practical => &[("approach", 0.3), ("correctness", 0.3), ("best_practices", 0.2), ("edge_cases", 0.2)],
        QuestionType::Coding => &[("correctness", 0.4), ("efficiency", 0.2), ("readability", 0.2), ("best_practices", 0.2)],
        QuestionType::SystemDesign => &[("architecture", 0.3), ("scalability", 0.2), ("reliability", 0.2), ("tradeoffs", 0.3)],
    }
}

fn evaluation_prompt(question: &Question, answer_text: &str, code: Option<&str>, last_score: Option<f64>) -> String {
    let criteria = criteria_for(&question.question_type);
    let criteria_desc: String = criteria.iter().map(|(k, w)| format!("- {k}: {:.0}% weight\n", w * 100.0)).collect();
    let code_block = code.map(|c| format!("Candidate's Code:\n{c}\n\n")).unwrap_or_default();
    let context = last_score.map(|s| format!("Candidate's last score on this skill: {s:.2}/1.0")).unwrap_or_else(|| "No previous evaluations.".to_string());

    format!(
        "You are evaluating a candidate's answer in a technical interview. Be CRITICAL and HONEST.\n\n\
         Question:\n{}\n\nQuestion Type: {:?}\nSkill Area: {}\nDifficulty: {}\n\n\
         Candidate's Answer:\n{answer_text}\n\n{code_block}Additional Context:\n{context}\n\n\
         Scoring weights:\n{criteria_desc}\n\
         Return a strict JSON object only: {{\"score\": 0.0-1.0, \"feedback\": string, \
         \"strengths\": [string], \"weaknesses\": [string], \"suggestions\": [string], \
         \"next_difficulty\": 1-4, \"sub_scores\": {{\"{}\": 0.0-1.0}}}}",
        question.prompt, question.question_type, question.skill, question.difficulty, question.skill,
    )
}

#[derive(Deserialize)]
struct RawEvaluation {
    score: f64,
    feedback: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    next_difficulty: Option<u8>,
    #[serde(default)]
    sub_scores: Option<Value>,
}

fn parse_evaluation(raw: &str, current_difficulty: u8) -> Evaluation {
    let Ok(parsed) = serde_json::from_str::<RawEvaluation>(raw) else {
        return Evaluation::fallback(current_difficulty);
    };
    if !(0.0..=1.0).contains(&parsed.score) {
        return Evaluation::fallback(current_difficulty);
    }
    let sub_scores = parsed
        .sub_scores
        .and_then(|v| v.as_object().cloned())
        .map(|m| m.into_iter().filter_map(|(k, v)| v.as_f64().map(|f| (k, f))).collect())
        .unwrap_or_default();
    Evaluation {
        score: parsed.score,
        feedback: parsed.feedback,
        strengths: parsed.strengths,
        weaknesses: parsed.weaknesses,
        suggestions: parsed.suggestions,
        sub_scores,
        next_difficulty: parsed.next_difficulty.unwrap_or(current_difficulty).clamp(1, 4),
    }
}

async fn evaluate(llm: &LlmGateway, session: &Session, question: &Question, answer_text: &str, code: Option<&str>) -> Evaluation {
    let last_score = session.evaluations_for_skill(&question.skill).last().map(|e| e.score);
    let prompt = evaluation_prompt(question, answer_text, code, last_score);
    match llm
        .generate(Task::AnswerEvaluation, "You are a strict, fair technical interviewer.", &prompt, 0.3, 800, Some(session.id.as_str()))
        .await
    {
        Ok(raw) => parse_evaluation(&raw, session.difficulty),
        Err(e) => {
            warn!(error = %e, session = session.id.as_str(), "answer evaluation failed, using fallback");
            Evaluation::fallback(session.difficulty)
        }
    }
}

/// Generate the interview's opening question (spec §3 Lifecycle: "Session
/// created at `/start` with initial question already generated"). Always
/// resolves to `introduction` phase on a freshly constructed session.
pub async fn select_initial_question(llm: &LlmGateway, session: &Session) -> Question {
    let step = interview_selector::select_next(session, chrono::Utc::now());
    materialise_next_question(llm, session, step, None).await.unwrap_or_else(|| {
        Question::new(
            "Tell me a bit about yourself and what's brought you to this interview today.",
            "introduction",
            1,
            QuestionType::Conceptual,
        )
    })
}

/// Outcome of a single turn (spec §4.G).
pub struct TurnOutcome {
    pub evaluation: Evaluation,
    pub next_question: Option<Question>,
    /// One- or two-sentence acknowledgement of the just-scored answer,
    /// spoken ahead of `next_question` (spec §4.F Conversational framing).
    /// Absent on completion — there is nothing left to transition into.
    pub transition: Option<String>,
    pub completed: bool,
}

/// Generate the between-turns transition (spec §4.F). `candidate_name` is
/// only referenced when explicitly supplied, never invented.
async fn generate_transition(
    llm: &LlmGateway,
    session_id: &str,
    evaluation: &Evaluation,
    answer_text: &str,
    last_skill: &str,
    next_skill: &str,
    candidate_name: Option<&str>,
) -> String {
    let band = interview_selector::framing::score_band(evaluation.score, answer_text);
    let prompt = interview_selector::framing::framing_prompt(band, last_skill, next_skill, candidate_name);
    llm.generate(Task::ConversationalFraming, "You are a warm but professional technical interviewer.", &prompt, 0.6, 120, Some(session_id))
        .await
        .unwrap_or_else(|_| interview_selector::framing::fallback_transition(next_skill))
}

/// Resolve a `NextStep` into a concrete `Question`, issuing an LLM call for
/// any non-pool source and falling back deterministically on failure.
async fn materialise_next_question(llm: &LlmGateway, session: &Session, step: NextStep, last_answer_text: Option<&str>) -> Option<Question> {
    use interview_core::model::{QuestionContext, QuestionSource};

    match step {
        NextStep::Complete => None,
        NextStep::PoolQuestion(q) => Some(q),
        NextStep::GenerateCodingQuestion { skill, difficulty, phase } => {
            let used: Vec<String> = session.asked_questions.iter().map(|q| q.prompt.clone()).collect();
            let prompt_text = interview_selector::coding::coding_generation_prompt(&skill, difficulty, None);
            let generated = llm
                .generate(Task::QuestionGeneration, "You are an interview question designer.", &prompt_text, 0.7, 800, Some(session.id.as_str()))
                .await
                .ok()
                .and_then(|raw| interview_selector::coding::parse_coding_response(&raw));
            let coding_prompt = generated.unwrap_or_else(|| interview_selector::coding::fallback_coding_prompt(difficulty, &used));
            let mut question = interview_selector::coding::build_coding_question(coding_prompt, &skill, difficulty);
            question.context.phase = Some(phase);
            Some(question)
        }
        NextStep::GenerateProjectQuestion { project, skill, difficulty, phase, deep_dive } => {
            let prompt_text = if deep_dive {
                format!(
                    "The candidate just gave this high-level answer about their project \"{project}\":\n\n\
                     {}\n\n\
                     Ask ONE specific deep-dive follow-up question about a particular functionality, \
                     integration, or technical decision they mentioned. Output only the question text, no preamble.",
                    last_answer_text.unwrap_or("(no prior answer captured)")
                )
            } else {
                format!(
                    "Ask the candidate a single high-level overview interview question about their project \"{project}\" \
                     covering its scope, integrations, and overall purpose. Must not assume any specific feature yet \
                     described. Output only the question text, no preamble."
                )
            };
            let fallback = if deep_dive {
                format!("Can you go deeper into a specific piece of functionality you built in the {project} project?")
            } else {
                format!("Tell me about your work on the {project} project — what was it, and what was your role?")
            };
            let text = llm
                .generate(Task::QuestionGeneration, "You are an experienced technical interviewer.", &prompt_text, 0.7, 300, Some(session.id.as_str()))
                .await
                .unwrap_or(fallback);
            let mut question = Question::new(text, skill, difficulty, QuestionType::Practical);
            question.context = QuestionContext {
                phase: Some(phase),
                source: Some(QuestionSource::DynamicProject),
                project_name: Some(project),
                question_type: Some(if deep_dive { "deep_dive".to_string() } else { "overview".to_string() }),
                ..Default::default()
            };
            Some(question)
        }
        NextStep::GenerateSkillQuestion { skill, difficulty, phase } => {
            let prompt_text = format!(
                "Ask a single interview question about \"{skill}\" at difficulty {difficulty} (1=basic..4=expert). \
                 Output only the question text, no preamble, no numbering."
            );
            let text = llm
                .generate(Task::QuestionGeneration, "You are an experienced technical interviewer.", &prompt_text, 0.7, 300, Some(session.id.as_str()))
                .await
                .unwrap_or_else(|_| format!("Tell me about your experience with {skill}."));
            let mut question = Question::new(text, skill, difficulty, QuestionType::Conceptual);
            question.context.phase = Some(phase);
            question.context.source = Some(QuestionSource::Dynamic);
            Some(question)
        }
    }
}

/// `ingest_answer` (spec §4.G): evaluate the current answer, select the next
/// question concurrently, advance session state, and persist. Report
/// generation on completion is triggered by the caller (the socket handler
/// or REST handler), which is better placed to spawn it as fire-and-forget.
pub async fn ingest_answer(
    manager: &SessionManager,
    llm: &LlmGateway,
    session: &mut Session,
    answer_text: String,
    code: Option<String>,
    candidate_name: Option<&str>,
    ttl_buffer_secs: i64,
) -> Result<TurnOutcome> {
    if session.status == InterviewStatus::Completed {
        return Err(InterviewError::Validation("interview already completed".to_string()));
    }
    let question = session
        .current_question
        .clone()
        .ok_or_else(|| InterviewError::Validation("no current question to answer".to_string()))?;

    session.flow_state = FlowState::AiThinking;
    manager.save(session, ttl_buffer_secs).await.map_err(|e| InterviewError::Internal(e.to_string()))?;

    let now = chrono::Utc::now();
    let (evaluation, next_step) = tokio::join!(
        evaluate(llm, session, &question, &answer_text, code.as_deref()),
        async { interview_selector::select_next(session, now) }
    );

    let last_skill = question.skill.clone();
    let prior_difficulty = question.difficulty;
    session.append_turn(question, answer_text.clone(), evaluation.clone());

    // Difficulty is computed server-side from the moving average of the
    // last 3 scores on this skill; the LLM's `next_difficulty` is advisory
    // only and never authoritative (spec §4.F, §9 Open Question).
    let recent = session.evaluations_for_skill(&last_skill);
    let computed_difficulty = interview_selector::difficulty::smoothed_difficulty(prior_difficulty, recent, 3, interview_selector::difficulty::MAX_DIFFICULTY);
    if evaluation.next_difficulty.abs_diff(computed_difficulty) > 1 {
        warn!(
            session = session.id.as_str(),
            skill = %last_skill,
            llm_suggested = evaluation.next_difficulty,
            computed = computed_difficulty,
            "LLM-suggested difficulty disagrees with computed value by more than 1, ignoring"
        );
    }
    session.difficulty = computed_difficulty;

    let time_cut = interview_selector::phases::time_cut_reached(session, now);
    let next_question = if time_cut { None } else { materialise_next_question(llm, session, next_step, Some(&answer_text)).await };

    let completed = time_cut || next_question.is_none();
    if completed {
        session.mark_completed();
        manager.save(session, ttl_buffer_secs).await.map_err(|e| InterviewError::Internal(e.to_string()))?;
        return Ok(TurnOutcome { evaluation, next_question: None, transition: None, completed: true });
    }

    let next_question = next_question.expect("checked above");
    let transition = generate_transition(
        llm,
        session.id.as_str(),
        &evaluation,
        &answer_text,
        &last_skill,
        &next_question.skill,
        candidate_name,
    )
    .await;

    if let Some(phase) = next_question.context.phase.clone() {
        session.phase = phase;
    }
    session.set_current_question(next_question.clone());
    session.flow_state = FlowState::AiSpeaking;
    manager.save(session, ttl_buffer_secs).await.map_err(|e| InterviewError::Internal(e.to_string()))?;

    Ok(TurnOutcome { evaluation, next_question: Some(next_question), transition: Some(transition), completed: false })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_evaluation_used_on_malformed_json() {
        let eval = parse_evaluation("not json", 2);
        assert_eq!(eval.score, 0.5);
        assert_eq!(eval.next_difficulty, 2);
    }

    #[test]
    fn fallback_evaluation_used_on_out_of_range_score() {
        let eval = parse_evaluation(r#"{"score":1.5,"feedback":"x","next_difficulty":3}"#, 2);
        assert_eq!(eval.score, 0.5);
    }

    #[test]
    fn valid_evaluation_is_parsed() {
        let raw = r#"{"score":0.8,"feedback":"Good job","strengths":["clear"],"weaknesses":[],"suggestions":[],"next_difficulty":3,"sub_scores":{"Python":0.8}}"#;
        let eval = parse_evaluation(raw, 2);
        assert_eq!(eval.score, 0.8);
        assert_eq!(eval.next_difficulty, 3);
        assert_eq!(eval.sub_scores.get("Python"), Some(&0.8));
    }
}
