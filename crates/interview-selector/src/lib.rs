//! Adaptive question selection (spec §4.F): phase budgets, skill weighting,
//! difficulty smoothing, coding-question gating and conversational framing,
//! composed into a single `select_next` entry point the orchestrator drives.

pub mod coding;
pub mod difficulty;
pub mod framing;
pub mod gating;
pub mod phases;
pub mod question_pool;
pub mod role_skills;
pub mod skill_weighting;

use std::collections::HashSet;

use interview_core::model::{InterviewPhase, Question, QuestionSource, QuestionType, Session};

/// What the orchestrator should do next, decided without making any network
/// calls itself — `Dynamic`/`Coding`/`DynamicProject` outcomes still require
/// the orchestrator to round-trip through the LLM gateway; `Pool` is ready
/// to use as-is.
pub enum NextStep {
    /// Interview is over: either every phase budget is spent or the time
    /// cut has been reached.
    Complete,
    /// Ask a pool question verbatim.
    PoolQuestion(Question),
    /// Ask about a project; caller must generate the actual prompt.
    /// `deep_dive = true` means this is the specific-functionality follow-up
    /// that must come right after the project's high-level question (spec §4.F).
    GenerateProjectQuestion { project: String, skill: String, difficulty: u8, phase: InterviewPhase, deep_dive: bool },
    /// Ask a coding question; caller must generate or fall back (see `coding` module).
    GenerateCodingQuestion { skill: String, difficulty: u8, phase: InterviewPhase },
    /// Ask a conceptual/practical question about a skill with no pool entry.
    GenerateSkillQuestion { skill: String, difficulty: u8, phase: InterviewPhase },
}

fn used_prompts(session: &Session) -> Vec<String> {
    session.asked_questions.iter().map(|q| q.prompt.clone()).collect()
}

fn covered_skills(session: &Session) -> HashSet<String> {
    session.asked_questions.iter().map(|q| q.skill.clone()).collect()
}

fn coding_asked_count(session: &Session) -> u32 {
    session.asked_questions.iter().filter(|q| q.question_type == QuestionType::Coding).count() as u32
}

/// Pick the next skill within a phase: highest-weight skill not yet asked
/// about, from the eligible set for that phase.
fn pick_skill<'a>(eligible: &[&'a str], covered: &HashSet<String>) -> Option<&'a str> {
    eligible.iter().find(|s| !covered.contains(**s)).copied()
}

/// Decide the next step for a session already past phase/time-cut checks
/// (spec §4.F/§4.G). `now` is injected by the caller so this stays pure.
pub fn select_next(session: &Session, now: chrono::DateTime<chrono::Utc>) -> NextStep {
    if phases::time_cut_reached(session, now) {
        return NextStep::Complete;
    }

    let mut phase = session.phase.clone();
    loop {
        let exhausted = phases::effective_phase_count(session, &phase) >= phases::budget_for(&phase);
        if !exhausted && !phase_has_no_candidates(session, &phase) {
            break;
        }
        match phases::next_phase(&phase) {
            Some(next) => phase = next,
            None => return NextStep::Complete,
        }
    }

    match phase {
        InterviewPhase::Introduction => NextStep::GenerateSkillQuestion {
            skill: "introduction".to_string(),
            difficulty: 1,
            phase,
        },
        InterviewPhase::Projects => {
            if let Some(project) = phases::pending_deep_dive_project(session) {
                return NextStep::GenerateProjectQuestion {
                    project,
                    skill: session.config.role.clone(),
                    difficulty: session.difficulty,
                    phase,
                    deep_dive: true,
                };
            }
            let covered = covered_skills(session);
            let fully_covered = phases::fully_covered_projects(session);
            match phases::next_project(&session.resume, &covered, &fully_covered) {
                Some(project) => NextStep::GenerateProjectQuestion {
                    project: project.to_string(),
                    skill: session.config.role.clone(),
                    difficulty: session.difficulty,
                    phase,
                    deep_dive: false,
                },
                None => NextStep::Complete,
            }
        }
        InterviewPhase::StandoutSkills => {
            let standout = phases::standout_skills(&session.resume, &session.skill_weights);
            let covered = covered_skills(session);
            select_skill_question(session, pick_skill(&standout, &covered), phase)
        }
        InterviewPhase::RoleSkills => {
            let eligible = phases::eligible_role_skills(&session.skill_weights);
            let covered = covered_skills(session);
            let skill = eligible.iter().map(|w| w.skill.as_str()).find(|s| {
                let asked_for_skill = session.asked_questions.iter().filter(|q| q.skill == *s).count() as u32;
                let weight = session.skill_weights.iter().find(|w| w.skill == *s).map(|w| w.weight).unwrap_or(0.0);
                asked_for_skill < phases::role_skill_question_cap(weight) || !covered.contains(*s)
            });
            select_skill_question(session, skill, phase)
        }
    }
}

/// Whether a phase has nothing left to pick from, independent of its
/// question-count budget — used so we skip straight past e.g. an empty
/// Projects phase instead of stalling there.
fn phase_has_no_candidates(session: &Session, phase: &InterviewPhase) -> bool {
    match phase {
        InterviewPhase::Introduction => false,
        InterviewPhase::Projects => {
            if phases::pending_deep_dive_project(session).is_some() {
                return false;
            }
            let covered = covered_skills(session);
            let fully_covered = phases::fully_covered_projects(session);
            phases::next_project(&session.resume, &covered, &fully_covered).is_none()
        }
        InterviewPhase::StandoutSkills => {
            let standout = phases::standout_skills(&session.resume, &session.skill_weights);
            let covered = covered_skills(session);
            pick_skill(&standout, &covered).is_none()
        }
        InterviewPhase::RoleSkills => phases::eligible_role_skills(&session.skill_weights).is_empty(),
    }
}

fn select_skill_question(session: &Session, skill: Option<&str>, phase: InterviewPhase) -> NextStep {
    let Some(skill) = skill else { return NextStep::Complete };

    let struggling = gating::struggling_on_coding(
        &session.asked_questions,
        &session
            .conversation_window
            .iter()
            .map(|t| (t.question.id.clone(), t.evaluation.clone()))
            .collect::<Vec<_>>(),
    );
    let ask_coding = gating::should_ask_coding(
        skill,
        &session.config.role,
        session.config.experience_level.as_ref(),
        coding_asked_count(session),
        session.total_questions,
        struggling,
    );
    if ask_coding {
        return NextStep::GenerateCodingQuestion { skill: skill.to_string(), difficulty: session.difficulty, phase };
    }

    if question_pool::is_common_skill(skill) {
        let used = used_prompts(session);
        if let Some(prompt) = question_pool::question_from_pool(skill, session.difficulty, &used) {
            let mut question = Question::new(prompt, skill, session.difficulty, QuestionType::Conceptual);
            question.context.phase = Some(phase);
            question.context.source = Some(QuestionSource::Pool);
            return NextStep::PoolQuestion(question);
        }
    }

    NextStep::GenerateSkillQuestion { skill: skill.to_string(), difficulty: session.difficulty, phase }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_core::model::{ResumeSnapshot, SessionConfig};

    fn base_session() -> Session {
        let mut s = Session::new(
            "candidate-1",
            SessionConfig { role: "backend-developer".into(), duration_minutes: 30, max_questions: 15, experience_level: None },
            ResumeSnapshot::default(),
            5,
        );
        s.mark_started();
        s
    }

    #[test]
    fn fresh_session_starts_with_introduction() {
        let s = base_session();
        match select_next(&s, chrono::Utc::now()) {
            NextStep::GenerateSkillQuestion { phase, .. } => assert_eq!(phase, InterviewPhase::Introduction),
            _ => panic!("expected an introduction question"),
        }
    }

    #[test]
    fn past_time_cut_completes_immediately() {
        let mut s = base_session();
        s.started_at = Some((chrono::Utc::now() - chrono::Duration::minutes(60)).to_rfc3339());
        match select_next(&s, chrono::Utc::now()) {
            NextStep::Complete => {}
            _ => panic!("expected completion past the time cut"),
        }
    }

    #[test]
    fn role_skills_phase_picks_a_pooled_question_for_a_common_skill() {
        let mut s = base_session();
        s.phase = InterviewPhase::RoleSkills;
        s.skill_weights = skill_weighting::calculate_skill_weights(&s.config.role, &s.resume);
        match select_next(&s, chrono::Utc::now()) {
            NextStep::PoolQuestion(q) => assert_eq!(q.context.source, Some(QuestionSource::Pool)),
            NextStep::GenerateSkillQuestion { .. } => {}
            other => panic!("unexpected outcome for role_skills phase: {:?}", std::mem::discriminant(&other)),
        }
    }
}
