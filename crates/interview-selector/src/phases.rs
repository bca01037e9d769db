//! Top-level phase orchestration (spec §4.F). Grounded on the original
//! `phased_flow.py` (phase budgets, project tech-overlap ordering,
//! standout-skill selection, role-skill eligibility/cap/ordering) and
//! `flow_decisions.py` (time-cut check).

use std::collections::HashSet;

use interview_core::model::{InterviewPhase, ResumeSnapshot, Session, SkillWeight};

/// Phase budgets: at most this many questions are asked within each phase
/// before the selector moves on (spec §4.F).
pub const INTRODUCTION_BUDGET: u32 = 1;
pub const PROJECTS_BUDGET: u32 = 4;
pub const STANDOUT_SKILLS_BUDGET: u32 = 4;
pub const ROLE_SKILLS_BUDGET: u32 = 6;

pub fn budget_for(phase: &InterviewPhase) -> u32 {
    match phase {
        InterviewPhase::Introduction => INTRODUCTION_BUDGET,
        InterviewPhase::Projects => PROJECTS_BUDGET,
        InterviewPhase::StandoutSkills => STANDOUT_SKILLS_BUDGET,
        InterviewPhase::RoleSkills => ROLE_SKILLS_BUDGET,
    }
}

/// `session.phase_count` only reflects questions already appended to
/// history (`append_turn`). The question currently in flight — being
/// answered right now, or just emitted by `/start` — has already consumed
/// one slot of its phase's budget but hasn't been counted yet, so budget
/// checks must add it back in to avoid over-asking a phase by one (spec §3
/// invariant `total_questions == len(asked) == sum(phase_counts)`, §4.F).
pub fn effective_phase_count(session: &Session, phase: &InterviewPhase) -> u32 {
    let in_flight = session
        .current_question
        .as_ref()
        .map(|q| q.context.phase.clone().unwrap_or_else(|| session.phase.clone()) == *phase)
        .unwrap_or(false);
    session.phase_count(phase) + if in_flight { 1 } else { 0 }
}

/// Whether the session has exhausted the current phase's budget and should
/// advance to the next one (spec §4.F). `RoleSkills` is terminal.
pub fn phase_exhausted(session: &Session) -> bool {
    effective_phase_count(session, &session.phase) >= budget_for(&session.phase)
}

pub fn next_phase(current: &InterviewPhase) -> Option<InterviewPhase> {
    match current {
        InterviewPhase::Introduction => Some(InterviewPhase::Projects),
        InterviewPhase::Projects => Some(InterviewPhase::StandoutSkills),
        InterviewPhase::StandoutSkills => Some(InterviewPhase::RoleSkills),
        InterviewPhase::RoleSkills => None,
    }
}

/// True once elapsed wall-clock time since `started_at` reaches the
/// configured interview duration — the hard stop regardless of phase or
/// question count (spec §4.F / §4.G).
pub fn time_cut_reached(session: &Session, now: chrono::DateTime<chrono::Utc>) -> bool {
    let Some(started_at) = session.started_at.as_deref() else { return false };
    let Ok(started) = chrono::DateTime::parse_from_rfc3339(started_at) else { return false };
    let elapsed_minutes = (now - started.with_timezone(&chrono::Utc)).num_minutes();
    elapsed_minutes >= session.config.duration_minutes
}

/// Pick the next project for a fresh high-level question, ordered by
/// technology overlap with already-covered skills (richest overlap first),
/// excluding projects that have already had their high-level + deep-dive
/// pair completed (spec §4.F).
pub fn next_project<'a>(resume: &'a ResumeSnapshot, covered_skills: &HashSet<String>, fully_covered: &HashSet<String>) -> Option<&'a str> {
    resume
        .projects
        .iter()
        .filter(|p| !fully_covered.contains(&p.name))
        .max_by_key(|p| p.technologies.iter().filter(|t| covered_skills.contains(t.as_str())).count())
        .map(|p| p.name.as_str())
}

/// Whether `project` already has a high-level question on record (spec §4.F:
/// "for each project, ask a high-level question... after a high-level answer
/// exists, ask one deep-dive follow-up").
pub fn project_has_high_level(session: &Session, project: &str) -> bool {
    session
        .asked_questions
        .iter()
        .any(|q| q.context.project_name.as_deref() == Some(project) && q.context.question_type.as_deref() != Some("deep_dive"))
}

/// Whether `project` already has its deep-dive follow-up on record.
pub fn project_has_deep_dive(session: &Session, project: &str) -> bool {
    session
        .asked_questions
        .iter()
        .any(|q| q.context.project_name.as_deref() == Some(project) && q.context.question_type.as_deref() == Some("deep_dive"))
}

/// Projects whose high-level + deep-dive pair is both asked already, so
/// `next_project` should no longer offer them for a fresh high-level question.
pub fn fully_covered_projects(session: &Session) -> HashSet<String> {
    session
        .resume
        .projects
        .iter()
        .map(|p| p.name.clone())
        .filter(|name| project_has_high_level(session, name) && project_has_deep_dive(session, name))
        .collect()
}

/// If the question just answered was a project high-level question whose
/// project has no deep-dive yet, that project's name is returned so the
/// selector asks the deep-dive follow-up next, before moving to another
/// project (spec §4.F).
pub fn pending_deep_dive_project(session: &Session) -> Option<String> {
    let current = session.current_question.as_ref()?;
    let project = current.context.project_name.clone()?;
    if current.context.question_type.as_deref() == Some("deep_dive") {
        return None;
    }
    if project_has_deep_dive(session, &project) {
        return None;
    }
    Some(project)
}

/// Standout skills: résumé skills with direct work experience (`years > 0`),
/// falling back to skills whose computed weight clears 0.6 when no résumé
/// experience data exists at all (spec §4.F).
pub fn standout_skills<'a>(resume: &'a ResumeSnapshot, skill_weights: &'a [SkillWeight]) -> Vec<&'a str> {
    let experienced: Vec<&str> = resume.skills.iter().filter(|s| s.years > 0.0).map(|s| s.name.as_str()).collect();
    if !experienced.is_empty() {
        return experienced;
    }
    skill_weights.iter().filter(|w| w.weight >= 0.6).map(|w| w.skill.as_str()).collect()
}

/// Per-skill question cap within the role-skills phase: `ceil(2, weight*4)`
/// capped at 2 (spec §4.F — a high-weight skill still gets at most two
/// dedicated questions so the phase budget stretches across several skills).
pub fn role_skill_question_cap(weight: f64) -> u32 {
    let raw = (weight * 4.0).ceil().max(1.0) as u32;
    raw.min(2)
}

/// Role-skills eligible for selection: `role_relevance > 0.3`, ordered by
/// descending selection metric `0.6*role_relevance + 0.4*weight` (spec §4.F).
pub fn eligible_role_skills(skill_weights: &[SkillWeight]) -> Vec<&SkillWeight> {
    let mut eligible: Vec<&SkillWeight> = skill_weights.iter().filter(|w| w.role_relevance > 0.3).collect();
    eligible.sort_by(|a, b| {
        let metric_a = 0.6 * a.role_relevance + 0.4 * a.weight;
        let metric_b = 0.6 * b.role_relevance + 0.4 * b.weight;
        metric_b.partial_cmp(&metric_a).unwrap_or(std::cmp::Ordering::Equal)
    });
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_core::model::{ResumeProject, ResumeSkill, SessionConfig};

    fn base_session() -> Session {
        Session::new(
            "candidate-1",
            SessionConfig { role: "backend-developer".into(), duration_minutes: 30, max_questions: 15, experience_level: None },
            ResumeSnapshot::default(),
            5,
        )
    }

    #[test]
    fn introduction_budget_is_one() {
        let mut s = base_session();
        assert!(!phase_exhausted(&s));
        s.phase_question_counts.insert("introduction".into(), 1);
        s.total_questions = 1;
        assert!(phase_exhausted(&s));
    }

    #[test]
    fn phase_sequence_terminates_at_role_skills() {
        assert_eq!(next_phase(&InterviewPhase::Introduction), Some(InterviewPhase::Projects));
        assert_eq!(next_phase(&InterviewPhase::RoleSkills), None);
    }

    #[test]
    fn time_cut_not_reached_before_start() {
        let s = base_session();
        assert!(!time_cut_reached(&s, chrono::Utc::now()));
    }

    #[test]
    fn project_selection_prefers_highest_overlap() {
        let mut resume = ResumeSnapshot::default();
        resume.projects.push(ResumeProject { name: "low".into(), description: "".into(), technologies: vec!["Go".into()] });
        resume.projects.push(ResumeProject {
            name: "high".into(),
            description: "".into(),
            technologies: vec!["Python".into(), "React".into()],
        });
        let covered: HashSet<String> = ["Python", "React"].iter().map(|s| s.to_string()).collect();
        let asked = HashSet::new();
        assert_eq!(next_project(&resume, &covered, &asked), Some("high"));
    }

    #[test]
    fn standout_skills_prefer_direct_experience() {
        let mut resume = ResumeSnapshot::default();
        resume.skills.push(ResumeSkill { name: "Python".into(), years: 3.0, project_refs: vec![] });
        resume.skills.push(ResumeSkill { name: "Rust".into(), years: 0.0, project_refs: vec![] });
        let weights = vec![];
        let standout = standout_skills(&resume, &weights);
        assert_eq!(standout, vec!["Python"]);
    }

    #[test]
    fn role_skill_cap_never_exceeds_two() {
        assert_eq!(role_skill_question_cap(1.0), 2);
        assert_eq!(role_skill_question_cap(0.1), 1);
    }

    #[test]
    fn eligible_skills_filter_low_relevance() {
        let weights = vec![
            SkillWeight::new("Python", 0.8, 0.5, 0.5),
            SkillWeight::new("Rare", 0.1, 0.0, 0.0),
        ];
        let eligible = eligible_role_skills(&weights);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].skill, "Python");
    }
}
