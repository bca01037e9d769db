//! Coding-question gating (spec §4.F). Grounded on the original
//! `phased_flow.py::should_ask_coding_question` (role-based percentage
//! targets, graduate vs. experienced split) generalized to the spec's
//! entry/mid/senior/executive bands, plus a stop-asking-coding rule the
//! spec adds on top (2+ sub-0.4 scores in the last 5 coding questions).

use interview_core::model::{Evaluation, ExperienceLevel, Question, QuestionType};

/// Named technologies treated as "not coding" targets by default (spec §4.F:
/// "a concrete string list is acceptable, with a conservative default of 'is
/// a recognised technology → not coding'"). Role/skill strings not in this
/// list default to coding-eligible, same as "problem-solving".
const RECOGNISED_TECHNOLOGIES: &[&str] = &[
    "java", "python", "javascript", "typescript", "react", "vue.js", "angular",
    "node.js", "django", "spring", "database", "sql", "mongodb", "redis",
    "graphql", "rest api", "docker", "kubernetes", "aws", "css", "html",
    "machine learning", "tensorflow", "pytorch", "scikit-learn", "pandas",
    "numpy", "r", "spark", "hadoop", "webpack", "jest", "git", "ci/cd",
    "testing", "cloud", "microservices", "system design",
];

/// Role keyword substrings that disable coding questions entirely, regardless
/// of experience level (spec §4.F). Keyword-matched, not a closed enum (spec
/// §9 Open Question / DESIGN.md decision 2) — unrecognised roles default to
/// "technical, coding allowed."
const NON_CODING_ROLE_KEYWORDS: &[&str] = &["product manager", "product-manager", "qa", "tester", "quality assurance"];

pub fn is_noncoding_role(role: &str) -> bool {
    let role_lower = role.to_lowercase();
    NON_CODING_ROLE_KEYWORDS.iter().any(|kw| role_lower.contains(kw))
}

/// A skill is a coding target iff it's "problem-solving" or not a recognised
/// named technology (spec §4.F condition a).
pub fn is_coding_eligible_skill(skill: &str) -> bool {
    let lower = skill.to_lowercase();
    lower == "problem-solving" || lower == "problem solving" || !RECOGNISED_TECHNOLOGIES.contains(&lower.as_str())
}

/// Target coding-question fraction by experience level (spec §4.F condition c):
/// entry ~55%, mid ~25%, senior/executive 0%. `None` (unspecified) is treated
/// like mid, a conservative middle ground.
fn target_coding_fraction(level: Option<&ExperienceLevel>) -> f64 {
    match level {
        Some(ExperienceLevel::Entry) => 0.55,
        Some(ExperienceLevel::Mid) | None => 0.25,
        Some(ExperienceLevel::Senior) | Some(ExperienceLevel::Executive) => 0.0,
    }
}

/// Candidate scored < 0.4 on 2+ of the last 5 coding questions: stop asking
/// coding questions for the remainder of the interview (spec §4.F).
pub fn struggling_on_coding(asked: &[Question], evaluations_by_question: &[(String, Evaluation)]) -> bool {
    let recent_coding_ids: Vec<&str> = asked
        .iter()
        .rev()
        .filter(|q| q.question_type == QuestionType::Coding)
        .take(5)
        .map(|q| q.id.as_str())
        .collect();
    if recent_coding_ids.is_empty() {
        return false;
    }
    let low_scores = evaluations_by_question
        .iter()
        .filter(|(qid, _)| recent_coding_ids.contains(&qid.as_str()))
        .filter(|(_, eval)| eval.score < 0.4)
        .count();
    low_scores >= 2
}

/// Whether the next question for `skill` should be a coding question
/// (spec §4.F, all three conditions plus the struggling-candidate override).
#[allow(clippy::too_many_arguments)]
pub fn should_ask_coding(
    skill: &str,
    role: &str,
    experience_level: Option<&ExperienceLevel>,
    coding_asked_so_far: u32,
    total_asked_so_far: u32,
    struggling: bool,
) -> bool {
    if struggling {
        return false;
    }
    if !is_coding_eligible_skill(skill) {
        return false;
    }
    if is_noncoding_role(role) {
        return false;
    }
    let target = target_coding_fraction(experience_level);
    if target <= 0.0 {
        return false;
    }
    if total_asked_so_far == 0 {
        return false;
    }
    let current_fraction = coding_asked_so_far as f64 / total_asked_so_far as f64;
    current_fraction < target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_manager_role_never_codes() {
        assert!(!should_ask_coding("problem-solving", "Product Manager", Some(&ExperienceLevel::Entry), 0, 3, false));
    }

    #[test]
    fn senior_role_never_codes_regardless_of_skill() {
        assert!(!should_ask_coding("problem-solving", "backend-developer", Some(&ExperienceLevel::Senior), 0, 3, false));
    }

    #[test]
    fn entry_level_targets_about_55_percent() {
        assert!(should_ask_coding("problem-solving", "backend-developer", Some(&ExperienceLevel::Entry), 0, 4, false));
        assert!(!should_ask_coding("problem-solving", "backend-developer", Some(&ExperienceLevel::Entry), 3, 4, false));
    }

    #[test]
    fn recognised_technology_is_not_coding_eligible() {
        assert!(!is_coding_eligible_skill("Java"));
        assert!(is_coding_eligible_skill("Quantum Computing"));
    }

    #[test]
    fn struggling_candidate_stops_coding_questions() {
        assert!(!should_ask_coding("problem-solving", "backend-developer", Some(&ExperienceLevel::Entry), 0, 4, true));
    }
}
