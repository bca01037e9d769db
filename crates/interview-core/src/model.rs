//! Session, Question, Evaluation and related types (spec §3).
//!
//! Timestamps are RFC3339 strings on every field in this module, in both
//! the hot and cold persistence tiers (§9 Open Question, resolved in
//! DESIGN.md).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Server-chosen opaque session identifier. UUIDv7 so ids sort by creation
/// time, matching the teacher's convention for user/session ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Executive,
}

impl ExperienceLevel {
    /// Years-of-experience threshold the spec uses for senior/executive gating (§4.F).
    pub fn is_senior_or_above(&self) -> bool {
        matches!(self, ExperienceLevel::Senior | ExperienceLevel::Executive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    Introduction,
    Projects,
    StandoutSkills,
    RoleSkills,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    AiSpeaking,
    UserSpeaking,
    AiThinking,
    UserWaiting,
    InterviewComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Conceptual,
    Practical,
    Coding,
    SystemDesign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Pool,
    Dynamic,
    DynamicProject,
    Coding,
}

/// Résumé skill entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeSkill {
    pub name: String,
    pub years: f64,
    #[serde(default)]
    pub project_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeProject {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeExperience {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub skills_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeEducation {
    pub institution: String,
    pub degree: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeSnapshot {
    #[serde(default)]
    pub skills: Vec<ResumeSkill>,
    #[serde(default)]
    pub projects: Vec<ResumeProject>,
    #[serde(default)]
    pub experience: Vec<ResumeExperience>,
    #[serde(default)]
    pub education: Vec<ResumeEducation>,
}

/// skill_weight = 0.5*role_relevance + 0.3*resume_experience + 0.2*project_count (§3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillWeight {
    pub skill: String,
    pub weight: f64,
    pub role_relevance: f64,
    pub resume_experience: f64,
    pub project_count: f64,
}

impl SkillWeight {
    pub fn new(skill: impl Into<String>, role_relevance: f64, resume_experience: f64, project_count: f64) -> Self {
        let weight = 0.5 * role_relevance + 0.3 * resume_experience + 0.2 * project_count;
        Self {
            skill: skill.into(),
            weight,
            role_relevance,
            resume_experience,
            project_count,
        }
    }
}

/// Per-turn question context bag (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionContext {
    pub phase: Option<InterviewPhase>,
    pub source: Option<QuestionSource>,
    /// Short spoken summary overriding `prompt` for TTS (coding questions).
    pub tts_text: Option<String>,
    pub project_name: Option<String>,
    /// Set on project deep-dive follow-ups.
    pub question_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub skill: String,
    pub difficulty: u8,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub context: QuestionContext,
}

impl Question {
    pub fn new(prompt: impl Into<String>, skill: impl Into<String>, difficulty: u8, question_type: QuestionType) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            prompt: prompt.into(),
            skill: skill.into(),
            difficulty,
            question_type,
            context: QuestionContext::default(),
        }
    }

    /// Text to speak: the TTS override for long coding prompts, else the full prompt.
    pub fn speakable_text(&self) -> &str {
        self.context.tts_text.as_deref().unwrap_or(&self.prompt)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub sub_scores: HashMap<String, f64>,
    pub next_difficulty: u8,
}

impl Evaluation {
    /// Deterministic fallback used when the LLM call fails or returns
    /// unparseable JSON (spec §4.G): score 0.5, generic feedback, unchanged
    /// difficulty so the turn can still advance.
    pub fn fallback(current_difficulty: u8) -> Self {
        Self {
            score: 0.5,
            feedback: "We were unable to fully evaluate this answer, but let's continue.".to_string(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            suggestions: Vec::new(),
            sub_scores: HashMap::new(),
            next_difficulty: current_difficulty,
        }
    }
}

/// One entry of the bounded sliding conversation window (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: Question,
    pub answer_text: String,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub role: String,
    pub duration_minutes: i64,
    pub max_questions: u32,
    pub experience_level: Option<ExperienceLevel>,
}

/// The authoritative per-interview record (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub candidate_id: String,
    pub config: SessionConfig,
    pub resume: ResumeSnapshot,
    pub skill_weights: Vec<SkillWeight>,

    pub phase: InterviewPhase,
    pub phase_question_counts: HashMap<String, u32>,
    pub total_questions: u32,
    pub difficulty: u8,

    pub current_question: Option<Question>,
    pub current_skill: Option<String>,
    pub current_project: Option<String>,

    pub asked_questions: Vec<Question>,
    pub answered_skills: HashMap<String, Vec<Evaluation>>,
    pub answered_projects: HashMap<String, Vec<Evaluation>>,
    pub conversation_window: Vec<ConversationTurn>,

    pub flow_state: FlowState,
    pub status: InterviewStatus,

    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub report_id: Option<String>,

    /// Maximum entries retained in `conversation_window` (§3 invariant).
    pub window_capacity: usize,
}

impl Session {
    pub fn new(candidate_id: impl Into<String>, config: SessionConfig, resume: ResumeSnapshot, window_capacity: usize) -> Self {
        Self {
            id: SessionId::new(),
            candidate_id: candidate_id.into(),
            config,
            resume,
            skill_weights: Vec::new(),
            phase: InterviewPhase::Introduction,
            phase_question_counts: HashMap::new(),
            total_questions: 0,
            difficulty: 1,
            current_question: None,
            current_skill: None,
            current_project: None,
            asked_questions: Vec::new(),
            answered_skills: HashMap::new(),
            answered_projects: HashMap::new(),
            conversation_window: Vec::new(),
            flow_state: FlowState::UserWaiting,
            status: InterviewStatus::NotStarted,
            started_at: None,
            completed_at: None,
            report_id: None,
            window_capacity,
        }
    }

    pub fn mark_started(&mut self) {
        self.status = InterviewStatus::InProgress;
        self.started_at = Some(now_rfc3339());
    }

    pub fn mark_completed(&mut self) {
        self.status = InterviewStatus::Completed;
        self.flow_state = FlowState::InterviewComplete;
        self.completed_at = Some(now_rfc3339());
        self.current_question = None;
    }

    /// Set a new current question. Panics in debug builds if the prior
    /// question was never appended to history (§3 invariant) — callers must
    /// call `append_to_history` first.
    pub fn set_current_question(&mut self, question: Question) {
        debug_assert!(
            self.current_question.is_none()
                || self.asked_questions.last().map(|q| q.id == self.current_question.as_ref().unwrap().id).unwrap_or(false),
            "replacing a current_question that was never appended to history"
        );
        self.current_skill = Some(question.skill.clone());
        self.current_project = question.context.project_name.clone();
        self.current_question = Some(question);
    }

    /// Append the just-answered question + evaluation to history and the
    /// sliding window, evicting the oldest entry if the window is full.
    pub fn append_turn(&mut self, question: Question, answer_text: String, evaluation: Evaluation) {
        if let Some(project) = question.context.project_name.clone() {
            self.answered_projects.entry(project).or_default().push(evaluation.clone());
        }
        self.answered_skills.entry(question.skill.clone()).or_default().push(evaluation.clone());

        let phase_key = phase_key(&question.context.phase.clone().unwrap_or(self.phase.clone()));
        *self.phase_question_counts.entry(phase_key).or_insert(0) += 1;
        self.total_questions += 1;

        self.asked_questions.push(question.clone());

        self.conversation_window.push(ConversationTurn { question, answer_text, evaluation });
        while self.conversation_window.len() > self.window_capacity {
            self.conversation_window.remove(0);
        }
    }

    /// Evaluations for a skill, most recent last.
    pub fn evaluations_for_skill(&self, skill: &str) -> &[Evaluation] {
        self.answered_skills.get(skill).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn phase_count(&self, phase: &InterviewPhase) -> u32 {
        *self.phase_question_counts.get(&phase_key(phase)).unwrap_or(&0)
    }

    /// §3 invariant check, used by tests.
    pub fn invariants_hold(&self) -> bool {
        let sum_phases: u32 = self.phase_question_counts.values().sum();
        self.total_questions == self.asked_questions.len() as u32
            && self.total_questions == sum_phases
            && self.conversation_window.len() <= self.window_capacity
    }
}

pub fn phase_key(phase: &InterviewPhase) -> String {
    match phase {
        InterviewPhase::Introduction => "introduction",
        InterviewPhase::Projects => "projects",
        InterviewPhase::StandoutSkills => "standout_skills",
        InterviewPhase::RoleSkills => "role_skills",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_session() -> Session {
        Session::new(
            "candidate-1",
            SessionConfig { role: "backend-developer".into(), duration_minutes: 30, max_questions: 15, experience_level: None },
            ResumeSnapshot::default(),
            5,
        )
    }

    #[test]
    fn append_turn_keeps_counters_consistent() {
        let mut s = base_session();
        for i in 0..7 {
            let q = Question::new(format!("q{i}"), "Python", 1, QuestionType::Conceptual);
            s.append_turn(q, "answer".into(), Evaluation::fallback(1));
        }
        assert!(s.invariants_hold());
        assert_eq!(s.conversation_window.len(), 5);
        assert_eq!(s.total_questions, 7);
    }

    #[test]
    fn skill_weight_formula() {
        let w = SkillWeight::new("Python", 0.8, 0.5, 1.0);
        assert!((w.weight - (0.5 * 0.8 + 0.3 * 0.5 + 0.2 * 1.0)).abs() < 1e-9);
    }
}
