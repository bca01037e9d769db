//! Conversational framing between turns (spec §4.F). Grounded on the
//! original `conversational_framing.py::generate_conversational_transition`
//! (score-band feedback instructions, "no invented names" safety rule),
//! restated as an LLM prompt built here and issued by the caller through
//! `interview_providers::llm::LlmGateway` with `Task::ConversationalFraming`.

/// Score band the transition's tone depends on (spec §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Neutral,
    Elaborate,
    HonestNoIdea,
    BriefAcknowledge,
}

const NO_IDEA_PHRASES: &[&str] = &[
    "don't know", "no idea", "not sure", "haven't worked", "never used",
    "unfamiliar", "haven't tried", "idk", "not familiar", "don't have experience",
];

pub fn score_band(score: f64, answer_text: &str) -> ScoreBand {
    let lower = answer_text.to_lowercase();
    let admits_not_knowing = NO_IDEA_PHRASES.iter().any(|p| lower.contains(p));
    if score >= 0.75 {
        ScoreBand::Neutral
    } else if score >= 0.5 {
        ScoreBand::Elaborate
    } else if admits_not_knowing {
        ScoreBand::HonestNoIdea
    } else {
        ScoreBand::BriefAcknowledge
    }
}

/// Build the prompt for the LLM call that produces the transition text.
/// `candidate_name` is only referenced when explicitly supplied — the
/// instruction forbids the model from inventing one (spec §4.F).
pub fn framing_prompt(
    band: ScoreBand,
    last_skill: &str,
    next_skill: &str,
    candidate_name: Option<&str>,
) -> String {
    let feedback_instruction = match band {
        ScoreBand::Neutral => {
            "Acknowledge neutrally (e.g. 'I understand, let's move on'). Do NOT give positive praise."
        }
        ScoreBand::Elaborate => "Give one-line constructive feedback asking the candidate to elaborate more, then transition.",
        ScoreBand::HonestNoIdea => "Thank the candidate for their honesty and move to the next topic.",
        ScoreBand::BriefAcknowledge => "Briefly acknowledge the answer without being harsh, then move on.",
    };
    let name_instruction = match candidate_name {
        Some(name) => format!("You may address the candidate as \"{name}\" if natural, otherwise use \"you\"."),
        None => "Address the candidate as \"you\" — do NOT invent or use any personal name.".to_string(),
    };

    format!(
        "You are an experienced technical interviewer. Generate a natural, \
         conversational transition (1-2 sentences) before the next question.\n\n\
         Last topic: {last_skill}\nNext topic: {next_skill}\n\n\
         Feedback guideline: {feedback_instruction}\n{name_instruction}\n\
         Keep it brief. Do not include the actual next question. Output only the transition text."
    )
}

/// Deterministic fallback transition used when the LLM call fails (§4.G
/// failure handling applies the same "degrade, don't block" discipline here).
pub fn fallback_transition(next_skill: &str) -> String {
    format!("Let's talk about {next_skill}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_score_is_neutral_band() {
        assert_eq!(score_band(0.9, "it's a hash map"), ScoreBand::Neutral);
    }

    #[test]
    fn mid_score_asks_to_elaborate() {
        assert_eq!(score_band(0.6, "some explanation"), ScoreBand::Elaborate);
    }

    #[test]
    fn low_score_with_no_idea_phrase_is_honest_band() {
        assert_eq!(score_band(0.2, "I don't know"), ScoreBand::HonestNoIdea);
    }

    #[test]
    fn low_score_without_no_idea_phrase_is_brief_band() {
        assert_eq!(score_band(0.2, "it's some kind of data structure maybe"), ScoreBand::BriefAcknowledge);
    }

    #[test]
    fn prompt_never_invents_a_name_when_none_supplied() {
        let prompt = framing_prompt(ScoreBand::Neutral, "Python", "Java", None);
        assert!(prompt.contains("do NOT invent"));
    }
}
