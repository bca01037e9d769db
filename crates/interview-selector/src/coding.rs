//! Coding prompt generation (spec §4.F): a structured `{tts_summary,
//! full_question}` object, with a hard-coded fallback problem set per
//! difficulty for reliability. Grounded on the original
//! `question_generator.py::generate_coding_question` (same two-field JSON
//! shape, same "real LeetCode-style problems" fallback idea).

use interview_core::model::{Question, QuestionContext, QuestionSource, QuestionType};

pub struct CodingPrompt {
    pub tts_summary: String,
    pub full_question: String,
}

/// Build the LLM prompt asking for the structured coding-question object.
/// The caller issues this via `LlmGateway::generate` (Task::QuestionGeneration)
/// and parses the JSON response with `parse_coding_response`.
pub fn coding_generation_prompt(skill: &str, difficulty: u8, language: Option<&str>) -> String {
    let lang = language.unwrap_or("python");
    format!(
        "Generate one original coding interview problem for the skill \"{skill}\" at difficulty {difficulty} (1=easy .. 5=expert).\n\
         Respond with strict JSON only, no other text:\n\
         {{\n  \"tts_summary\": \"Two natural sentences describing the problem, safe to read aloud — no code symbols\",\n  \
         \"full_question\": \"Markdown problem spec: # Title, ## Problem Statement, ## Examples, ## Constraints, ## Function Signature (in {lang})\"\n}}"
    )
}

pub fn parse_coding_response(raw: &str) -> Option<CodingPrompt> {
    let v: serde_json::Value = serde_json::from_str(raw).ok()?;
    let tts_summary = v.get("tts_summary")?.as_str()?.to_string();
    let full_question = v.get("full_question")?.as_str()?.to_string();
    if tts_summary.is_empty() || full_question.is_empty() {
        return None;
    }
    Some(CodingPrompt { tts_summary, full_question })
}

/// Hard-coded fallback problems, grouped by difficulty band, used when the
/// LLM call fails or returns an unparseable response (spec §4.F).
fn fallback_problems(band: &str) -> &'static [(&'static str, &'static str)] {
    match band {
        "easy" => &[
            (
                "Please solve this coding question. Reverse a string in-place using only constant extra space.",
                "# Reverse String\n\n## Problem Statement\nWrite a function that reverses a string. The input string is given as an array of characters `s`. You must modify the input array in-place with O(1) extra memory.\n\n## Examples\n\n**Example 1:**\n```\nInput: s = [\"h\",\"e\",\"l\",\"l\",\"o\"]\nOutput: [\"o\",\"l\",\"l\",\"e\",\"h\"]\n```\n\n## Constraints\n- 1 <= s.length <= 10^5\n\n## Function Signature\n```python\ndef reverse_string(s: list[str]) -> None:\n    pass\n```",
            ),
            (
                "Please solve this coding question. Given an array of integers and a target value, find the indices of the two numbers that add up to it.",
                "# Two Sum\n\n## Problem Statement\nGiven an array of integers `nums` and an integer `target`, return the indices of the two numbers that add up to `target`. Each input has exactly one solution and you may not use the same element twice.\n\n## Examples\n\n**Example 1:**\n```\nInput: nums = [2,7,11,15], target = 9\nOutput: [0,1]\n```\n\n## Constraints\n- 2 <= nums.length <= 10^4\n\n## Function Signature\n```python\ndef two_sum(nums: list[int], target: int) -> list[int]:\n    pass\n```",
            ),
        ],
        "medium" => &[(
            "Please solve this coding question. Given a string containing brackets, determine if the brackets are balanced and correctly nested.",
            "# Valid Parentheses\n\n## Problem Statement\nGiven a string `s` containing just the characters '(', ')', '{', '}', '[' and ']', determine if the input string is valid: brackets must be closed by the same type and in the correct order.\n\n## Examples\n\n**Example 1:**\n```\nInput: s = \"()[]{}\"\nOutput: true\n```\n\n**Example 2:**\n```\nInput: s = \"(]\"\nOutput: false\n```\n\n## Constraints\n- 1 <= s.length <= 10^4\n\n## Function Signature\n```python\ndef is_valid(s: str) -> bool:\n    pass\n```",
        )],
        _ => &[(
            "Please solve this coding question. Given the root of a binary tree, find the length of the longest path between any two nodes.",
            "# Diameter of Binary Tree\n\n## Problem Statement\nGiven the root of a binary tree, return the length of the diameter: the length of the longest path between any two nodes, which may or may not pass through the root.\n\n## Examples\n\n**Example 1:**\n```\nInput: root = [1,2,3,4,5]\nOutput: 3\n```\n\n## Constraints\n- The number of nodes is in the range [1, 10^4]\n\n## Function Signature\n```python\ndef diameter_of_binary_tree(root: 'TreeNode') -> int:\n    pass\n```",
        )],
    }
}

fn band_for_difficulty(difficulty: u8) -> &'static str {
    match difficulty {
        1 | 2 => "easy",
        3 => "medium",
        _ => "hard",
    }
}

pub fn fallback_coding_prompt(difficulty: u8, used: &[String]) -> CodingPrompt {
    let band = band_for_difficulty(difficulty);
    let problems = fallback_problems(band);
    let pick = problems
        .iter()
        .find(|(tts, _)| !used.iter().any(|u| u == tts))
        .or_else(|| problems.first())
        .expect("fallback problem table is never empty");
    CodingPrompt { tts_summary: pick.0.to_string(), full_question: pick.1.to_string() }
}

/// Assemble the final `Question` for a coding turn, given either an
/// LLM-generated or fallback `CodingPrompt`.
pub fn build_coding_question(prompt: CodingPrompt, skill: &str, difficulty: u8) -> Question {
    let mut question = Question::new(prompt.full_question, skill, difficulty, QuestionType::Coding);
    question.context = QuestionContext {
        phase: None,
        source: Some(QuestionSource::Coding),
        tts_text: Some(prompt.tts_summary),
        project_name: None,
        question_type: None,
    };
    question
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let raw = r#"{"tts_summary":"Summary here.","full_question":"# Title\n..."}"#;
        let parsed = parse_coding_response(raw).unwrap();
        assert_eq!(parsed.tts_summary, "Summary here.");
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_coding_response(r#"{"tts_summary":"x"}"#).is_none());
    }

    #[test]
    fn fallback_avoids_repeating_used_problems() {
        let first = fallback_coding_prompt(1, &[]);
        let used = vec![first.tts_summary.clone()];
        let second = fallback_coding_prompt(1, &used);
        assert_ne!(first.tts_summary, second.tts_summary);
    }

    #[test]
    fn built_question_carries_tts_override() {
        let prompt = fallback_coding_prompt(3, &[]);
        let q = build_coding_question(prompt, "problem-solving", 3);
        assert!(q.context.tts_text.is_some());
        assert_eq!(q.speakable_text(), q.context.tts_text.as_deref().unwrap());
    }
}
