pub mod report;
pub mod turn;

pub use report::{generate_report, InterviewReport};
pub use turn::{ingest_answer, select_initial_question, TurnOutcome};
