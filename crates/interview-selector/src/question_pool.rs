//! Vetted question pool for common skills (spec §4.F "pool" source),
//! avoiding an LLM round-trip for frequently-asked topics.

use rand::seq::SliceRandom;
use std::collections::HashMap;

struct SkillPool {
    /// difficulty band (3=intermediate/4=advanced/5=expert) -> questions
    by_difficulty: HashMap<u8, &'static [&'static str]>,
}

fn pool() -> HashMap<&'static str, SkillPool> {
    let mut m = HashMap::new();
    m.insert("Java", SkillPool { by_difficulty: HashMap::from([
        (2u8, &[
            "How would you handle memory leaks in a long-running Java application?",
            "Explain the difference between ConcurrentHashMap and Hashtable, and when would you use each?",
            "How does the JVM garbage collector work, and what are the trade-offs between different GC algorithms?",
            "Describe how you would implement a thread-safe singleton pattern in Java.",
            "What are the best practices for handling exceptions in a REST API service?",
        ][..]),
        (3u8, &[
            "How would you design a distributed caching system using Java?",
            "Explain how Java's classloader mechanism works and its implications for memory management.",
            "How would you optimize a Java application that's experiencing high latency under load?",
            "Describe the internals of Java's concurrent collections and how they achieve thread safety.",
            "How would you implement a custom annotation processor in Java?",
        ][..]),
    ]) });
    m.insert("Python", SkillPool { by_difficulty: HashMap::from([
        (2u8, &[
            "How would you handle memory management in a Python application processing large datasets?",
            "Explain the Global Interpreter Lock (GIL) and its impact on multi-threading in Python.",
            "What are the differences between multiprocessing and multithreading in Python, and when would you use each?",
            "How would you implement a decorator that caches function results with TTL?",
            "Explain Python's method resolution order (MRO) and how it affects inheritance.",
        ][..]),
        (3u8, &[
            "How would you design an async task queue system in Python?",
            "Explain how Python's memory management works and how to profile memory usage.",
            "How would you implement a custom context manager for resource management?",
            "Describe how you would optimize a Python application for performance at scale.",
            "How would you implement a custom metaclass in Python?",
        ][..]),
    ]) });
    m.insert("React", SkillPool { by_difficulty: HashMap::from([
        (2u8, &[
            "How would you optimize a React application that's experiencing performance issues?",
            "Explain the differences between React hooks and class components, and when to use each.",
            "How would you manage state in a large React application with multiple components?",
            "Describe how React's reconciliation algorithm works and its performance implications.",
            "How would you implement a custom hook for data fetching with error handling and caching?",
        ][..]),
        (3u8, &[
            "How would you design a state management solution for a complex React application?",
            "Explain React's concurrent features and how they improve user experience.",
            "How would you implement server-side rendering (SSR) in a React application?",
            "Describe how you would optimize a React application's bundle size and loading performance.",
            "How would you implement a custom renderer for React?",
        ][..]),
    ]) });
    m.insert("JavaScript", SkillPool { by_difficulty: HashMap::from([
        (2u8, &[
            "How would you handle asynchronous operations in JavaScript, and what are the trade-offs?",
            "Explain JavaScript's event loop and how it handles promises and callbacks.",
            "How would you implement a debounce function and when would you use it?",
            "Describe JavaScript's prototype chain and how it differs from classical inheritance.",
            "How would you handle memory leaks in a JavaScript application?",
        ][..]),
        (3u8, &[
            "How would you design a module system for a large JavaScript application?",
            "Explain JavaScript's memory model and how garbage collection works.",
            "How would you implement a custom promise library in JavaScript?",
            "Describe how you would optimize a JavaScript application's runtime performance.",
            "How would you implement a custom JavaScript engine feature?",
        ][..]),
    ]) });
    m.insert("Database", SkillPool { by_difficulty: HashMap::from([
        (2u8, &[
            "How would you optimize a slow database query in a production environment?",
            "Explain the differences between different database isolation levels and when to use each.",
            "How would you design a database schema for a high-traffic application?",
            "Describe how database indexes work and their impact on query performance.",
            "How would you handle database migrations in a zero-downtime deployment?",
        ][..]),
        (3u8, &[
            "How would you design a distributed database system for global scale?",
            "Explain database replication strategies and their trade-offs.",
            "How would you implement database sharding for horizontal scaling?",
            "Describe how you would optimize a database for both read and write performance.",
            "How would you design a database system that handles both OLTP and OLAP workloads?",
        ][..]),
    ]) });
    m.insert("System Design", SkillPool { by_difficulty: HashMap::from([
        (3u8, &[
            "How would you design a URL shortener service like bit.ly that handles millions of requests?",
            "Design a real-time chat system that supports millions of concurrent users.",
            "How would you design a distributed file storage system like Google Drive?",
            "Design a recommendation system for an e-commerce platform.",
            "How would you design a search engine that indexes billions of documents?",
        ][..]),
        (4u8, &[
            "Design a global content delivery network (CDN) with minimal latency.",
            "How would you design a distributed transaction system across multiple services?",
            "Design a system that handles real-time analytics for billions of events.",
            "How would you design a system that ensures data consistency across distributed systems?",
            "Design a system that handles both batch and stream processing at scale.",
        ][..]),
    ]) });
    m
}

pub fn is_common_skill(skill: &str) -> bool {
    pool().contains_key(skill)
}

/// Pick an unused question at `difficulty`, falling back to an adjacent band
/// (basic→intermediate, expert→advanced) when the exact band is exhausted.
pub fn question_from_pool(skill: &str, difficulty: u8, used: &[String]) -> Option<String> {
    let pools = pool();
    let skill_pool = pools.get(skill)?;

    let pick = |band: u8, pools: &SkillPool| -> Option<String> {
        let candidates = pools.by_difficulty.get(&band)?;
        let available: Vec<&&str> = candidates.iter().filter(|q| !used.iter().any(|u| u == *q)).collect();
        available.choose(&mut rand::thread_rng()).map(|s| s.to_string())
    };

    if let Some(q) = pick(difficulty, skill_pool) {
        return Some(q);
    }
    if difficulty <= 1 {
        return pick(2, skill_pool);
    }
    if difficulty >= 5 {
        return pick(3, skill_pool);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_skill_recognized() {
        assert!(is_common_skill("Python"));
        assert!(!is_common_skill("COBOL"));
    }

    #[test]
    fn returns_question_avoiding_used_list() {
        let first = question_from_pool("Python", 2, &[]).unwrap();
        let used = vec![first.clone()];
        for _ in 0..20 {
            if let Some(next) = question_from_pool("Python", 2, &used) {
                assert_ne!(next, first);
                return;
            }
        }
    }

    #[test]
    fn unknown_skill_returns_none() {
        assert!(question_from_pool("COBOL", 2, &[]).is_none());
    }
}
