//! Hard-coded role → skill relevance fallback table, used when no dynamic
//! skill extraction is configured for a role (SPEC_FULL §B.1).

use std::collections::HashMap;

/// (skill, role_relevance) pairs for a role's primary and secondary skill sets.
pub struct RoleSkillSet {
    pub primary: &'static [(&'static str, f64)],
    pub secondary: &'static [(&'static str, f64)],
    /// Fraction of questions that should come from the primary set.
    pub weight_ratio: f64,
}

pub fn role_skill_table() -> HashMap<&'static str, RoleSkillSet> {
    let mut m = HashMap::new();
    m.insert(
        "backend-developer",
        RoleSkillSet {
            primary: &[
                ("Java", 0.9), ("Python", 0.9), ("Node.js", 0.8), ("Spring", 0.85),
                ("Django", 0.8), ("Database", 0.9), ("SQL", 0.85), ("REST API", 0.9),
                ("Microservices", 0.8), ("Docker", 0.7), ("Kubernetes", 0.7),
            ],
            secondary: &[
                ("React", 0.2), ("JavaScript", 0.5), ("TypeScript", 0.4),
                ("GraphQL", 0.6), ("Redis", 0.7), ("MongoDB", 0.6),
            ],
            weight_ratio: 0.8,
        },
    );
    m.insert(
        "frontend-developer",
        RoleSkillSet {
            primary: &[
                ("React", 0.9), ("JavaScript", 0.95), ("TypeScript", 0.9),
                ("CSS", 0.8), ("HTML", 0.8), ("Vue.js", 0.7), ("Angular", 0.7),
            ],
            secondary: &[
                ("Node.js", 0.5), ("Python", 0.3), ("GraphQL", 0.6),
                ("REST API", 0.5), ("Webpack", 0.6), ("Jest", 0.6),
            ],
            weight_ratio: 0.8,
        },
    );
    m.insert(
        "fullstack-developer",
        RoleSkillSet {
            primary: &[
                ("JavaScript", 0.9), ("React", 0.85), ("Node.js", 0.9),
                ("Python", 0.8), ("Database", 0.8), ("REST API", 0.9),
            ],
            secondary: &[
                ("Docker", 0.6), ("AWS", 0.5), ("GraphQL", 0.7),
                ("TypeScript", 0.7), ("MongoDB", 0.6), ("Redis", 0.6),
            ],
            weight_ratio: 0.7,
        },
    );
    m.insert(
        "data-scientist",
        RoleSkillSet {
            primary: &[
                ("Python", 0.95), ("Machine Learning", 0.9), ("SQL", 0.85),
                ("Data Analysis", 0.9), ("Pandas", 0.8), ("NumPy", 0.8),
                ("Scikit-learn", 0.8), ("TensorFlow", 0.7), ("PyTorch", 0.7),
            ],
            secondary: &[
                ("Java", 0.3), ("Cloud", 0.5), ("Statistics", 0.7),
                ("R", 0.6), ("Spark", 0.6), ("Hadoop", 0.5),
            ],
            weight_ratio: 0.85,
        },
    );
    m.insert(
        "software-engineer",
        RoleSkillSet {
            primary: &[
                ("Java", 0.8), ("Python", 0.8), ("JavaScript", 0.8),
                ("Database", 0.7), ("REST API", 0.8), ("System Design", 0.8),
            ],
            secondary: &[
                ("Docker", 0.6), ("Cloud", 0.5), ("Testing", 0.7),
                ("CI/CD", 0.6), ("Git", 0.7),
            ],
            weight_ratio: 0.75,
        },
    );
    m.insert(
        "product-manager",
        RoleSkillSet {
            primary: &[
                ("Product Management", 0.9), ("Agile", 0.8), ("Scrum", 0.8),
                ("User Research", 0.8), ("Analytics", 0.7), ("Strategy", 0.8),
            ],
            secondary: &[
                ("SQL", 0.5), ("Python", 0.3), ("JavaScript", 0.3),
                ("A/B Testing", 0.6), ("Data Analysis", 0.6),
            ],
            weight_ratio: 0.8,
        },
    );
    m
}

pub fn relevance_for(set: &RoleSkillSet, skill: &str) -> f64 {
    if let Some((_, r)) = set.primary.iter().find(|(s, _)| s.eq_ignore_ascii_case(skill)) {
        return *r;
    }
    if let Some((_, r)) = set.secondary.iter().find(|(s, _)| s.eq_ignore_ascii_case(skill)) {
        return *r;
    }
    0.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_role_ranks_java_above_react() {
        let table = role_skill_table();
        let backend = &table["backend-developer"];
        assert!(relevance_for(backend, "Java") > relevance_for(backend, "React"));
    }

    #[test]
    fn unknown_skill_gets_low_default_relevance() {
        let table = role_skill_table();
        let backend = &table["backend-developer"];
        assert_eq!(relevance_for(backend, "Quantum Computing"), 0.1);
    }
}
