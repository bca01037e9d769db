//! `skill_weight = role_relevance*0.5 + resume_experience*0.3 + project_count*0.2` (spec §3).

use crate::role_skills::{relevance_for, role_skill_table};
use interview_core::model::{ResumeSnapshot, SkillWeight};
use std::collections::HashMap;

const MAX_YEARS_NORMALIZATION: f64 = 5.0;
const MAX_PROJECTS_NORMALIZATION: f64 = 5.0;

struct ResumeSkillStats {
    years: f64,
    projects: u32,
}

/// Derive every skill's weight from the résumé and the role's skill table.
/// Falls back to role-only weighting (no resume data) when the résumé has
/// no skills, projects, or experience entries at all.
pub fn calculate_skill_weights(role: &str, resume: &ResumeSnapshot) -> Vec<SkillWeight> {
    let table = role_skill_table();
    let role_set = table.get(role);

    let mut resume_skills: HashMap<String, ResumeSkillStats> = HashMap::new();
    for skill in &resume.skills {
        resume_skills.insert(skill.name.clone(), ResumeSkillStats { years: skill.years, projects: skill.project_refs.len() as u32 });
    }
    for project in &resume.projects {
        for tech in &project.technologies {
            resume_skills.entry(tech.clone()).or_insert(ResumeSkillStats { years: 0.0, projects: 0 }).projects += 1;
        }
    }
    for exp in &resume.experience {
        for skill in &exp.skills_used {
            resume_skills.entry(skill.clone()).or_insert(ResumeSkillStats { years: 0.0, projects: 0 }).years += 1.0;
        }
    }

    let mut weights: Vec<SkillWeight> = if resume_skills.is_empty() {
        let Some(set) = role_set else { return Vec::new() };
        let mut out = Vec::new();
        for (skill, relevance) in set.primary {
            out.push(SkillWeight::new(*skill, *relevance, 0.0, 0.0));
        }
        for (skill, relevance) in set.secondary {
            // Secondary skills are discounted by the role's primary/secondary split.
            let mut sw = SkillWeight::new(*skill, *relevance, 0.0, 0.0);
            sw.weight *= 1.0 - set.weight_ratio;
            out.push(sw);
        }
        out
    } else {
        resume_skills
            .into_iter()
            .map(|(skill, stats)| {
                let role_relevance = role_set.map(|set| relevance_for(set, &skill)).unwrap_or(0.1);
                let resume_experience = (stats.years / MAX_YEARS_NORMALIZATION).min(1.0);
                let project_count = (stats.projects as f64 / MAX_PROJECTS_NORMALIZATION).min(1.0);
                SkillWeight::new(skill, role_relevance, resume_experience, project_count)
            })
            .collect()
    };

    weights.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_core::model::{ResumeProject, ResumeSkill};

    #[test]
    fn empty_resume_falls_back_to_role_table() {
        let weights = calculate_skill_weights("backend-developer", &ResumeSnapshot::default());
        assert!(!weights.is_empty());
        assert!(weights.iter().any(|w| w.skill == "Java"));
    }

    #[test]
    fn resume_experience_raises_weight_over_role_only() {
        let mut resume = ResumeSnapshot::default();
        resume.skills.push(ResumeSkill { name: "Python".into(), years: 5.0, project_refs: vec!["a".into()] });
        resume.projects.push(ResumeProject { name: "a".into(), description: "".into(), technologies: vec!["Python".into()] });
        let weights = calculate_skill_weights("backend-developer", &resume);
        let python = weights.iter().find(|w| w.skill == "Python").unwrap();
        assert!(python.resume_experience > 0.0);
        assert!(python.project_count > 0.0);
    }
}
