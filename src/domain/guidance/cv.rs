//! CV gap scoring against a role profile.
//!
//! Stateless per upload: only the CV text and an optional target role
//! count, never the conversation's slots.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::response::{CvDashboard, CvScore, SkillGap};
use crate::domain::foundation::{Language, Percentage};
use crate::domain::taxonomy::{RoleProfile, SkillId, SkillTaxonomy};

pub struct CvScorer {
    taxonomy: Arc<SkillTaxonomy>,
}

impl CvScorer {
    pub fn new(taxonomy: Arc<SkillTaxonomy>) -> Self {
        Self { taxonomy }
    }

    /// Picks the role to score against: the requested one, else one the CV
    /// names, else the role the CV covers best (ties by id).
    pub fn select_role(&self, cv_text: &str, target_role: Option<&str>) -> Option<&RoleProfile> {
        if let Some(role) = target_role.and_then(|t| self.lookup(t)) {
            return Some(role);
        }
        if let Some(role) = self.taxonomy.find_role(cv_text) {
            return Some(role);
        }
        let found: BTreeSet<SkillId> = self.taxonomy.skills_in(cv_text).into_iter().collect();
        let mut best: Option<(&RoleProfile, f32)> = None;
        for role in self.taxonomy.roles() {
            let total = role.total_weight();
            if total <= 0.0 {
                continue;
            }
            let matched: f32 = role
                .skills
                .iter()
                .filter(|s| found.contains(&s.skill))
                .map(|s| s.weight)
                .sum();
            let coverage = matched / total;
            if best.map_or(true, |(_, b)| coverage > b) {
                best = Some((role, coverage));
            }
        }
        best.map(|(role, _)| role)
    }

    /// Scores the CV. `None` when the taxonomy has no roles.
    pub fn assess(&self, cv_text: &str, target_role: Option<&str>, language: Language) -> Option<CvDashboard> {
        let role = self.select_role(cv_text, target_role)?;
        let found: BTreeSet<SkillId> = self.taxonomy.skills_in(cv_text).into_iter().collect();

        let mut matched = Vec::new();
        let mut missing = Vec::new();
        for weighted in &role.skills {
            let gap = SkillGap {
                skill: weighted.skill.clone(),
                name: self
                    .taxonomy
                    .skill(&weighted.skill)
                    .map(|t| t.name.get(language).to_string())
                    .unwrap_or_else(|| weighted.skill.to_string()),
                weight: weighted.weight,
            };
            if found.contains(&weighted.skill) {
                matched.push(gap);
            } else {
                missing.push(gap);
            }
        }
        // Stable: equal weights keep the role's own order.
        missing.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        let matched_weight: f32 = matched.iter().map(|g| g.weight).sum();
        let score = Percentage::from_ratio(f64::from(matched_weight), f64::from(role.total_weight()));

        Some(CvDashboard {
            role: role.id.clone(),
            role_name: role.name.get(language).to_string(),
            score: CvScore { skills: score },
            matched,
            missing,
        })
    }

    fn lookup(&self, target: &str) -> Option<&RoleProfile> {
        self.taxonomy
            .roles()
            .find(|r| r.id.as_str() == target.trim())
            .or_else(|| self.taxonomy.find_role(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAXONOMY: &str = r#"
domains:
  - id: data_ai
    name: { en: Data & AI, ar: البيانات }
    categories: [Data Science]
  - id: design
    name: { en: Design, ar: التصميم }
    categories: [Design]
skills:
  - { id: sql, name: { en: SQL, ar: اس كيو ال }, domain: data_ai }
  - { id: python, name: { en: Python, ar: بايثون }, domain: data_ai }
  - { id: excel, name: { en: Excel, ar: اكسل }, domain: data_ai }
  - { id: power_bi, name: { en: Power BI, ar: باور بي اي }, domain: data_ai }
  - { id: figma, name: { en: Figma, ar: فيجما }, domain: design }
roles:
  - id: data_analyst
    name: { en: Data Analyst, ar: محلل بيانات }
    domain: data_ai
    skills:
      - { skill: sql, weight: 3 }
      - { skill: python, weight: 2 }
      - { skill: excel, weight: 1 }
      - { skill: power_bi, weight: 2 }
  - id: ui_designer
    name: { en: UI Designer, ar: مصمم واجهات }
    domain: design
    skills:
      - { skill: figma, weight: 1 }
"#;

    fn scorer() -> CvScorer {
        CvScorer::new(Arc::new(SkillTaxonomy::from_yaml_str(TAXONOMY).unwrap()))
    }

    #[test]
    fn weighted_score_and_ordered_gaps() {
        let dashboard = scorer()
            .assess("Built reports in Excel and SQL", Some("data_analyst"), Language::En)
            .unwrap();
        // (3 + 1) / 8
        assert_eq!(dashboard.score.skills.value(), 50);
        let missing: Vec<&str> = dashboard.missing.iter().map(|g| g.skill.as_str()).collect();
        assert_eq!(missing, vec!["python", "power_bi"]);
        assert_eq!(dashboard.matched.len(), 2);
    }

    #[test]
    fn role_named_in_cv_is_used() {
        let dashboard = scorer()
            .assess("Junior UI designer, some SQL", None, Language::En)
            .unwrap();
        assert_eq!(dashboard.role.as_str(), "ui_designer");
        assert_eq!(dashboard.score.skills, Percentage::ZERO);
    }

    #[test]
    fn best_coverage_role_when_none_named() {
        let dashboard = scorer().assess("Figma prototypes", None, Language::Ar).unwrap();
        assert_eq!(dashboard.role.as_str(), "ui_designer");
        assert_eq!(dashboard.role_name, "مصمم واجهات");
        assert_eq!(dashboard.score.skills, Percentage::HUNDRED);
    }

    #[test]
    fn target_role_by_display_name() {
        let role = scorer().select_role("", Some("Data Analyst")).map(|r| r.id.clone());
        assert_eq!(role.map(|r| r.to_string()), Some("data_analyst".to_string()));
    }
}
