//! Relevance guard: the last filter between retrieval and the user.
//!
//! Every candidate gets exactly one verdict. Accepted candidates keep their
//! retrieval order; rejected ones are kept with a reason so the turn can be
//! audited afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::retriever::{Provenance, RetrievalCandidate};
use crate::domain::catalog::{CatalogIndex, CourseId, CourseLevel};
use crate::domain::foundation::text::fold;
use crate::domain::taxonomy::{DomainId, SkillId, SkillTaxonomy};

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    DomainMismatch,
    LevelMismatch,
    /// A lexical or vector hit that shares no requested skill and sits
    /// outside the requested field.
    TokenCollision,
    Duplicate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::DomainMismatch => "domain_mismatch",
            RejectReason::LevelMismatch => "level_mismatch",
            RejectReason::TokenCollision => "token_collision",
            RejectReason::Duplicate => "duplicate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelevanceVerdict {
    Accept,
    Reject(RejectReason),
}

impl RelevanceVerdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, RelevanceVerdict::Accept)
    }
}

/// Guard policy tables, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct GuardPolicy {
    /// Domain id -> catalog categories that never belong to it.
    pub disjoint_domains: BTreeMap<DomainId, Vec<String>>,
    /// Drop Beginner courses when Advanced was requested.
    pub strict_level_filter: bool,
}

impl GuardPolicy {
    fn is_disjoint(&self, domain: &DomainId, category: &str) -> bool {
        let folded = fold(category);
        self.disjoint_domains
            .get(domain)
            .map(|cats| cats.iter().any(|c| fold(c) == folded))
            .unwrap_or(false)
    }
}

/// The resolved request a turn is guarded against.
#[derive(Debug, Clone, Default)]
pub struct GuardContext<'a> {
    pub domain: Option<&'a DomainId>,
    pub skills: &'a [SkillId],
    pub level: Option<CourseLevel>,
    /// Ids shown last turn, when that turn ran in the current flow.
    pub previously_shown: &'a [CourseId],
    pub wants_more: bool,
}

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardRecord {
    pub course_id: CourseId,
    pub verdict: RelevanceVerdict,
}

/// Verdicts for every input plus the accepted subset.
#[derive(Debug, Clone, Default)]
pub struct GuardOutcome {
    pub verdicts: Vec<GuardRecord>,
    pub accepted: Vec<RetrievalCandidate>,
}

impl GuardOutcome {
    pub fn accepted_ids(&self) -> Vec<CourseId> {
        self.accepted.iter().map(|c| c.course_id.clone()).collect()
    }

    pub fn rejected_count(&self) -> usize {
        self.verdicts.iter().filter(|v| !v.verdict.is_accept()).count()
    }

    /// True when candidates existed but none survived.
    pub fn exhausted(&self) -> bool {
        !self.verdicts.is_empty() && self.accepted.is_empty()
    }
}

pub struct RelevanceGuard {
    policy: GuardPolicy,
}

impl RelevanceGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Rules run in a fixed order; the first that fires decides.
    pub fn evaluate(
        &self,
        catalog: &CatalogIndex,
        taxonomy: &SkillTaxonomy,
        candidates: Vec<RetrievalCandidate>,
        context: &GuardContext<'_>,
    ) -> GuardOutcome {
        let mut seen: HashSet<CourseId> = HashSet::new();
        let mut outcome = GuardOutcome {
            verdicts: Vec::with_capacity(candidates.len()),
            accepted: Vec::new(),
        };

        for candidate in candidates {
            let verdict = self.judge(catalog, taxonomy, &candidate, context, &seen);
            seen.insert(candidate.course_id.clone());
            tracing::debug!(
                course_id = %candidate.course_id,
                provenance = ?candidate.provenance,
                verdict = ?verdict,
                "guard verdict"
            );
            outcome.verdicts.push(GuardRecord {
                course_id: candidate.course_id.clone(),
                verdict,
            });
            if verdict.is_accept() {
                outcome.accepted.push(candidate);
            }
        }
        outcome
    }

    fn judge(
        &self,
        catalog: &CatalogIndex,
        taxonomy: &SkillTaxonomy,
        candidate: &RetrievalCandidate,
        context: &GuardContext<'_>,
        seen: &HashSet<CourseId>,
    ) -> RelevanceVerdict {
        use RelevanceVerdict::{Accept, Reject};

        if seen.contains(&candidate.course_id)
            || (context.wants_more && context.previously_shown.contains(&candidate.course_id))
        {
            return Reject(RejectReason::Duplicate);
        }

        // A candidate the catalog no longer knows is never shown.
        let Some(course) = catalog.get(&candidate.course_id) else {
            return Reject(RejectReason::DomainMismatch);
        };

        if let Some(domain) = context.domain {
            if self.policy.is_disjoint(domain, &course.category) {
                return Reject(RejectReason::DomainMismatch);
            }
        }

        if matches!(candidate.provenance, Provenance::Lexical | Provenance::Vector) {
            let shares_skill = catalog
                .skills_of(candidate.position)
                .map(|taught| context.skills.iter().any(|s| taught.contains(s)))
                .unwrap_or(false);
            let in_field = match context.domain {
                Some(domain) => taxonomy.domain_covers_category(domain, &course.category),
                None => context.skills.is_empty() || skills_cover_category(taxonomy, context.skills, &course.category),
            };
            if !shares_skill && !in_field {
                return Reject(RejectReason::TokenCollision);
            }
        }

        // Only a relevant course can be off-level.
        if self.policy.strict_level_filter
            && context.level == Some(CourseLevel::Advanced)
            && course.level == CourseLevel::Beginner
        {
            return Reject(RejectReason::LevelMismatch);
        }

        Accept
    }
}

/// True when the category belongs to the domain of any requested skill.
fn skills_cover_category(taxonomy: &SkillTaxonomy, skills: &[SkillId], category: &str) -> bool {
    skills
        .iter()
        .filter_map(|s| taxonomy.skill(s))
        .any(|term| taxonomy.domain_covers_category(&term.domain, category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CourseRecord, Embedder};
    use proptest::prelude::*;

    const TAXONOMY: &str = r#"
domains:
  - id: programming
    name: { en: Programming, ar: البرمجة }
    categories: [Programming]
  - id: marketing
    name: { en: Marketing, ar: التسويق }
    categories: [Marketing]
skills:
  - id: java
    name: { en: Java, ar: جافا }
    domain: programming
  - id: javascript
    name: { en: JavaScript, ar: جافاسكريبت }
    domain: programming
  - id: seo
    name: { en: SEO, ar: سيو }
    domain: marketing
"#;

    fn course(id: &str, title: &str, category: &str, level: CourseLevel, skills: &[&str]) -> CourseRecord {
        CourseRecord {
            id: CourseId::new(id).unwrap(),
            title: title.into(),
            category: category.into(),
            level,
            duration_hours: Some(5.0),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            description: String::new(),
            instructor: "Staff".into(),
            cover: String::new(),
            published: None,
        }
    }

    fn fixture() -> (SkillTaxonomy, CatalogIndex) {
        let taxonomy = SkillTaxonomy::from_yaml_str(TAXONOMY).unwrap();
        let courses = vec![
            course("p1", "Java Fundamentals", "Programming", CourseLevel::Beginner, &["Java"]),
            course("p2", "Java Concurrency", "Programming", CourseLevel::Advanced, &["Java"]),
            course("m1", "Cold Brew Marketing", "Marketing", CourseLevel::Beginner, &["SEO"]),
            course("m2", "SEO Basics", "Marketing", CourseLevel::Beginner, &["SEO"]),
        ];
        let index = CatalogIndex::build(courses, &taxonomy, Embedder::new(64));
        (taxonomy, index)
    }

    fn candidate(index: &CatalogIndex, id: &str, provenance: Provenance) -> RetrievalCandidate {
        let course_id = CourseId::new(id).unwrap();
        RetrievalCandidate {
            position: index.position(&course_id).unwrap(),
            course_id,
            score: 1.0,
            provenance,
            matched_skills: Vec::new(),
            in_domain: true,
        }
    }

    fn policy() -> GuardPolicy {
        let mut disjoint = BTreeMap::new();
        disjoint.insert(DomainId::new("programming"), vec!["Marketing".to_string()]);
        GuardPolicy {
            disjoint_domains: disjoint,
            strict_level_filter: true,
        }
    }

    #[test]
    fn disjoint_category_is_rejected() {
        let (taxonomy, index) = fixture();
        let domain = DomainId::new("programming");
        let skills = vec![SkillId::new("java")];
        let context = GuardContext {
            domain: Some(&domain),
            skills: &skills,
            ..Default::default()
        };
        let outcome = RelevanceGuard::new(policy()).evaluate(
            &index,
            &taxonomy,
            vec![
                candidate(&index, "p1", Provenance::SkillExact),
                candidate(&index, "m1", Provenance::Lexical),
            ],
            &context,
        );
        assert_eq!(outcome.accepted_ids(), vec![CourseId::new("p1").unwrap()]);
        assert_eq!(outcome.verdicts[1].verdict, RelevanceVerdict::Reject(RejectReason::DomainMismatch));
    }

    #[test]
    fn lexical_collision_outside_field_is_rejected() {
        let (taxonomy, index) = fixture();
        let skills = vec![SkillId::new("java")];
        let context = GuardContext {
            skills: &skills,
            ..Default::default()
        };
        let outcome = RelevanceGuard::new(GuardPolicy::default()).evaluate(
            &index,
            &taxonomy,
            vec![candidate(&index, "m1", Provenance::Lexical)],
            &context,
        );
        assert_eq!(outcome.verdicts[0].verdict, RelevanceVerdict::Reject(RejectReason::TokenCollision));
        assert!(outcome.exhausted());
    }

    #[test]
    fn off_topic_beginner_course_is_a_collision_not_a_level_mismatch() {
        let (taxonomy, index) = fixture();
        let skills = vec![SkillId::new("java")];
        let context = GuardContext {
            skills: &skills,
            level: Some(CourseLevel::Advanced),
            ..Default::default()
        };
        let outcome = RelevanceGuard::new(policy()).evaluate(
            &index,
            &taxonomy,
            vec![
                candidate(&index, "m1", Provenance::Lexical),
                candidate(&index, "p1", Provenance::Lexical),
            ],
            &context,
        );
        assert_eq!(outcome.verdicts[0].verdict, RelevanceVerdict::Reject(RejectReason::TokenCollision));
        assert_eq!(outcome.verdicts[1].verdict, RelevanceVerdict::Reject(RejectReason::LevelMismatch));
    }

    #[test]
    fn advanced_request_drops_beginner_courses() {
        let (taxonomy, index) = fixture();
        let context = GuardContext {
            level: Some(CourseLevel::Advanced),
            ..Default::default()
        };
        let candidates = vec![
            candidate(&index, "p1", Provenance::SkillExact),
            candidate(&index, "p2", Provenance::SkillExact),
        ];
        let strict = RelevanceGuard::new(policy()).evaluate(&index, &taxonomy, candidates.clone(), &context);
        assert_eq!(strict.accepted_ids(), vec![CourseId::new("p2").unwrap()]);
        assert_eq!(strict.verdicts[0].verdict, RelevanceVerdict::Reject(RejectReason::LevelMismatch));

        let lenient = RelevanceGuard::new(GuardPolicy::default()).evaluate(&index, &taxonomy, candidates, &context);
        assert_eq!(lenient.accepted.len(), 2);
    }

    #[test]
    fn previously_shown_only_rejected_when_more_requested() {
        let (taxonomy, index) = fixture();
        let shown = vec![CourseId::new("p1").unwrap()];
        let mut context = GuardContext {
            previously_shown: &shown,
            ..Default::default()
        };
        let guard = RelevanceGuard::new(GuardPolicy::default());
        let candidates = vec![
            candidate(&index, "p1", Provenance::SkillExact),
            candidate(&index, "p2", Provenance::SkillExact),
        ];

        let repeat = guard.evaluate(&index, &taxonomy, candidates.clone(), &context);
        assert_eq!(repeat.accepted.len(), 2);

        context.wants_more = true;
        let more = guard.evaluate(&index, &taxonomy, candidates, &context);
        assert_eq!(more.accepted_ids(), vec![CourseId::new("p2").unwrap()]);
        assert_eq!(more.verdicts[0].verdict, RelevanceVerdict::Reject(RejectReason::Duplicate));
    }

    #[test]
    fn intra_turn_duplicates_are_rejected() {
        let (taxonomy, index) = fixture();
        let outcome = RelevanceGuard::new(GuardPolicy::default()).evaluate(
            &index,
            &taxonomy,
            vec![
                candidate(&index, "m2", Provenance::SkillExact),
                candidate(&index, "m2", Provenance::Vector),
            ],
            &GuardContext::default(),
        );
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejected_count(), 1);
    }

    #[test]
    fn verdict_serializes_with_reason() {
        let json = serde_json::to_string(&RelevanceVerdict::Reject(RejectReason::DomainMismatch)).unwrap();
        assert_eq!(json, r#"{"verdict":"REJECT","reason":"domain_mismatch"}"#);
    }

    proptest! {
        #[test]
        fn every_candidate_gets_exactly_one_verdict(
            picks in proptest::collection::vec((0usize..4, 0usize..5), 0..12),
            level in proptest::option::of(0usize..3),
            wants_more in any::<bool>(),
            with_domain in any::<bool>(),
        ) {
            let (taxonomy, index) = fixture();
            let ids = ["p1", "p2", "m1", "m2"];
            let provenances = [
                Provenance::Title,
                Provenance::SkillExact,
                Provenance::Category,
                Provenance::Lexical,
                Provenance::Vector,
            ];
            let candidates: Vec<RetrievalCandidate> = picks
                .iter()
                .map(|(i, p)| candidate(&index, ids[*i], provenances[*p]))
                .collect();
            let levels = [CourseLevel::Beginner, CourseLevel::Intermediate, CourseLevel::Advanced];
            let domain = DomainId::new("programming");
            let skills = vec![SkillId::new("java")];
            let shown = vec![CourseId::new("p2").unwrap()];
            let context = GuardContext {
                domain: with_domain.then_some(&domain),
                skills: &skills,
                level: level.map(|l| levels[l]),
                previously_shown: &shown,
                wants_more,
            };

            let outcome = RelevanceGuard::new(policy()).evaluate(&index, &taxonomy, candidates.clone(), &context);

            prop_assert_eq!(outcome.verdicts.len(), candidates.len());
            for (record, input) in outcome.verdicts.iter().zip(&candidates) {
                prop_assert_eq!(&record.course_id, &input.course_id);
            }
            let accepted = outcome.verdicts.iter().filter(|v| v.verdict.is_accept()).count();
            prop_assert_eq!(accepted, outcome.accepted.len());
        }
    }
}
