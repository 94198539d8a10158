//! Hybrid retrieval over one catalog snapshot.
//!
//! Strategies run in priority order and their results are unioned, then
//! re-ranked: title match (course lookups only), skill-exact match, domain
//! categories, title keywords, and vector similarity as a filler. Nothing
//! here touches the network; the same snapshot and query always produce the
//! same ranked list.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::warn;

use super::intent::Intent;
use crate::domain::catalog::{CatalogIndex, CourseId};
use crate::domain::conversation::Slots;
use crate::domain::taxonomy::{DomainId, SkillId, SkillTaxonomy};

/// Dice similarity a title needs to count as a fuzzy title match.
pub const FUZZY_TITLE_THRESHOLD: f32 = 0.6;

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The message named the course title.
    Title,
    /// The course teaches a requested skill.
    SkillExact,
    /// The course sits in a category of the requested domain.
    Category,
    /// A message keyword appears in the title.
    Lexical,
    /// Nearest neighbour of the message embedding.
    Vector,
}

/// A course proposed for this turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    /// Position in the snapshot's index.
    pub position: usize,
    pub course_id: CourseId,
    pub score: f32,
    pub provenance: Provenance,
    pub matched_skills: Vec<SkillId>,
    /// Category belongs to the primary domain (true when no domain is set).
    pub in_domain: bool,
}

/// Retrieval tunables.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub search_cap: usize,
    pub guidance_cap: usize,
    pub min_skill_matches: usize,
    pub min_vector_similarity: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            search_cap: 10,
            guidance_cap: 8,
            min_skill_matches: 3,
            min_vector_similarity: 0.2,
        }
    }
}

/// Everything retrieval depends on.
#[derive(Debug, Clone)]
pub struct RetrievalQuery<'a> {
    pub intent: Intent,
    pub message: &'a str,
    pub domain: Option<&'a DomainId>,
    pub skills: &'a [SkillId],
    /// Unconsumed message words for title lookup.
    pub keywords: &'a [String],
}

impl<'a> RetrievalQuery<'a> {
    pub fn from_slots(intent: Intent, message: &'a str, slots: &'a Slots, keywords: &'a [String]) -> Self {
        Self {
            intent,
            message,
            domain: slots.domain.as_ref(),
            skills: &slots.skills,
            keywords,
        }
    }
}

pub struct Retriever {
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(settings: RetrievalSettings) -> Self {
        Self { settings }
    }

    /// Candidate cap for an intent.
    pub fn cap_for(&self, intent: Intent) -> usize {
        match intent {
            Intent::CareerGuidance | Intent::PlanRequest | Intent::ExplorationChoice => {
                self.settings.guidance_cap
            }
            _ => self.settings.search_cap,
        }
    }

    pub fn retrieve(
        &self,
        catalog: &CatalogIndex,
        taxonomy: &SkillTaxonomy,
        query: &RetrievalQuery<'_>,
    ) -> Vec<RetrievalCandidate> {
        if query.intent.is_title_lookup() {
            if let Some(hit) = self.title_match(catalog, taxonomy, query) {
                return vec![hit];
            }
        }

        let cap = self.cap_for(query.intent);
        let mut found: BTreeMap<usize, RetrievalCandidate> = BTreeMap::new();
        let in_domain = |position: usize| -> bool {
            match (query.domain, catalog.course(position)) {
                (Some(domain), Some(course)) => taxonomy.domain_covers_category(domain, &course.category),
                _ => true,
            }
        };

        // Skill-exact: score grows with the number of requested skills taught.
        for (position, matched) in catalog.with_any_skill(query.skills) {
            let Some(course) = catalog.course(position) else { continue };
            found.insert(
                position,
                RetrievalCandidate {
                    position,
                    course_id: course.id.clone(),
                    score: 1.0 + matched.len() as f32,
                    provenance: Provenance::SkillExact,
                    matched_skills: matched,
                    in_domain: in_domain(position),
                },
            );
        }
        let skill_hits = found.len();

        // A field with no focus skill: browse its categories.
        if query.skills.is_empty() {
            if let Some(domain) = query.domain.and_then(|d| taxonomy.domain(d)) {
                for position in catalog.in_categories(&domain.categories) {
                    let Some(course) = catalog.course(position) else { continue };
                    found.entry(position).or_insert_with(|| RetrievalCandidate {
                        position,
                        course_id: course.id.clone(),
                        score: 1.0,
                        provenance: Provenance::Category,
                        matched_skills: Vec::new(),
                        in_domain: true,
                    });
                }
            }
        }

        // Title keywords.
        let mut keyword_hits: BTreeMap<usize, usize> = BTreeMap::new();
        for keyword in query.keywords {
            for position in catalog.titles_with_keyword(keyword) {
                *keyword_hits.entry(position).or_default() += 1;
            }
        }
        for (position, hits) in keyword_hits {
            let Some(course) = catalog.course(position) else { continue };
            found.entry(position).or_insert_with(|| RetrievalCandidate {
                position,
                course_id: course.id.clone(),
                score: 1.0 + 0.25 * hits as f32,
                provenance: Provenance::Lexical,
                matched_skills: Vec::new(),
                in_domain: in_domain(position),
            });
        }

        // Vector fill when exact skill matches are thin.
        if skill_hits < self.settings.min_skill_matches && found.len() < cap {
            let text = self.vector_text(taxonomy, query);
            match catalog.nearest(&text, cap, self.settings.min_vector_similarity) {
                Ok(neighbours) => {
                    for (position, similarity) in neighbours {
                        let Some(course) = catalog.course(position) else { continue };
                        found.entry(position).or_insert_with(|| RetrievalCandidate {
                            position,
                            course_id: course.id.clone(),
                            score: similarity,
                            provenance: Provenance::Vector,
                            matched_skills: Vec::new(),
                            in_domain: in_domain(position),
                        });
                    }
                }
                Err(err) => {
                    warn!(error = %err, "vector lookup failed, continuing with exact matches");
                }
            }
        }

        let mut ranked: Vec<RetrievalCandidate> = found.into_values().collect();
        ranked.sort_by(|a, b| rank_order(catalog, a, b));
        ranked.truncate(cap);
        ranked
    }

    fn title_match(
        &self,
        catalog: &CatalogIndex,
        taxonomy: &SkillTaxonomy,
        query: &RetrievalQuery<'_>,
    ) -> Option<RetrievalCandidate> {
        let (position, score) = catalog
            .near_exact_title(query.message)
            .map(|p| (p, 1.0))
            .or_else(|| catalog.fuzzy_title(query.message, FUZZY_TITLE_THRESHOLD))?;
        let course = catalog.course(position)?;
        let matched_skills = catalog
            .skills_of(position)
            .map(|taught| query.skills.iter().filter(|s| taught.contains(*s)).cloned().collect())
            .unwrap_or_default();
        Some(RetrievalCandidate {
            position,
            course_id: course.id.clone(),
            score,
            provenance: Provenance::Title,
            matched_skills,
            in_domain: query
                .domain
                .map_or(true, |d| taxonomy.domain_covers_category(d, &course.category)),
        })
    }

    fn vector_text(&self, taxonomy: &SkillTaxonomy, query: &RetrievalQuery<'_>) -> String {
        let mut parts: Vec<String> = vec![query.message.to_string()];
        for skill in query.skills {
            if let Some(term) = taxonomy.skill(skill) {
                parts.push(term.name.en.clone());
            }
        }
        if let Some(domain) = query.domain.and_then(|d| taxonomy.domain(d)) {
            parts.push(domain.name.en.clone());
        }
        parts.join(" ")
    }
}

/// In-domain first, then score, recency, shorter duration, id.
fn rank_order(catalog: &CatalogIndex, a: &RetrievalCandidate, b: &RetrievalCandidate) -> Ordering {
    let (ca, cb) = (catalog.course(a.position), catalog.course(b.position));
    let published = |c: Option<&crate::domain::catalog::CourseRecord>| c.and_then(|c| c.published);
    let duration = |c: Option<&crate::domain::catalog::CourseRecord>| {
        c.and_then(|c| c.duration_hours).unwrap_or(f32::INFINITY)
    };

    b.in_domain
        .cmp(&a.in_domain)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| published(cb).cmp(&published(ca)))
        .then_with(|| duration(ca).total_cmp(&duration(cb)))
        .then_with(|| a.course_id.cmp(&b.course_id))
}
