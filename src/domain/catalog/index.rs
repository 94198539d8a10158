//! In-memory catalog index: title, category, skill and vector lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::course::{CourseId, CourseRecord};
use super::embedding::{cosine_similarity, Embedder, Embedding};
use crate::domain::foundation::text::{contains_phrase, fold, is_stopword, strip_article, tokens};
use crate::domain::taxonomy::{SkillId, SkillTaxonomy};

/// Vector lookup failures. Callers degrade to the other strategies.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VectorLookupError {
    #[error("query has no searchable terms")]
    EmptyQuery,

    #[error("query has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Read-only lookup structure over one catalog snapshot.
///
/// Positions (`usize`) refer to the order courses were loaded in and are
/// stable for the lifetime of the index.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    courses: Vec<CourseRecord>,
    by_id: HashMap<CourseId, usize>,
    titles: Vec<String>,
    categories: BTreeMap<String, Vec<usize>>,
    skills: Vec<BTreeSet<SkillId>>,
    by_skill: BTreeMap<SkillId, Vec<usize>>,
    embedder: Embedder,
    vectors: Vec<Embedding>,
}

impl CatalogIndex {
    /// Indexes the courses. Later records with an already-seen id are skipped.
    pub fn build(records: Vec<CourseRecord>, taxonomy: &SkillTaxonomy, embedder: Embedder) -> Self {
        let mut index = Self {
            courses: Vec::with_capacity(records.len()),
            by_id: HashMap::new(),
            titles: Vec::new(),
            categories: BTreeMap::new(),
            skills: Vec::new(),
            by_skill: BTreeMap::new(),
            embedder,
            vectors: Vec::new(),
        };

        for course in records {
            if index.by_id.contains_key(&course.id) {
                continue;
            }
            let position = index.courses.len();

            let mut skills: BTreeSet<SkillId> = course
                .skills
                .iter()
                .flat_map(|label| taxonomy.skills_in(label))
                .collect();
            skills.extend(taxonomy.skills_in(&course.title));
            for skill in &skills {
                index.by_skill.entry(skill.clone()).or_default().push(position);
            }

            index
                .categories
                .entry(fold(&course.category))
                .or_default()
                .push(position);
            index.titles.push(fold(&course.title));
            index.vectors.push(embedder.embed(&format!(
                "{} {} {}",
                course.title,
                course.description,
                course.skills.join(" ")
            )));
            index.skills.push(skills);
            index.by_id.insert(course.id.clone(), position);
            index.courses.push(course);
        }

        index
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn courses(&self) -> &[CourseRecord] {
        &self.courses
    }

    /// Course at a position returned by one of the lookups.
    pub fn course(&self, position: usize) -> Option<&CourseRecord> {
        self.courses.get(position)
    }

    pub fn get(&self, id: &CourseId) -> Option<&CourseRecord> {
        self.by_id.get(id).and_then(|p| self.courses.get(*p))
    }

    pub fn position(&self, id: &CourseId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Canonical skills the course teaches.
    pub fn skills_of(&self, position: usize) -> Option<&BTreeSet<SkillId>> {
        self.skills.get(position)
    }

    /// A title the message states exactly, quotes, or contains verbatim.
    ///
    /// Single-word titles only count when they are the whole message or
    /// quoted, otherwise every mention of a topic would look like a title.
    pub fn near_exact_title(&self, message: &str) -> Option<usize> {
        let folded = fold(message);
        if folded.is_empty() {
            return None;
        }
        if let Some(position) = self.titles.iter().position(|t| *t == folded) {
            return Some(position);
        }
        for quoted in quoted_segments(message) {
            let quoted = fold(&quoted);
            if let Some(position) = self.titles.iter().position(|t| *t == quoted) {
                return Some(position);
            }
        }
        self.titles
            .iter()
            .enumerate()
            .filter(|(_, title)| tokens(title).len() >= 2 && contains_phrase(&folded, title))
            .max_by(|(pa, a), (pb, b)| a.chars().count().cmp(&b.chars().count()).then(pb.cmp(pa)))
            .map(|(position, _)| position)
    }

    /// Best title by token overlap (Dice coefficient) at or above `threshold`.
    pub fn fuzzy_title(&self, message: &str, threshold: f32) -> Option<(usize, f32)> {
        let folded = fold(message);
        let query = content_tokens(&folded);
        if query.is_empty() {
            return None;
        }
        let mut best: Option<(usize, f32)> = None;
        for (position, title) in self.titles.iter().enumerate() {
            let title_tokens = content_tokens(title);
            if title_tokens.is_empty() {
                continue;
            }
            let score = dice(&title_tokens, &query);
            if score >= threshold && best.map_or(true, |(_, s)| score > s) {
                best = Some((position, score));
            }
        }
        best
    }

    /// Token overlap (Dice coefficient) between one title and `text`.
    /// Zero for an unknown position or text with no content words.
    pub fn title_similarity(&self, position: usize, text: &str) -> f32 {
        let Some(title) = self.titles.get(position) else {
            return 0.0;
        };
        let folded = fold(text);
        dice(&content_tokens(title), &content_tokens(&folded))
    }

    /// Titles mentioned verbatim anywhere in `text`.
    ///
    /// A title mentioned only as part of a longer mentioned title is not
    /// reported separately.
    pub fn mentioned_titles(&self, text: &str) -> Vec<usize> {
        let folded = fold(text);
        let text_tokens = tokens(&folded);
        let mut spans: Vec<(usize, usize, usize)> = Vec::new();

        for (position, title) in self.titles.iter().enumerate() {
            let title_tokens = tokens(title);
            if title_tokens.len() < 2 || title_tokens.len() > text_tokens.len() {
                continue;
            }
            for start in 0..=(text_tokens.len() - title_tokens.len()) {
                if text_tokens[start..start + title_tokens.len()] == title_tokens[..] {
                    spans.push((start, start + title_tokens.len(), position));
                }
            }
        }

        let mut found: Vec<usize> = spans
            .iter()
            .filter(|(s, e, _)| {
                !spans
                    .iter()
                    .any(|(os, oe, _)| os <= s && e <= oe && (oe - os) > (e - s))
            })
            .map(|(_, _, position)| *position)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Courses in any of the given categories, by position.
    pub fn in_categories(&self, categories: &[String]) -> Vec<usize> {
        let mut found: Vec<usize> = categories
            .iter()
            .filter_map(|c| self.categories.get(&fold(c)))
            .flatten()
            .copied()
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Courses teaching at least one requested skill, with the skills matched.
    pub fn with_any_skill(&self, wanted: &[SkillId]) -> Vec<(usize, Vec<SkillId>)> {
        let mut positions: Vec<usize> = wanted
            .iter()
            .filter_map(|s| self.by_skill.get(s))
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();

        positions
            .into_iter()
            .map(|position| {
                let taught = &self.skills[position];
                let matched = wanted.iter().filter(|s| taught.contains(*s)).cloned().collect();
                (position, matched)
            })
            .collect()
    }

    /// Courses whose title contains the folded keyword as a whole token.
    pub fn titles_with_keyword(&self, keyword: &str) -> Vec<usize> {
        self.titles
            .iter()
            .enumerate()
            .filter(|(_, title)| {
                tokens(title)
                    .into_iter()
                    .any(|t| t == keyword || strip_article(t) == Some(keyword))
            })
            .map(|(position, _)| position)
            .collect()
    }

    /// Nearest courses to `text` by cosine similarity.
    ///
    /// Results are ordered by similarity, then position, and only include
    /// courses at or above `min_similarity`.
    pub fn nearest(
        &self,
        text: &str,
        k: usize,
        min_similarity: f32,
    ) -> Result<Vec<(usize, f32)>, VectorLookupError> {
        let query = self.embedder.embed(text);
        self.nearest_to(&query, k, min_similarity)
    }

    pub fn nearest_to(
        &self,
        query: &Embedding,
        k: usize,
        min_similarity: f32,
    ) -> Result<Vec<(usize, f32)>, VectorLookupError> {
        if query.dims() != self.embedder.dims() {
            return Err(VectorLookupError::DimensionMismatch {
                expected: self.embedder.dims(),
                actual: query.dims(),
            });
        }
        if query.is_zero() {
            return Err(VectorLookupError::EmptyQuery);
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| (position, cosine_similarity(query.as_slice(), v.as_slice())))
            .filter(|(_, score)| *score >= min_similarity)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

fn dice(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    2.0 * a.intersection(b).count() as f32 / (a.len() + b.len()) as f32
}

fn content_tokens(folded: &str) -> BTreeSet<&str> {
    tokens(folded)
        .into_iter()
        .filter(|t| !is_stopword(t) && *t != "/")
        .collect()
}

/// Text between matching quote characters.
fn quoted_segments(message: &str) -> Vec<String> {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('“', '”'), ('«', '»'), ('\'', '\'')];
    let mut segments = Vec::new();
    for (open, close) in PAIRS {
        let mut rest = message;
        while let Some(start) = rest.find(open) {
            let after = &rest[start + open.len_utf8()..];
            match after.find(close) {
                Some(end) => {
                    let segment = after[..end].trim();
                    if !segment.is_empty() {
                        segments.push(segment.to_string());
                    }
                    rest = &after[end + close.len_utf8()..];
                }
                None => break,
            }
        }
    }
    segments
}
