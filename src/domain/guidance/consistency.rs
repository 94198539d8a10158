//! Post-draft grounding check.
//!
//! The drafter is told to mention only the guarded courses and to cite each
//! one as `[[Title]]`, but nothing forces it to. This pass re-reads the
//! draft against the same guarded set and reports every course name or
//! taxonomy skill it cannot back up:
//!
//! - catalog titles mentioned verbatim outside the guarded set;
//! - cited names that do not resolve to a guarded title;
//! - uncited name-like spans (capitalised runs) that resolve to a
//!   non-guarded title, or that read as a course name and resolve to none.
//!
//! Arabic has no capitalisation, so Arabic drafts are held to the verbatim
//! and citation checks only.

use std::collections::BTreeSet;

use super::retriever::FUZZY_TITLE_THRESHOLD;
use crate::domain::catalog::{CatalogIndex, CourseId};
use crate::domain::foundation::text::{fold, tokens};
use crate::domain::taxonomy::{SkillId, SkillTaxonomy};

/// Marker pair the drafter wraps course titles in.
pub const CITE_OPEN: &str = "[[";
pub const CITE_CLOSE: &str = "]]";

/// Words joining the parts of a title ("SQL for Data Analysis").
const CONNECTORS: &[&str] = &["for", "and", "of", "with", "to", "in", "the", "from", "&"];

/// Nouns that make a capitalised run read as a course or program name.
const COURSE_NOUNS: &[&str] = &[
    "course", "courses", "masterclass", "masterclasses", "bootcamp", "bootcamps", "workshop",
    "workshops", "program", "programme", "class", "certificate", "certification", "diploma",
    "academy", "nanodegree", "specialization", "fundamentals", "essentials", "basics", "guide",
    "tutorial", "training",
];

/// What a draft says that the turn cannot back up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsistencyReport {
    pub ungrounded_titles: Vec<String>,
    pub ungrounded_skills: Vec<SkillId>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.ungrounded_titles.is_empty() && self.ungrounded_skills.is_empty()
    }
}

pub struct ConsistencyChecker;

impl ConsistencyChecker {
    /// Checks `draft` against the guarded courses and the skills the user
    /// asked about.
    pub fn check(
        draft: &str,
        catalog: &CatalogIndex,
        taxonomy: &SkillTaxonomy,
        guarded: &[CourseId],
        requested_skills: &[SkillId],
    ) -> ConsistencyReport {
        let guarded_positions: BTreeSet<usize> =
            guarded.iter().filter_map(|id| catalog.position(id)).collect();

        let mut ungrounded_titles: Vec<String> = catalog
            .mentioned_titles(draft)
            .into_iter()
            .filter(|p| !guarded_positions.contains(p))
            .filter_map(|p| catalog.course(p).map(|c| c.title.clone()))
            .collect();

        let (cited, prose) = split_citations(draft);
        for name in cited {
            match resolve_name(name, catalog, &guarded_positions) {
                NameMatch::Guarded => {}
                NameMatch::Other(position) => push_title(&mut ungrounded_titles, catalog, position),
                NameMatch::Unknown => push_unique(&mut ungrounded_titles, name.trim()),
            }
        }

        let guarded_titles: Vec<Vec<String>> = guarded_positions
            .iter()
            .filter_map(|p| catalog.course(*p))
            .map(|c| tokens(&fold(&c.title)).into_iter().map(str::to_string).collect())
            .collect();
        for segment in prose {
            for span in name_spans(segment, &guarded_titles) {
                match resolve_name(&span.text, catalog, &guarded_positions) {
                    NameMatch::Guarded => {}
                    NameMatch::Other(position) => {
                        push_title(&mut ungrounded_titles, catalog, position)
                    }
                    NameMatch::Unknown if span.reads_as_course => {
                        push_unique(&mut ungrounded_titles, &span.text)
                    }
                    NameMatch::Unknown => {}
                }
            }
        }

        let mut grounded_skills: BTreeSet<&SkillId> = requested_skills.iter().collect();
        for position in &guarded_positions {
            if let Some(taught) = catalog.skills_of(*position) {
                grounded_skills.extend(taught.iter());
            }
        }
        let ungrounded_skills = taxonomy
            .skills_in(draft)
            .into_iter()
            .filter(|s| !grounded_skills.contains(s))
            .collect();

        ConsistencyReport {
            ungrounded_titles,
            ungrounded_skills,
        }
    }
}

/// The draft as shown to the user: citation markers removed.
pub fn strip_citations(draft: &str) -> String {
    draft.replace(CITE_OPEN, "").replace(CITE_CLOSE, "")
}

/// Cited names and the uncited text between them. An unclosed marker
/// leaves the rest of the draft uncited.
fn split_citations(draft: &str) -> (Vec<&str>, Vec<&str>) {
    let mut cited = Vec::new();
    let mut prose = Vec::new();
    let mut rest = draft;
    while let Some(open) = rest.find(CITE_OPEN) {
        let after = &rest[open + CITE_OPEN.len()..];
        let Some(close) = after.find(CITE_CLOSE) else {
            break;
        };
        prose.push(&rest[..open]);
        cited.push(&after[..close]);
        rest = &after[close + CITE_CLOSE.len()..];
    }
    prose.push(rest);
    (cited, prose)
}

enum NameMatch {
    Guarded,
    Other(usize),
    Unknown,
}

/// Closest catalog title for a name. A non-guarded title wins only when it
/// is strictly closer than every guarded one.
fn resolve_name(name: &str, catalog: &CatalogIndex, guarded: &BTreeSet<usize>) -> NameMatch {
    let mut best_guarded = 0.0_f32;
    let mut best_other: Option<(usize, f32)> = None;
    for position in 0..catalog.len() {
        let score = catalog.title_similarity(position, name);
        if guarded.contains(&position) {
            best_guarded = best_guarded.max(score);
        } else if best_other.map_or(true, |(_, s)| score > s) {
            best_other = Some((position, score));
        }
    }
    match best_other {
        Some((position, score)) if score >= FUZZY_TITLE_THRESHOLD && score > best_guarded => {
            NameMatch::Other(position)
        }
        _ if best_guarded >= FUZZY_TITLE_THRESHOLD => NameMatch::Guarded,
        _ => NameMatch::Unknown,
    }
}

fn push_title(found: &mut Vec<String>, catalog: &CatalogIndex, position: usize) {
    if let Some(course) = catalog.course(position) {
        push_unique(found, &course.title);
    }
}

fn push_unique(found: &mut Vec<String>, name: &str) {
    if !name.is_empty() && !found.iter().any(|f| f == name) {
        found.push(name.to_string());
    }
}

struct Word {
    raw: String,
    folded: String,
    capitalized: bool,
    connector: bool,
    ends_clause: bool,
}

struct NameSpan {
    text: String,
    reads_as_course: bool,
}

fn words(segment: &str) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    for piece in segment.split_whitespace() {
        if piece.starts_with(|c: char| "(\"'«“".contains(c)) {
            if let Some(last) = words.last_mut() {
                last.ends_clause = true;
            }
        }
        let ends_clause = piece.ends_with(|c: char| ".,;:!?)\"'»”،؛".contains(c));
        let trimmed = piece.trim_matches(|c: char| !c.is_alphanumeric() && !"+#&".contains(c));
        if trimmed.is_empty() {
            continue;
        }
        let capitalized = trimmed.chars().next().map_or(false, char::is_uppercase);

        let folded = fold(trimmed);
        let parts = tokens(&folded);
        if parts.is_empty() {
            if trimmed == "&" {
                words.push(Word {
                    raw: trimmed.to_string(),
                    folded: "&".to_string(),
                    capitalized: false,
                    connector: true,
                    ends_clause,
                });
            }
            continue;
        }
        let last = parts.len() - 1;
        for (i, part) in parts.iter().enumerate() {
            words.push(Word {
                raw: if i == 0 { trimmed.to_string() } else { String::new() },
                folded: part.to_string(),
                capitalized,
                connector: CONNECTORS.contains(part),
                ends_clause: ends_clause && i == last,
            });
        }
    }
    words
}

/// Capitalised runs (joined by connectors) that no guarded title covers,
/// with at least two capitalised words.
fn name_spans(segment: &str, guarded_titles: &[Vec<String>]) -> Vec<NameSpan> {
    let words = words(segment);

    let mut covered = vec![false; words.len()];
    for title in guarded_titles.iter().filter(|t| !t.is_empty()) {
        if title.len() > words.len() {
            continue;
        }
        for start in 0..=(words.len() - title.len()) {
            let matches = words[start..start + title.len()]
                .iter()
                .zip(title)
                .all(|(w, t)| w.folded == *t);
            if matches {
                covered[start..start + title.len()].iter_mut().for_each(|c| *c = true);
            }
        }
    }

    let mut spans = Vec::new();
    let mut current: Vec<&Word> = Vec::new();
    for (word, covered) in words.iter().zip(&covered) {
        let joins = !covered
            && ((word.capitalized && !word.connector) || (word.connector && !current.is_empty()));
        if joins {
            current.push(word);
        } else {
            flush_span(&mut current, &mut spans);
        }
        if word.ends_clause {
            flush_span(&mut current, &mut spans);
        }
    }
    flush_span(&mut current, &mut spans);
    spans
}

fn flush_span(current: &mut Vec<&Word>, spans: &mut Vec<NameSpan>) {
    while current.last().map_or(false, |w| w.connector) {
        current.pop();
    }
    let capitalized = current.iter().filter(|w| w.capitalized && !w.connector).count();
    if capitalized >= 2 {
        let text = current
            .iter()
            .map(|w| w.raw.as_str())
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let reads_as_course = current.iter().any(|w| COURSE_NOUNS.contains(&w.folded.as_str()));
        spans.push(NameSpan {
            text,
            reads_as_course,
        });
    }
    current.clear();
}
