//! Semantic slot extraction.
//!
//! Turns a message into slot values: primary domain, focus skills, role,
//! level, duration and daily study time. Skill and domain mentions come from
//! the taxonomy's longest-alias-first matcher; time constraints come from
//! bilingual patterns over the folded text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use super::intent::Intent;
use crate::domain::catalog::CourseLevel;
use crate::domain::conversation::{Flow, PlanSlot, SlotUpdate, Slots};
use crate::domain::foundation::text::{contains_any, fold, is_stopword, tokens};
use crate::domain::taxonomy::{DomainId, RoleId, SkillId, SkillTaxonomy, TermRef};

pub const MAX_PLAN_WEEKS: u32 = 52;
pub const MAX_HOURS_PER_DAY: f32 = 12.0;

static WEEKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:weeks?|wks?|اسابيع|اسبوع)").expect("weeks regex")
});
static MONTHS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:months?|شهور|اشهر|شهر)").expect("months regex")
});
static DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:days?|يوم|ايام)\b").expect("days regex"));
static SINGLE_PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b(?:a|one)\s+(week|month)\b)|(?:^|\s)(اسبوع|شهر)(?:\s|$)").expect("period regex")
});
static HOURS_PER_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|h|ساعات|ساعه)\s*(?:a|per|every|each|/|في|كل)?\s*(?:daily|day|يوميا|اليوم|يوم)|(\d+(?:\.\d+)?)\s*/\s*(?:day|d)\b",
    )
    .expect("hours per day regex")
});
static HOURS_PER_WEEK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|h|ساعات|ساعه)\s*(?:a|per|every|each|/|في|كل)?\s*(?:weekly|week|اسبوعيا|الاسبوع|اسبوع)")
        .expect("hours per week regex")
});
static HOURS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(?:hours?|hrs?|ساعات|ساعه)").expect("hours regex")
});

const DAILY_MARKERS: &[&str] = &["daily", "a day", "per day", "every day", "يوميا", "في اليوم", "كل يوم"];
/// Explicit pagination requests.
const MORE_MARKERS: &[&str] = &["more", "show more", "كمان", "غيرهم", "غير دول", "المزيد"];
/// Contrast words that never name a topic on their own.
const VAGUE_WORDS: &[&str] = &["another", "other", "others", "else", "تاني", "تانيه", "اكتر", "زياده"];
const BEGINNER_MARKERS: &[&str] = &["from scratch", "from zero", "من الصفر", "من البدايه", "للمبتدئين"];

/// Slots and signals extracted from one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub update: SlotUpdate,
    /// Domains named in the message, first mention first.
    pub mentioned_domains: Vec<DomainId>,
    /// Nothing to retrieve on, or two fields with nothing to choose between them.
    pub ambiguous: bool,
    /// The user asked for more results than last time.
    pub wants_more: bool,
    /// Content words no taxonomy term consumed, for title keyword lookup.
    pub keywords: Vec<String>,
}

pub struct SemanticExtractor {
    taxonomy: Arc<SkillTaxonomy>,
    study_days_per_week: u32,
}

impl SemanticExtractor {
    pub fn new(taxonomy: Arc<SkillTaxonomy>, study_days_per_week: u32) -> Self {
        Self {
            taxonomy,
            study_days_per_week: study_days_per_week.max(1),
        }
    }

    pub fn extract(&self, message: &str, intent: Intent, flow: &Flow, slots: &Slots) -> Extraction {
        let folded = fold(message);
        let matches = self.taxonomy.match_terms(message);

        let mut skills: Vec<SkillId> = Vec::new();
        let mut domains: Vec<DomainId> = Vec::new();
        let mut role: Option<RoleId> = None;
        let mut consumed = vec![false; tokens(&folded).len()];

        for m in &matches {
            for flag in consumed.iter_mut().skip(m.start).take(m.len) {
                *flag = true;
            }
            match &m.term {
                TermRef::Skill(id) if !skills.contains(id) => skills.push(id.clone()),
                TermRef::Domain(id) if !domains.contains(id) => domains.push(id.clone()),
                TermRef::Role(id) if role.is_none() => role = Some(id.clone()),
                _ => {}
            }
        }

        let mut update = SlotUpdate::default();
        let mut competing = false;

        // Compound queries: the field is the primary domain, named tools are
        // focus skills inside it.
        update.domain = match domains.len() {
            0 => None,
            1 => domains.first().cloned(),
            _ if skills.is_empty() => {
                competing = true;
                None
            }
            _ => {
                let owner = skills
                    .iter()
                    .filter_map(|s| self.taxonomy.skill(s))
                    .map(|s| s.domain.clone())
                    .find(|d| domains.contains(d));
                owner.or_else(|| domains.first().cloned())
            }
        };

        if update.domain.is_none() && !competing {
            if let Some(profile) = role.as_ref().and_then(|r| self.taxonomy.role(r)) {
                update.domain = Some(profile.domain.clone());
            } else if let Some(current) = &slots.domain {
                // Skills from another field replace a stale domain.
                let owners: Vec<DomainId> = skills
                    .iter()
                    .filter_map(|s| self.taxonomy.skill(s))
                    .map(|s| s.domain.clone())
                    .collect();
                if !owners.is_empty() && !owners.contains(current) {
                    update.domain = owners.first().cloned();
                }
            }
        }

        if !skills.is_empty() {
            update.skills = Some(skills);
        }
        update.role = role;
        update.level = parse_level(&folded);
        update.duration_weeks = parse_duration_weeks(&folded);
        update.hours_per_day = parse_hours_per_day(&folded, self.study_days_per_week);

        if let Some(value) = bare_number(&folded) {
            match flow.awaiting_plan_slot() {
                Some(PlanSlot::Duration) if update.duration_weeks.is_none() => {
                    update.duration_weeks = weeks_in_range(value.round() as i64);
                }
                Some(PlanSlot::HoursPerDay) if update.hours_per_day.is_none() => {
                    update.hours_per_day = hours_in_range(value);
                }
                _ => {}
            }
        }

        let keywords: Vec<String> = tokens(&folded)
            .into_iter()
            .zip(consumed.iter())
            .filter(|(token, used)| !**used && is_keyword(token))
            .map(|(token, _)| token.to_string())
            .collect();

        let wants_more =
            contains_any(&folded, MORE_MARKERS) && names_nothing_new(&update, &keywords, slots);

        let ambiguous = intent.is_retrieval()
            && !intent.is_title_lookup()
            && (competing
                || (!update.has_topic() && slots.has_no_topic() && keywords.is_empty()));

        Extraction {
            update,
            mentioned_domains: domains,
            ambiguous,
            wants_more,
            keywords,
        }
    }

    /// True when the message reads as a plan-slot answer (a duration, a daily
    /// time, or a bare number for the slot being waited on).
    pub fn is_plan_answer(&self, message: &str, awaiting: Option<PlanSlot>) -> bool {
        let folded = fold(message);
        if parse_duration_weeks(&folded).is_some()
            || parse_hours_per_day(&folded, self.study_days_per_week).is_some()
        {
            return true;
        }
        match awaiting {
            Some(PlanSlot::Duration) | Some(PlanSlot::HoursPerDay) => bare_number(&folded).is_some(),
            Some(PlanSlot::Domain) => {
                tokens(&folded).len() <= 4
                    && self.taxonomy.match_terms(message).iter().any(|m| {
                        matches!(m.term, TermRef::Domain(_) | TermRef::Skill(_) | TermRef::Role(_))
                    })
            }
            None => false,
        }
    }
}

fn is_keyword(token: &str) -> bool {
    token.chars().count() >= 3
        && !is_stopword(token)
        && !token.chars().all(|c| c.is_ascii_digit() || c == '.')
        && !MORE_MARKERS.contains(&token)
        && !VAGUE_WORDS.contains(&token)
        && CourseLevel::parse(token).is_none()
}

/// A "more" request only pages through what the session already asked for.
fn names_nothing_new(update: &SlotUpdate, keywords: &[String], slots: &Slots) -> bool {
    keywords.is_empty()
        && update.domain.as_ref().map_or(true, |d| slots.domain.as_ref() == Some(d))
        && update.role.as_ref().map_or(true, |r| slots.role.as_ref() == Some(r))
        && update
            .skills
            .as_ref()
            .map_or(true, |skills| skills.iter().all(|s| slots.skills.contains(s)))
}

fn parse_level(folded: &str) -> Option<CourseLevel> {
    if contains_any(folded, BEGINNER_MARKERS) {
        return Some(CourseLevel::Beginner);
    }
    tokens(folded).into_iter().find_map(CourseLevel::parse)
}

fn weeks_in_range(weeks: i64) -> Option<u32> {
    (1..=MAX_PLAN_WEEKS as i64).contains(&weeks).then(|| weeks as u32)
}

fn hours_in_range(hours: f32) -> Option<f32> {
    (hours > 0.0 && hours <= MAX_HOURS_PER_DAY).then_some(hours)
}

/// First participating capture group of the leftmost match, as a number.
fn capture_number(re: &Regex, folded: &str) -> Option<f32> {
    re.captures(folded)
        .and_then(|c| c.iter().skip(1).flatten().next())
        .and_then(|m| m.as_str().parse::<f32>().ok())
}

/// Plan length in weeks ("8 weeks", "2 months", "30 days", "شهرين").
pub fn parse_duration_weeks(folded: &str) -> Option<u32> {
    if let Some(weeks) = capture_number(&WEEKS, folded) {
        return weeks_in_range(weeks as i64);
    }
    if let Some(months) = capture_number(&MONTHS, folded) {
        return weeks_in_range(months as i64 * 4);
    }
    if let Some(days) = capture_number(&DAYS, folded) {
        return weeks_in_range(((days as i64) + 6) / 7);
    }
    let toks = tokens(folded);
    if toks.contains(&"اسبوعين") {
        return Some(2);
    }
    if toks.contains(&"شهرين") {
        return Some(8);
    }
    // "10 hours a week" names a weekly load, not a length.
    let without_load = HOURS_PER_WEEK.replace_all(folded, " ");
    SINGLE_PERIOD.captures(&without_load).and_then(|c| {
        let unit = c.get(1).or_else(|| c.get(2))?.as_str();
        match unit {
            "week" | "اسبوع" => Some(1),
            _ => Some(4),
        }
    })
}

/// Daily study time in hours ("2/day", "2 hours a day", "10 hours a week",
/// "ساعتين يوميا").
pub fn parse_hours_per_day(folded: &str, study_days_per_week: u32) -> Option<f32> {
    if let Some(weekly) = capture_number(&HOURS_PER_WEEK, folded) {
        return hours_in_range(weekly / study_days_per_week.max(1) as f32);
    }
    if let Some(daily) = capture_number(&HOURS_PER_DAY, folded) {
        return hours_in_range(daily);
    }
    let toks = tokens(folded);
    if toks.contains(&"ساعتين") {
        return Some(2.0);
    }
    if toks.contains(&"ساعه") && contains_any(folded, DAILY_MARKERS) {
        return Some(1.0);
    }
    if contains_any(folded, DAILY_MARKERS) {
        return capture_number(&HOURS, folded).and_then(hours_in_range);
    }
    None
}

/// The message is a single number.
fn bare_number(folded: &str) -> Option<f32> {
    let toks = tokens(folded);
    match toks.as_slice() {
        [only] => only.parse::<f32>().ok(),
        _ => None,
    }
}
