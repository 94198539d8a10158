//! Accumulated conversation slots.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::CourseLevel;
use crate::domain::taxonomy::{DomainId, RoleId, SkillId};

/// Structured fields resolved so far in a session.
///
/// Slots persist across turns until a later message overwrites them or
/// the session's flow resets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slots {
    pub domain: Option<DomainId>,
    /// Focus skills, in first-mention order without repeats.
    #[serde(default)]
    pub skills: Vec<SkillId>,
    pub role: Option<RoleId>,
    pub level: Option<CourseLevel>,
    pub duration_weeks: Option<u32>,
    pub hours_per_day: Option<f32>,
}

/// Values resolved from a single message. `None` leaves a slot untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotUpdate {
    pub domain: Option<DomainId>,
    pub skills: Option<Vec<SkillId>>,
    pub role: Option<RoleId>,
    pub level: Option<CourseLevel>,
    pub duration_weeks: Option<u32>,
    pub hours_per_day: Option<f32>,
}

impl SlotUpdate {
    pub fn is_empty(&self) -> bool {
        self.domain.is_none()
            && self.skills.as_ref().map_or(true, |s| s.is_empty())
            && self.role.is_none()
            && self.level.is_none()
            && self.duration_weeks.is_none()
            && self.hours_per_day.is_none()
    }

    /// True when the message named a topic (domain, skill or role).
    pub fn has_topic(&self) -> bool {
        self.domain.is_some() || self.role.is_some() || self.skills.as_ref().map_or(false, |s| !s.is_empty())
    }
}

impl Slots {
    /// Applies an update with set semantics and reports whether anything changed.
    ///
    /// Applying the same update twice leaves the slots as after the first.
    pub fn apply(&mut self, update: &SlotUpdate) -> bool {
        let before = self.clone();

        if let Some(domain) = &update.domain {
            if self.domain.as_ref() != Some(domain) {
                // A new field invalidates a role picked for the old one.
                self.role = None;
            }
            self.domain = Some(domain.clone());
        }
        if let Some(skills) = update.skills.as_ref().filter(|s| !s.is_empty()) {
            let mut unique: Vec<SkillId> = Vec::with_capacity(skills.len());
            for skill in skills {
                if !unique.contains(skill) {
                    unique.push(skill.clone());
                }
            }
            self.skills = unique;
        }
        if let Some(role) = &update.role {
            self.role = Some(role.clone());
        }
        if let Some(level) = update.level {
            self.level = Some(level);
        }
        if let Some(weeks) = update.duration_weeks {
            self.duration_weeks = Some(weeks);
        }
        if let Some(hours) = update.hours_per_day {
            self.hours_per_day = Some(hours);
        }

        *self != before
    }

    /// True when nothing topical (domain, skill or role) is known.
    pub fn has_no_topic(&self) -> bool {
        self.domain.is_none() && self.skills.is_empty() && self.role.is_none()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        *self = Slots::default();
    }
}
