//! Weekly study plans from guarded courses.

use std::collections::BTreeSet;

use super::response::{LearningPlan, PlanItem, PlanType, WeekPlan};
use crate::domain::catalog::CourseId;
use crate::domain::foundation::{Language, Percentage};
use crate::domain::taxonomy::SkillId;

#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub study_days_per_week: u32,
    /// Used for courses with no stated duration.
    pub default_course_hours: f32,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            study_days_per_week: 5,
            default_course_hours: 5.0,
        }
    }
}

/// A guarded course as the planner sees it.
#[derive(Debug, Clone)]
pub struct PlanCourse {
    pub course_id: CourseId,
    pub title: String,
    pub hours: Option<f32>,
    pub skills: Vec<SkillId>,
}

pub struct StudyPlanner {
    settings: PlanSettings,
}

impl StudyPlanner {
    pub fn new(settings: PlanSettings) -> Self {
        Self { settings }
    }

    /// Packs courses into weeks in order. A course longer than the time
    /// left in a week spills into the next one; weeks with nothing left to
    /// schedule become practice weeks. Courses that do not fit in the
    /// duration are left out.
    pub fn build(
        &self,
        weeks: u32,
        hours_per_day: f32,
        courses: &[PlanCourse],
        required: &[SkillId],
        language: Language,
    ) -> LearningPlan {
        let weekly_hours = round_hours(hours_per_day * self.settings.study_days_per_week as f32);
        let mut schedule: Vec<WeekPlan> = (1..=weeks)
            .map(|week| WeekPlan {
                week,
                focus: String::new(),
                items: Vec::new(),
                hours: 0.0,
            })
            .collect();

        let mut week = 0usize;
        let mut scheduled: Vec<&PlanCourse> = Vec::new();
        'courses: for course in courses {
            let mut remaining = course.hours.unwrap_or(self.settings.default_course_hours).max(0.5);
            let mut placed = false;
            while remaining > f32::EPSILON {
                let Some(slot) = schedule.get_mut(week) else {
                    break 'courses;
                };
                let free = weekly_hours - slot.hours;
                if free <= f32::EPSILON {
                    week += 1;
                    continue;
                }
                let take = remaining.min(free);
                slot.items.push(PlanItem {
                    course_id: course.course_id.clone(),
                    title: course.title.clone(),
                    hours: round_hours(take),
                });
                slot.hours = round_hours(slot.hours + take);
                remaining -= take;
                placed = true;
            }
            if placed {
                scheduled.push(course);
            }
        }

        for slot in &mut schedule {
            slot.focus = if slot.items.is_empty() {
                language.pick("Practice and project week", "أسبوع تطبيق ومشروع عملي").to_string()
            } else {
                let mut titles: Vec<&str> = Vec::new();
                for item in &slot.items {
                    if !titles.contains(&item.title.as_str()) {
                        titles.push(&item.title);
                    }
                }
                titles.join(" + ")
            };
        }

        let coverage = coverage(&scheduled, required);
        LearningPlan {
            duration_weeks: weeks,
            hours_per_day,
            weekly_hours,
            plan_type: plan_type(coverage),
            coverage,
            schedule,
        }
    }
}

/// Share of required skills taught by the scheduled courses.
///
/// With no required skills the plan counts as fully covered when it
/// schedules any course.
fn coverage(scheduled: &[&PlanCourse], required: &[SkillId]) -> Percentage {
    if required.is_empty() {
        return if scheduled.is_empty() {
            Percentage::ZERO
        } else {
            Percentage::HUNDRED
        };
    }
    let taught: BTreeSet<&SkillId> = scheduled.iter().flat_map(|c| c.skills.iter()).collect();
    let required: BTreeSet<&SkillId> = required.iter().collect();
    let covered = required.iter().filter(|s| taught.contains(*s)).count();
    Percentage::from_ratio(covered as f64, required.len() as f64)
}

fn plan_type(coverage: Percentage) -> PlanType {
    match coverage.value() {
        70..=100 => PlanType::Catalog,
        30..=69 => PlanType::Hybrid,
        _ => PlanType::Custom,
    }
}

fn round_hours(hours: f32) -> f32 {
    (hours * 100.0).round() / 100.0
}
