//! Controlled-vocabulary entries: skills, domains, roles and interest areas.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Language;

/// Canonical skill identifier (e.g. `power_bi`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(String);

impl SkillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical domain identifier (e.g. `data_ai`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical job role identifier (e.g. `data_analyst`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A display string in both supported languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bilingual {
    pub en: String,
    pub ar: String,
}

impl Bilingual {
    pub fn new(en: impl Into<String>, ar: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            ar: ar.into(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        language.pick(&self.en, &self.ar)
    }
}

/// A canonical skill and the surface forms that resolve to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTerm {
    pub id: SkillId,
    pub name: Bilingual,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Domain whose catalog categories this skill belongs to.
    pub domain: DomainId,
}

/// A broad field of study, mapped onto catalog categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainTerm {
    pub id: DomainId,
    pub name: Bilingual,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub categories: Vec<String>,
}

/// One required skill of a role with its importance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSkill {
    pub skill: SkillId,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

/// A target job role; doubles as an exploration track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProfile {
    pub id: RoleId,
    pub name: Bilingual,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub domain: DomainId,
    /// Ordered by importance, most important first.
    pub skills: Vec<WeightedSkill>,
    #[serde(default)]
    pub roadmap: Option<Bilingual>,
}

impl RoleProfile {
    pub fn total_weight(&self) -> f32 {
        self.skills.iter().map(|s| s.weight).sum()
    }

    pub fn skill_ids(&self) -> Vec<SkillId> {
        self.skills.iter().map(|s| s.skill.clone()).collect()
    }
}

/// A lettered answer of the exploration diagnostic question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestArea {
    /// Choice letter shown to the user (`A`..`D`).
    pub key: String,
    pub name: Bilingual,
    pub domains: Vec<DomainId>,
    /// Free-text hints that select this area without the letter.
    #[serde(default)]
    pub keywords: Vec<String>,
}
