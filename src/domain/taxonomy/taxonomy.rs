//! The skill taxonomy: alias resolution and role lookup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::terms::{DomainId, DomainTerm, InterestArea, RoleId, RoleProfile, SkillId, SkillTerm};
use crate::domain::foundation::text::{fold, strip_article, tokens};

/// Errors raised while building a taxonomy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaxonomyError {
    #[error("alias '{alias}' maps to both {first} and {second}")]
    AmbiguousAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("{term} references unknown domain '{domain}'")]
    UnknownDomain { term: String, domain: String },

    #[error("role '{role}' references unknown skill '{skill}'")]
    UnknownSkill { role: String, skill: String },

    #[error("role '{0}' has no weighted skills")]
    EmptyRole(String),

    #[error("role '{role}' gives skill '{skill}' an invalid weight")]
    InvalidWeight { role: String, skill: String },

    #[error("taxonomy document is malformed: {0}")]
    Parse(String),
}

/// What an alias resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermRef {
    Skill(SkillId),
    Domain(DomainId),
    Role(RoleId),
}

impl fmt::Display for TermRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermRef::Skill(id) => write!(f, "skill:{}", id),
            TermRef::Domain(id) => write!(f, "domain:{}", id),
            TermRef::Role(id) => write!(f, "role:{}", id),
        }
    }
}

/// One alias hit inside a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub term: TermRef,
    /// Folded surface form that matched.
    pub surface: String,
    /// Token offset of the match.
    pub start: usize,
    /// Number of tokens consumed.
    pub len: usize,
}

/// Serialized form of the taxonomy (YAML on disk).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyDocument {
    #[serde(default)]
    pub skills: Vec<SkillTerm>,
    #[serde(default)]
    pub domains: Vec<DomainTerm>,
    #[serde(default)]
    pub roles: Vec<RoleProfile>,
    #[serde(default)]
    pub interests: Vec<InterestArea>,
}

/// Controlled vocabulary mapping free-text mentions to canonical terms.
///
/// Built once and shared read-only. Every folded alias resolves to exactly
/// one term; construction fails otherwise.
#[derive(Debug, Clone)]
pub struct SkillTaxonomy {
    skills: BTreeMap<SkillId, SkillTerm>,
    domains: BTreeMap<DomainId, DomainTerm>,
    roles: BTreeMap<RoleId, RoleProfile>,
    interests: Vec<InterestArea>,
    aliases: BTreeMap<String, TermRef>,
    max_alias_tokens: usize,
}

impl SkillTaxonomy {
    /// Parses and validates a YAML taxonomy document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TaxonomyError> {
        let document: TaxonomyDocument =
            serde_yaml::from_str(yaml).map_err(|e| TaxonomyError::Parse(e.to_string()))?;
        Self::from_document(document)
    }

    /// Validates a document and builds the alias table.
    pub fn from_document(document: TaxonomyDocument) -> Result<Self, TaxonomyError> {
        let domains: BTreeMap<DomainId, DomainTerm> = document
            .domains
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();

        for skill in &document.skills {
            if !domains.contains_key(&skill.domain) {
                return Err(TaxonomyError::UnknownDomain {
                    term: format!("skill '{}'", skill.id),
                    domain: skill.domain.to_string(),
                });
            }
        }
        let skills: BTreeMap<SkillId, SkillTerm> = document
            .skills
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        for role in &document.roles {
            validate_role(role, &skills, &domains)?;
        }
        let roles: BTreeMap<RoleId, RoleProfile> = document
            .roles
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        for interest in &document.interests {
            if let Some(missing) = interest.domains.iter().find(|d| !domains.contains_key(*d)) {
                return Err(TaxonomyError::UnknownDomain {
                    term: format!("interest '{}'", interest.key),
                    domain: missing.to_string(),
                });
            }
        }

        let mut aliases = BTreeMap::new();
        for skill in skills.values() {
            let term = TermRef::Skill(skill.id.clone());
            register(&mut aliases, &skill.id.as_str().replace('_', " "), &term)?;
            register(&mut aliases, &skill.name.en, &term)?;
            register(&mut aliases, &skill.name.ar, &term)?;
            for alias in &skill.aliases {
                register(&mut aliases, alias, &term)?;
            }
        }
        for domain in domains.values() {
            let term = TermRef::Domain(domain.id.clone());
            register(&mut aliases, &domain.name.en, &term)?;
            register(&mut aliases, &domain.name.ar, &term)?;
            for alias in &domain.aliases {
                register(&mut aliases, alias, &term)?;
            }
        }
        for role in roles.values() {
            let term = TermRef::Role(role.id.clone());
            register(&mut aliases, &role.name.en, &term)?;
            register(&mut aliases, &role.name.ar, &term)?;
            for alias in &role.aliases {
                register(&mut aliases, alias, &term)?;
            }
        }

        // Article-less spellings resolve too, unless they already mean something else.
        let stripped: Vec<(String, TermRef)> = aliases
            .iter()
            .filter_map(|(key, term)| {
                let bare: Vec<&str> = tokens(key)
                    .into_iter()
                    .map(|t| strip_article(t).unwrap_or(t))
                    .collect();
                let bare = bare.join(" ");
                (bare != *key).then(|| (bare, term.clone()))
            })
            .collect();
        for (key, term) in stripped {
            aliases.entry(key).or_insert(term);
        }

        let max_alias_tokens = aliases
            .keys()
            .map(|k| tokens(k).len())
            .max()
            .unwrap_or(1);

        Ok(Self {
            skills,
            domains,
            roles,
            interests: document.interests,
            aliases,
            max_alias_tokens,
        })
    }

    /// Finds every alias in `text`, longest alias first, left to right.
    ///
    /// Matching is greedy: once tokens are consumed by a longer alias they
    /// are not matched again by a shorter one.
    pub fn match_terms(&self, text: &str) -> Vec<TermMatch> {
        let folded = fold(text);
        let toks = tokens(&folded);
        let bare: Vec<&str> = toks
            .iter()
            .map(|t| strip_article(t).unwrap_or(t))
            .collect();

        let mut matches = Vec::new();
        let mut i = 0;
        'scan: while i < toks.len() {
            let longest = self.max_alias_tokens.min(toks.len() - i);
            for len in (1..=longest).rev() {
                let key = toks[i..i + len].join(" ");
                let hit = self
                    .aliases
                    .get(&key)
                    .or_else(|| self.aliases.get(&bare[i..i + len].join(" ")));
                if let Some(term) = hit {
                    matches.push(TermMatch {
                        term: term.clone(),
                        surface: key,
                        start: i,
                        len,
                    });
                    i += len;
                    continue 'scan;
                }
            }
            i += 1;
        }
        matches
    }

    /// Skills mentioned in `text`, first mention order, deduplicated.
    pub fn skills_in(&self, text: &str) -> Vec<SkillId> {
        let mut found = Vec::new();
        for m in self.match_terms(text) {
            if let TermRef::Skill(id) = m.term {
                if !found.contains(&id) {
                    found.push(id);
                }
            }
        }
        found
    }

    /// Resolves one free-text skill label (e.g. a catalog cell) to a skill.
    pub fn resolve_skill(&self, label: &str) -> Option<SkillId> {
        match self.aliases.get(&fold(label)) {
            Some(TermRef::Skill(id)) => Some(id.clone()),
            _ => self.skills_in(label).into_iter().next(),
        }
    }

    /// Looks a role up by exact alias, then by any role mention in the text.
    pub fn find_role(&self, text: &str) -> Option<&RoleProfile> {
        if let Some(TermRef::Role(id)) = self.aliases.get(&fold(text)) {
            return self.roles.get(id);
        }
        self.match_terms(text).into_iter().find_map(|m| match m.term {
            TermRef::Role(id) => self.roles.get(&id),
            _ => None,
        })
    }

    pub fn skill(&self, id: &SkillId) -> Option<&SkillTerm> {
        self.skills.get(id)
    }

    pub fn domain(&self, id: &DomainId) -> Option<&DomainTerm> {
        self.domains.get(id)
    }

    pub fn role(&self, id: &RoleId) -> Option<&RoleProfile> {
        self.roles.get(id)
    }

    pub fn skills(&self) -> impl Iterator<Item = &SkillTerm> {
        self.skills.values()
    }

    pub fn domains(&self) -> impl Iterator<Item = &DomainTerm> {
        self.domains.values()
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleProfile> {
        self.roles.values()
    }

    pub fn interests(&self) -> &[InterestArea] {
        &self.interests
    }

    /// Roles (tracks) that belong to any of the given domains, in id order.
    pub fn roles_in_domains(&self, domains: &[DomainId]) -> Vec<&RoleProfile> {
        self.roles
            .values()
            .filter(|r| domains.contains(&r.domain))
            .collect()
    }

    /// True when the catalog category belongs to the domain.
    pub fn domain_covers_category(&self, domain: &DomainId, category: &str) -> bool {
        let folded = fold(category);
        self.domains
            .get(domain)
            .map(|d| d.categories.iter().any(|c| fold(c) == folded))
            .unwrap_or(false)
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

fn validate_role(
    role: &RoleProfile,
    skills: &BTreeMap<SkillId, SkillTerm>,
    domains: &BTreeMap<DomainId, DomainTerm>,
) -> Result<(), TaxonomyError> {
    if !domains.contains_key(&role.domain) {
        return Err(TaxonomyError::UnknownDomain {
            term: format!("role '{}'", role.id),
            domain: role.domain.to_string(),
        });
    }
    if role.skills.is_empty() {
        return Err(TaxonomyError::EmptyRole(role.id.to_string()));
    }
    for weighted in &role.skills {
        if !skills.contains_key(&weighted.skill) {
            return Err(TaxonomyError::UnknownSkill {
                role: role.id.to_string(),
                skill: weighted.skill.to_string(),
            });
        }
        if !weighted.weight.is_finite() || weighted.weight <= 0.0 {
            return Err(TaxonomyError::InvalidWeight {
                role: role.id.to_string(),
                skill: weighted.skill.to_string(),
            });
        }
    }
    Ok(())
}

fn register(
    aliases: &mut BTreeMap<String, TermRef>,
    raw: &str,
    term: &TermRef,
) -> Result<(), TaxonomyError> {
    let key = fold(raw);
    if key.is_empty() {
        return Ok(());
    }
    match aliases.get(&key) {
        Some(existing) if existing != term => Err(TaxonomyError::AmbiguousAlias {
            alias: key,
            first: existing.to_string(),
            second: term.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            aliases.insert(key, term.clone());
            Ok(())
        }
    }
}
