//! Skill taxonomy - the controlled vocabulary behind slot extraction.
//!
//! Maps free-text mentions (English or Arabic) to canonical skills, broad
//! domains and job roles, and holds the weighted role profiles used for
//! CV gap scoring.

mod taxonomy;
mod terms;

pub use taxonomy::{SkillTaxonomy, TaxonomyDocument, TaxonomyError, TermMatch, TermRef};
pub use terms::{
    Bilingual, DomainId, DomainTerm, InterestArea, RoleId, RoleProfile, SkillId, SkillTerm,
    WeightedSkill,
};
