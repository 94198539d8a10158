//! Response assembly: course cards, canned answers, templates and asks.
//!
//! Everything here is deterministic. The only free text that reaches the
//! user comes from the drafter, and only after the consistency pass; every
//! fallback is a template over the guarded cards.

use std::sync::Arc;

use super::consistency::{strip_citations, ConsistencyReport};
use super::intent::Intent;
use super::response::{Ask, CourseCard, CvDashboard, LearningPlan, PlanType};
use super::retriever::{Provenance, RetrievalCandidate};
use crate::domain::catalog::CatalogIndex;
use crate::domain::conversation::{ChoiceTarget, OfferedChoice, PlanSlot};
use crate::domain::foundation::Language;
use crate::domain::taxonomy::{DomainId, SkillTaxonomy};

const CHOICE_KEYS: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// Labelled unavailability text shown when a collaborator is down.
pub fn unavailable_message(language: Language) -> &'static str {
    language.pick(
        "Service unavailable: the assistant cannot answer right now. Please try again shortly.",
        "الخدمة غير متاحة حاليًا: المساعد لا يستطيع الرد الآن. حاول مرة أخرى بعد قليل.",
    )
}

pub struct ResponseBuilder {
    taxonomy: Arc<SkillTaxonomy>,
}

impl ResponseBuilder {
    pub fn new(taxonomy: Arc<SkillTaxonomy>) -> Self {
        Self { taxonomy }
    }

    // ════════════════════════════════════════════════════════════════════
    // Course cards
    // ════════════════════════════════════════════════════════════════════

    /// Cards for guarded candidates, in order.
    pub fn cards(
        &self,
        catalog: &CatalogIndex,
        accepted: &[RetrievalCandidate],
        domain: Option<&DomainId>,
        language: Language,
    ) -> Vec<CourseCard> {
        accepted
            .iter()
            .filter_map(|candidate| {
                let course = catalog.get(&candidate.course_id)?;
                Some(CourseCard {
                    id: course.id.clone(),
                    title: course.title.clone(),
                    category: course.category.clone(),
                    level: course.level.label(language).to_string(),
                    instructor: course.instructor.clone(),
                    duration: course.duration_label(),
                    reason: self.reason(candidate, domain, language),
                })
            })
            .collect()
    }

    fn reason(&self, candidate: &RetrievalCandidate, domain: Option<&DomainId>, language: Language) -> String {
        match candidate.provenance {
            Provenance::Title => language
                .pick("Matches the course you asked about", "يطابق الكورس اللي سألت عنه")
                .to_string(),
            Provenance::SkillExact if !candidate.matched_skills.is_empty() => {
                let names: Vec<&str> = candidate
                    .matched_skills
                    .iter()
                    .filter_map(|s| self.taxonomy.skill(s))
                    .map(|t| t.name.get(language))
                    .collect();
                match language {
                    Language::En => format!("Teaches {}", names.join(", ")),
                    Language::Ar => format!("بيعلمك {}", names.join("، ")),
                }
            }
            Provenance::Category | Provenance::SkillExact => {
                match domain.and_then(|d| self.taxonomy.domain(d)) {
                    Some(term) => match language {
                        Language::En => format!("Core course in {}", term.name.en),
                        Language::Ar => format!("كورس أساسي في {}", term.name.ar),
                    },
                    None => language.pick("Fits your field", "مناسب لمجالك").to_string(),
                }
            }
            Provenance::Lexical => language
                .pick("Title matches your search", "العنوان مطابق لبحثك")
                .to_string(),
            Provenance::Vector => language.pick("Related to your topic", "مرتبط بموضوعك").to_string(),
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Answers
    // ════════════════════════════════════════════════════════════════════

    /// Fixed replies for intents that never retrieve.
    pub fn canned_answer(intent: Intent, language: Language) -> Option<&'static str> {
        let text = match intent {
            Intent::OutOfScope => language.pick(
                "I can only help with learning and careers: finding courses, planning your studies, or reviewing your CV. What would you like to learn?",
                "أنا أقدر أساعدك بس في التعلم والمسار المهني: ترشيح كورسات، خطة مذاكرة، أو مراجعة السيرة الذاتية. حابب تتعلم إيه؟",
            ),
            Intent::Unsafe => language.pick(
                "I can't help with that. If you're interested in security, I can suggest ethical hacking and cyber-protection courses.",
                "مقدرش أساعد في ده. لو مهتم بالأمن، أقدر أرشحلك كورسات في الاختراق الأخلاقي وحماية الأنظمة.",
            ),
            Intent::SupportPolicy => language.pick(
                "For pricing, payments, certificates or account questions, please contact the support team from the Help page.",
                "بالنسبة للأسعار والدفع والشهادات أو مشاكل الحساب، تواصل مع فريق الدعم من صفحة المساعدة.",
            ),
            _ => return None,
        };
        Some(text)
    }

    /// Asks the user to paste their CV.
    pub fn cv_paste_ask(language: Language) -> (String, Ask) {
        let answer = language
            .pick(
                "I can review your CV against a target role.",
                "أقدر أراجع سيرتك الذاتية مقارنة بالوظيفة اللي بتستهدفها.",
            )
            .to_string();
        let ask = Ask::new(language.pick(
            "Paste the text of your CV and, if you like, the role you are aiming for.",
            "الصق نص السيرة الذاتية، ولو حابب اكتب الوظيفة اللي بتستهدفها.",
        ));
        (answer, ask)
    }

    /// Deterministic answer that names only the given cards.
    pub fn grounded_template(&self, cards: &[CourseCard], notes: Option<&str>, language: Language) -> String {
        let mut text = language
            .pick("Here are courses from the catalog that fit:", "دي كورسات من الكتالوج مناسبة ليك:")
            .to_string();
        for (rank, card) in cards.iter().enumerate() {
            text.push_str(&format!("\n{}. {} ({})", rank + 1, card.title, card.level));
        }
        if let Some(notes) = notes {
            text.push_str("\n\n");
            text.push_str(notes);
        }
        text
    }

    /// No guarded course survived.
    pub fn zero_result_answer(language: Language) -> String {
        language
            .pick(
                "I couldn't find catalog courses that match this request closely enough. Try a broader topic or a related skill.",
                "مالقيتش كورسات في الكتالوج مطابقة للطلب ده بدرجة كافية. جرّب موضوع أوسع أو مهارة قريبة.",
            )
            .to_string()
    }

    /// Picks the text to show: the draft (citation markers removed) when it
    /// is grounded, the template otherwise.
    pub fn finalize_answer(
        &self,
        draft: &str,
        report: &ConsistencyReport,
        cards: &[CourseCard],
        notes: Option<&str>,
        language: Language,
    ) -> String {
        if draft.is_empty() || !report.is_consistent() {
            return self.grounded_template(cards, notes, language);
        }
        strip_citations(draft)
    }

    pub fn plan_answer(&self, plan: &LearningPlan, language: Language) -> String {
        let kind = match (plan.plan_type, language) {
            (PlanType::Catalog, Language::En) => "built from catalog courses",
            (PlanType::Hybrid, Language::En) => "mixing catalog courses with self-study",
            (PlanType::Custom, Language::En) => "mostly self-study and practice",
            (PlanType::Catalog, Language::Ar) => "مبنية على كورسات الكتالوج",
            (PlanType::Hybrid, Language::Ar) => "بتجمع بين كورسات الكتالوج والمذاكرة الذاتية",
            (PlanType::Custom, Language::Ar) => "معظمها مذاكرة ذاتية وتطبيق",
        };
        match language {
            Language::En => format!(
                "Your {}-week plan at {} hours a day ({} hours a week), {}.",
                plan.duration_weeks, plan.hours_per_day, plan.weekly_hours, kind
            ),
            Language::Ar => format!(
                "خطتك لمدة {} أسابيع بمعدل {} ساعات يوميًا ({} ساعات أسبوعيًا)، {}.",
                plan.duration_weeks, plan.hours_per_day, plan.weekly_hours, kind
            ),
        }
    }

    pub fn cv_answer(&self, dashboard: &CvDashboard, language: Language) -> String {
        let missing: Vec<&str> = dashboard.missing.iter().map(|g| g.name.as_str()).collect();
        match language {
            Language::En => {
                let mut text = format!(
                    "Your CV matches {} of the skills for {}.",
                    dashboard.score.skills, dashboard.role_name
                );
                if !missing.is_empty() {
                    text.push_str(&format!(" To close the gap, focus on: {}.", missing.join(", ")));
                }
                text
            }
            Language::Ar => {
                let mut text = format!(
                    "سيرتك الذاتية بتغطي {} من مهارات {}.",
                    dashboard.score.skills, dashboard.role_name
                );
                if !missing.is_empty() {
                    text.push_str(&format!(" عشان تقفل الفجوة ركّز على: {}.", missing.join("، ")));
                }
                text
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Clarifying questions
    // ════════════════════════════════════════════════════════════════════

    /// The diagnostic question: lettered interest areas.
    pub fn interest_choices(&self, language: Language) -> (Vec<OfferedChoice>, Ask) {
        let offered: Vec<OfferedChoice> = self
            .taxonomy
            .interests()
            .iter()
            .map(|area| OfferedChoice {
                key: area.key.clone(),
                label: area.name.get(language).to_string(),
                aliases: area
                    .keywords
                    .iter()
                    .cloned()
                    .chain([area.name.en.clone(), area.name.ar.clone()])
                    .collect(),
                target: ChoiceTarget::Interest(area.key.clone()),
            })
            .collect();
        let ask = Ask::new(language.pick(
            "Which of these sounds most like you?",
            "أنهي اختيار من دول أقرب ليك؟",
        ))
        .with_choices(choice_lines(&offered));
        (offered, ask)
    }

    /// Tracks (roles) within the given domains.
    pub fn track_choices(&self, domains: &[DomainId], language: Language) -> (Vec<OfferedChoice>, Ask) {
        let offered: Vec<OfferedChoice> = self
            .taxonomy
            .roles_in_domains(domains)
            .into_iter()
            .zip(CHOICE_KEYS)
            .map(|(role, key)| OfferedChoice {
                key: key.to_string(),
                label: role.name.get(language).to_string(),
                aliases: role
                    .aliases
                    .iter()
                    .cloned()
                    .chain([role.name.en.clone(), role.name.ar.clone()])
                    .collect(),
                target: ChoiceTarget::Track(role.id.clone()),
            })
            .collect();
        let ask = Ask::new(language.pick(
            "Which track would you like to follow?",
            "تحب تمشي في أنهي مسار؟",
        ))
        .with_choices(choice_lines(&offered));
        (offered, ask)
    }

    /// Asks which field the user means; lists the given domains, or all.
    pub fn domain_ask(&self, candidates: &[DomainId], language: Language) -> Ask {
        let names: Vec<String> = if candidates.is_empty() {
            self.taxonomy.domains().map(|d| d.name.get(language).to_string()).collect()
        } else {
            candidates
                .iter()
                .filter_map(|d| self.taxonomy.domain(d))
                .map(|d| d.name.get(language).to_string())
                .collect()
        };
        Ask::new(language.pick(
            "Which field are you interested in?",
            "إنت مهتم بأنهي مجال؟",
        ))
        .with_choices(names)
    }

    pub fn plan_slot_ask(&self, slot: PlanSlot, language: Language) -> Ask {
        match slot {
            PlanSlot::Domain => self.domain_ask(&[], language),
            PlanSlot::Duration => Ask::new(language.pick(
                "How many weeks do you want the plan to take?",
                "عايز الخطة تكون مدتها كام أسبوع؟",
            ))
            .with_choices(
                ["4", "8", "12"]
                    .iter()
                    .map(|w| match language {
                        Language::En => format!("{} weeks", w),
                        Language::Ar => format!("{} أسابيع", w),
                    })
                    .collect(),
            ),
            PlanSlot::HoursPerDay => Ask::new(language.pick(
                "How many hours a day can you study?",
                "تقدر تذاكر كام ساعة في اليوم؟",
            ))
            .with_choices(
                ["1", "2", "3"]
                    .iter()
                    .map(|h| match language {
                        Language::En => format!("{} hours/day", h),
                        Language::Ar => format!("{} ساعات يوميًا", h),
                    })
                    .collect(),
            ),
        }
    }

    /// Intro line for an ask-only turn.
    pub fn ask_preamble(language: Language) -> String {
        language
            .pick(
                "Let's narrow it down first.",
                "خلينا نحدد الأول.",
            )
            .to_string()
    }
}

fn choice_lines(offered: &[OfferedChoice]) -> Vec<String> {
    offered.iter().map(|c| format!("{}) {}", c.key, c.label)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CourseId, CourseLevel, CourseRecord, Embedder};
    use crate::domain::foundation::Percentage;
    use crate::domain::guidance::response::{CvScore, SkillGap};
    use crate::domain::taxonomy::{RoleId, SkillId};

    const TAXONOMY: &str = r#"
domains:
  - id: data_ai
    name: { en: Data & AI, ar: البيانات والذكاء الاصطناعي }
    categories: [Data Science]
skills:
  - { id: sql, name: { en: SQL, ar: اس كيو ال }, domain: data_ai }
roles:
  - id: data_analyst
    name: { en: Data Analyst, ar: محلل بيانات }
    domain: data_ai
    skills: [{ skill: sql, weight: 1 }]
interests:
  - key: A
    name: { en: Technology & data, ar: التكنولوجيا والبيانات }
    domains: [data_ai]
    keywords: [data]
"#;

    fn builder() -> (ResponseBuilder, CatalogIndex) {
        let taxonomy = Arc::new(SkillTaxonomy::from_yaml_str(TAXONOMY).unwrap());
        let index = CatalogIndex::build(
            vec![CourseRecord {
                id: CourseId::new("c1").unwrap(),
                title: "SQL Basics".into(),
                category: "Data Science".into(),
                level: CourseLevel::Beginner,
                duration_hours: Some(10.0),
                skills: vec!["SQL".into()],
                description: String::new(),
                instructor: "Mona".into(),
                cover: String::new(),
                published: None,
            }],
            &taxonomy,
            Embedder::new(32),
        );
        (ResponseBuilder::new(taxonomy), index)
    }

    fn candidate(provenance: Provenance, matched: &[&str]) -> RetrievalCandidate {
        RetrievalCandidate {
            position: 0,
            course_id: CourseId::new("c1").unwrap(),
            score: 2.0,
            provenance,
            matched_skills: matched.iter().map(|s| SkillId::new(*s)).collect(),
            in_domain: true,
        }
    }

    #[test]
    fn cards_explain_themselves_in_session_language() {
        let (builder, index) = builder();
        let en = builder.cards(&index, &[candidate(Provenance::SkillExact, &["sql"])], None, Language::En);
        assert_eq!(en[0].reason, "Teaches SQL");
        assert_eq!(en[0].duration, "10h");
        assert_eq!(en[0].level, "Beginner");

        let domain = DomainId::new("data_ai");
        let ar = builder.cards(&index, &[candidate(Provenance::Category, &[])], Some(&domain), Language::Ar);
        assert_eq!(ar[0].reason, "كورس أساسي في البيانات والذكاء الاصطناعي");
        assert_eq!(ar[0].level, "مبتدئ");
    }

    #[test]
    fn inconsistent_draft_is_replaced_by_template() {
        let (builder, index) = builder();
        let cards = builder.cards(&index, &[candidate(Provenance::Title, &[])], None, Language::En);
        let report = ConsistencyReport {
            ungrounded_titles: vec!["Made Up Course".into()],
            ungrounded_skills: Vec::new(),
        };
        let answer = builder.finalize_answer("Take Made Up Course", &report, &cards, None, Language::En);
        assert!(answer.contains("1. SQL Basics"));
        assert!(!answer.contains("Made Up"));

        let kept = builder.finalize_answer("Take SQL Basics", &ConsistencyReport::default(), &cards, None, Language::En);
        assert_eq!(kept, "Take SQL Basics");
    }

    #[test]
    fn grounded_draft_is_shown_without_citation_markers() {
        let (builder, index) = builder();
        let cards = builder.cards(&index, &[candidate(Provenance::Title, &[])], None, Language::En);
        let answer = builder.finalize_answer(
            "Start with [[SQL Basics]], then practise daily.",
            &ConsistencyReport::default(),
            &cards,
            None,
            Language::En,
        );
        assert_eq!(answer, "Start with SQL Basics, then practise daily.");
    }

    #[test]
    fn interest_choices_carry_keywords_as_aliases() {
        let (builder, _) = builder();
        let (offered, ask) = builder.interest_choices(Language::En);
        assert_eq!(offered[0].key, "A");
        assert!(offered[0].aliases.contains(&"data".to_string()));
        assert_eq!(ask.choices, vec!["A) Technology & data".to_string()]);
    }

    #[test]
    fn track_choices_are_lettered_roles() {
        let (builder, _) = builder();
        let (offered, _) = builder.track_choices(&[DomainId::new("data_ai")], Language::Ar);
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].label, "محلل بيانات");
        assert_eq!(offered[0].target, ChoiceTarget::Track(RoleId::new("data_analyst")));
    }

    #[test]
    fn canned_answers_only_for_non_retrieval_intents() {
        assert!(ResponseBuilder::canned_answer(Intent::OutOfScope, Language::Ar).is_some());
        assert!(ResponseBuilder::canned_answer(Intent::Unsafe, Language::En).is_some());
        assert!(ResponseBuilder::canned_answer(Intent::Search, Language::En).is_none());
    }

    #[test]
    fn cv_answer_lists_gaps() {
        let (builder, _) = builder();
        let dashboard = CvDashboard {
            role: RoleId::new("data_analyst"),
            role_name: "Data Analyst".into(),
            score: CvScore {
                skills: Percentage::new(60),
            },
            matched: Vec::new(),
            missing: vec![SkillGap {
                skill: SkillId::new("sql"),
                name: "SQL".into(),
                weight: 1.0,
            }],
        };
        let text = builder.cv_answer(&dashboard, Language::En);
        assert_eq!(text, "Your CV matches 60% of the skills for Data Analyst. To close the gap, focus on: SQL.");
    }
}
