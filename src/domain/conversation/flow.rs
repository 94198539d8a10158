//! Multi-turn flows and their transition function.
//!
//! A session is in at most one flow at a time. Each flow carries only the
//! fields that make sense for it, so impossible combinations (a plan
//! waiting on a slot while an exploration track is chosen) cannot be
//! represented.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Percentage, StateMachine, ValidationError};
use crate::domain::taxonomy::{DomainId, RoleId};

/// The active flow of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Flow {
    #[default]
    None,
    Exploration(ExplorationFlow),
    PlanBuilding(PlanBuildingFlow),
    CvReview(CvReviewFlow),
}

/// Flow discriminant, used where only the flow's identity matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowKind {
    #[default]
    None,
    Exploration,
    PlanBuilding,
    CvReview,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowKind::None => "NONE",
            FlowKind::Exploration => "EXPLORATION",
            FlowKind::PlanBuilding => "PLAN_BUILDING",
            FlowKind::CvReview => "CV_REVIEW",
        };
        f.write_str(name)
    }
}

/// Stages of the exploration diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExplorationStage {
    /// Waiting for the user to pick an interest area.
    DomainChoice,
    /// Waiting for the user to pick a track within the chosen domains.
    TrackChoice,
    /// Track known; results shown.
    Results,
}

impl StateMachine for ExplorationStage {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ExplorationStage::*;
        matches!((self, target), (DomainChoice, TrackChoice) | (TrackChoice, Results))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ExplorationStage::*;
        match self {
            DomainChoice => vec![TrackChoice],
            TrackChoice => vec![Results],
            Results => vec![],
        }
    }
}

/// What picking an offered choice selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ChoiceTarget {
    /// An interest area, by its letter key.
    Interest(String),
    Track(RoleId),
}

/// A lettered choice shown to the user in an `ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferedChoice {
    /// Letter shown to the user (`A`, `B`, ...).
    pub key: String,
    /// Display label in the session language.
    pub label: String,
    /// Extra surface forms that select this choice.
    #[serde(default)]
    pub aliases: Vec<String>,
    pub target: ChoiceTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationFlow {
    pub stage: ExplorationStage,
    /// Choices offered in the last `ask` of this flow.
    #[serde(default)]
    pub offered: Vec<OfferedChoice>,
    pub interest: Option<String>,
    #[serde(default)]
    pub domains: Vec<DomainId>,
    pub track: Option<RoleId>,
}

/// A required plan slot the flow is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSlot {
    Domain,
    Duration,
    HoursPerDay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanBuildingFlow {
    pub awaiting: Option<PlanSlot>,
    /// A plan has been produced from the current slots.
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvReviewFlow {
    pub role: RoleId,
    pub score: Percentage,
}

/// Something that happened in a turn that may move the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// Open the diagnostic with the interest-area question.
    ExplorationStarted { offered: Vec<OfferedChoice> },
    /// An interest area was picked; tracks are offered next.
    InterestChosen {
        interest: String,
        domains: Vec<DomainId>,
        offered: Vec<OfferedChoice>,
    },
    /// The message named a field but no track; tracks are offered next.
    DomainResolved {
        domains: Vec<DomainId>,
        offered: Vec<OfferedChoice>,
    },
    TrackChosen { track: RoleId },
    /// Domain and skills resolved in one message: straight to results.
    FastPath {
        domains: Vec<DomainId>,
        track: Option<RoleId>,
    },
    PlanSlotRequested(PlanSlot),
    PlanCompleted,
    CvReviewed { role: RoleId, score: Percentage },
    Reset,
}

impl FlowEvent {
    fn name(&self) -> &'static str {
        match self {
            FlowEvent::ExplorationStarted { .. } => "exploration_started",
            FlowEvent::InterestChosen { .. } => "interest_chosen",
            FlowEvent::DomainResolved { .. } => "domain_resolved",
            FlowEvent::TrackChosen { .. } => "track_chosen",
            FlowEvent::FastPath { .. } => "fast_path",
            FlowEvent::PlanSlotRequested(_) => "plan_slot_requested",
            FlowEvent::PlanCompleted => "plan_completed",
            FlowEvent::CvReviewed { .. } => "cv_reviewed",
            FlowEvent::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("event '{event}' is not valid in flow {from}")]
    InvalidTransition { from: FlowKind, event: &'static str },

    #[error(transparent)]
    Stage(#[from] ValidationError),
}

impl Flow {
    pub fn kind(&self) -> FlowKind {
        match self {
            Flow::None => FlowKind::None,
            Flow::Exploration(_) => FlowKind::Exploration,
            Flow::PlanBuilding(_) => FlowKind::PlanBuilding,
            Flow::CvReview(_) => FlowKind::CvReview,
        }
    }

    pub fn exploration(&self) -> Option<&ExplorationFlow> {
        match self {
            Flow::Exploration(flow) => Some(flow),
            _ => None,
        }
    }

    /// Choices the last `ask` offered, if the flow is waiting on one.
    pub fn offered_choices(&self) -> &[OfferedChoice] {
        match self {
            Flow::Exploration(flow) if flow.stage != ExplorationStage::Results => &flow.offered,
            _ => &[],
        }
    }

    pub fn awaiting_plan_slot(&self) -> Option<PlanSlot> {
        match self {
            Flow::PlanBuilding(flow) => flow.awaiting,
            _ => None,
        }
    }
}

/// Applies an event to a flow.
///
/// Events that open a flow (exploration start, fast path, plan and CV
/// events, reset) are valid from anywhere and abandon the current flow.
/// Stage answers (interest, track) are only valid at their stage.
pub fn transition(flow: &Flow, event: FlowEvent) -> Result<Flow, FlowError> {
    let from = flow.kind();
    let event_name = event.name();

    let next = match event {
        FlowEvent::ExplorationStarted { offered } => Flow::Exploration(ExplorationFlow {
            stage: ExplorationStage::DomainChoice,
            offered,
            interest: None,
            domains: Vec::new(),
            track: None,
        }),
        FlowEvent::InterestChosen {
            interest,
            domains,
            offered,
        } => {
            let current = flow.exploration().ok_or(FlowError::InvalidTransition {
                from,
                event: event_name,
            })?;
            let stage = current.stage.transition_to(ExplorationStage::TrackChoice)?;
            Flow::Exploration(ExplorationFlow {
                stage,
                offered,
                interest: Some(interest),
                domains,
                track: None,
            })
        }
        FlowEvent::DomainResolved { domains, offered } => {
            let interest = match flow.exploration() {
                Some(current) if current.stage == ExplorationStage::DomainChoice => {
                    current.stage.transition_to(ExplorationStage::TrackChoice)?;
                    current.interest.clone()
                }
                _ => None,
            };
            Flow::Exploration(ExplorationFlow {
                stage: ExplorationStage::TrackChoice,
                offered,
                interest,
                domains,
                track: None,
            })
        }
        FlowEvent::TrackChosen { track } => {
            let current = flow.exploration().ok_or(FlowError::InvalidTransition {
                from,
                event: event_name,
            })?;
            let stage = current.stage.transition_to(ExplorationStage::Results)?;
            Flow::Exploration(ExplorationFlow {
                stage,
                offered: Vec::new(),
                interest: current.interest.clone(),
                domains: current.domains.clone(),
                track: Some(track),
            })
        }
        FlowEvent::FastPath { domains, track } => Flow::Exploration(ExplorationFlow {
            stage: ExplorationStage::Results,
            offered: Vec::new(),
            interest: None,
            domains,
            track,
        }),
        FlowEvent::PlanSlotRequested(slot) => Flow::PlanBuilding(PlanBuildingFlow {
            awaiting: Some(slot),
            completed: false,
        }),
        FlowEvent::PlanCompleted => Flow::PlanBuilding(PlanBuildingFlow {
            awaiting: None,
            completed: true,
        }),
        FlowEvent::CvReviewed { role, score } => Flow::CvReview(CvReviewFlow { role, score }),
        FlowEvent::Reset => Flow::None,
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interest_choice(key: &str) -> OfferedChoice {
        OfferedChoice {
            key: key.to_string(),
            label: format!("Area {}", key),
            aliases: Vec::new(),
            target: ChoiceTarget::Interest(key.to_string()),
        }
    }

    fn track_choice(key: &str, role: &str) -> OfferedChoice {
        OfferedChoice {
            key: key.to_string(),
            label: role.to_string(),
            aliases: Vec::new(),
            target: ChoiceTarget::Track(RoleId::new(role)),
        }
    }

    #[test]
    fn exploration_walks_forward_through_stages() {
        let flow = transition(
            &Flow::None,
            FlowEvent::ExplorationStarted {
                offered: vec![interest_choice("A"), interest_choice("B")],
            },
        )
        .unwrap();
        assert_eq!(flow.exploration().unwrap().stage, ExplorationStage::DomainChoice);
        assert_eq!(flow.offered_choices().len(), 2);

        let flow = transition(
            &flow,
            FlowEvent::InterestChosen {
                interest: "A".into(),
                domains: vec![DomainId::new("data_ai")],
                offered: vec![track_choice("A", "data_analyst")],
            },
        )
        .unwrap();
        let exploration = flow.exploration().unwrap();
        assert_eq!(exploration.stage, ExplorationStage::TrackChoice);
        assert_eq!(exploration.interest.as_deref(), Some("A"));

        let flow = transition(
            &flow,
            FlowEvent::TrackChosen {
                track: RoleId::new("data_analyst"),
            },
        )
        .unwrap();
        let exploration = flow.exploration().unwrap();
        assert_eq!(exploration.stage, ExplorationStage::Results);
        assert_eq!(exploration.domains, vec![DomainId::new("data_ai")]);
        assert!(flow.offered_choices().is_empty());
    }

    #[test]
    fn fast_path_goes_straight_to_results() {
        let flow = transition(
            &Flow::None,
            FlowEvent::FastPath {
                domains: vec![DomainId::new("data_ai")],
                track: None,
            },
        )
        .unwrap();
        assert_eq!(flow.exploration().unwrap().stage, ExplorationStage::Results);
    }

    #[test]
    fn track_answer_outside_exploration_is_rejected() {
        let err = transition(
            &Flow::None,
            FlowEvent::TrackChosen {
                track: RoleId::new("data_analyst"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FlowError::InvalidTransition { from: FlowKind::None, .. }));
    }

    #[test]
    fn track_answer_at_domain_stage_is_rejected() {
        let flow = transition(&Flow::None, FlowEvent::ExplorationStarted { offered: vec![] }).unwrap();
        let err = transition(
            &flow,
            FlowEvent::TrackChosen {
                track: RoleId::new("data_analyst"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FlowError::Stage(_)));
    }

    #[test]
    fn domain_resolved_keeps_chosen_interest() {
        let flow = transition(&Flow::None, FlowEvent::ExplorationStarted { offered: vec![] }).unwrap();
        let flow = match flow {
            Flow::Exploration(mut e) => {
                e.interest = Some("C".into());
                Flow::Exploration(e)
            }
            other => other,
        };
        let next = transition(
            &flow,
            FlowEvent::DomainResolved {
                domains: vec![DomainId::new("design")],
                offered: vec![],
            },
        )
        .unwrap();
        assert_eq!(next.exploration().unwrap().interest.as_deref(), Some("C"));
        assert_eq!(next.exploration().unwrap().stage, ExplorationStage::TrackChoice);
    }

    #[test]
    fn plan_events_track_awaited_slot() {
        let flow = transition(&Flow::None, FlowEvent::PlanSlotRequested(PlanSlot::Domain)).unwrap();
        assert_eq!(flow.awaiting_plan_slot(), Some(PlanSlot::Domain));

        let flow = transition(&flow, FlowEvent::PlanCompleted).unwrap();
        assert_eq!(flow.awaiting_plan_slot(), None);
        assert_eq!(flow.kind(), FlowKind::PlanBuilding);
    }

    #[test]
    fn results_stage_is_terminal() {
        assert!(ExplorationStage::Results.is_terminal());
        assert!(!ExplorationStage::DomainChoice.can_transition_to(&ExplorationStage::Results));
    }

    #[test]
    fn flow_round_trips_through_yaml() {
        let flow = Flow::PlanBuilding(PlanBuildingFlow {
            awaiting: Some(PlanSlot::HoursPerDay),
            completed: false,
        });
        let yaml = serde_yaml::to_string(&flow).unwrap();
        let back: Flow = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, flow);
    }
}
