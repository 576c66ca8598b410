use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::EnvError;
use crate::types::Observation;

/// The two moves available to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplorationAction {
    /// Move the selection cursor to the next interactable element.
    AdvanceSelection,
    /// Click the selected element, closing the current action phase.
    Interact,
}

impl TryFrom<u64> for ExplorationAction {
    type Error = EnvError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AdvanceSelection),
            1 => Ok(Self::Interact),
            other => Err(EnvError::InvalidAction(other)),
        }
    }
}

impl From<ExplorationAction> for u64 {
    fn from(action: ExplorationAction) -> Self {
        match action {
            ExplorationAction::AdvanceSelection => 0,
            ExplorationAction::Interact => 1,
        }
    }
}

/// Discrete space `{0, .., n - 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    n: u64,
}

impl ActionSpace {
    pub const fn discrete(n: u64) -> Self {
        Self { n }
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn contains(&self, action: u64) -> bool {
        action < self.n
    }

    /// Uniformly random member of the space.
    pub fn sample(&self) -> u64 {
        rand::random_range(0..self.n)
    }
}

/// Shape of an [`Observation`]: one non-negative count per tracked keyword,
/// plus the interactable count and actions since the last interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    keywords: BTreeSet<String>,
}

impl ObservationSpace {
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords.iter().cloned().collect(),
        }
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn contains(&self, observation: &Observation) -> bool {
        observation.keywords.keys().eq(self.keywords.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn actions_round_trip_through_their_index() {
        assert_eq!(
            ExplorationAction::try_from(0).unwrap(),
            ExplorationAction::AdvanceSelection
        );
        assert_eq!(ExplorationAction::try_from(1).unwrap(), ExplorationAction::Interact);
        assert_eq!(u64::from(ExplorationAction::Interact), 1);
    }

    #[test]
    fn out_of_range_action_is_rejected() {
        assert!(matches!(
            ExplorationAction::try_from(2),
            Err(EnvError::InvalidAction(2))
        ));
    }

    #[test]
    fn samples_stay_inside_the_space() {
        let space = ActionSpace::discrete(2);
        for _ in 0..100 {
            assert!(space.contains(space.sample()));
        }
        assert!(!space.contains(2));
    }

    #[test]
    fn observation_must_carry_exactly_the_tracked_keywords() {
        let space = ObservationSpace::new(&["error".to_string(), "login".to_string()]);
        let mut observation = Observation {
            keywords: BTreeMap::from([("error".to_string(), 0), ("login".to_string(), 2)]),
            interactables: 3,
            actions_since_interaction: 0,
        };
        assert!(space.contains(&observation));

        observation.keywords.remove("login");
        assert!(!space.contains(&observation));
    }
}
