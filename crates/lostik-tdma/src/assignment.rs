//! Slot ownership
//!
//! A node either has a slot assigned up front, looked up by the modem's
//! hardware EUI, or learns one at run time by claiming the first window in
//! which it transmits successfully.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ScheduleError;
use crate::schedule::{SlotDecision, SlotId, SlotPlan};

/// Static assignment of slots to hardware EUIs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotRegistry {
    slots: BTreeMap<String, SlotId>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `slot` to the device with hardware EUI `eui`
    pub fn insert(&mut self, eui: impl Into<String>, slot: SlotId) {
        self.slots.insert(eui.into().to_ascii_uppercase(), slot);
    }

    /// Slot assigned to `eui` (EUIs compare case-insensitively)
    pub fn get(&self, eui: &str) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(eui.trim()))
            .map(|(_, slot)| *slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check every assigned slot exists in `plan`
    pub fn validate(&self, plan: &SlotPlan) -> Result<(), ScheduleError> {
        match self.slots.iter().find(|(_, slot)| !plan.contains(**slot)) {
            Some((eui, slot)) => Err(ScheduleError::SlotOutOfRange {
                eui: eui.clone(),
                slot: slot.as_u32(),
                slot_count: plan.slot_count,
            }),
            None => Ok(()),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, SlotId)> for SlotRegistry {
    fn from_iter<I: IntoIterator<Item = (S, SlotId)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (eui, slot) in iter {
            registry.insert(eui, slot);
        }
        registry
    }
}

/// Decides which transmit windows belong to this node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotResolver {
    /// Slot fixed by configuration
    Static { eui: String, slot: SlotId },
    /// Slot claimed by the first successful transmission
    SelfLearning { learned: Option<SlotId> },
}

impl SlotResolver {
    /// Look up this device's slot in a static registry
    pub fn from_registry(
        registry: &SlotRegistry,
        eui: &str,
        plan: &SlotPlan,
    ) -> Result<Self, ScheduleError> {
        registry.validate(plan)?;
        let slot = registry
            .get(eui)
            .ok_or_else(|| ScheduleError::UnregisteredDevice {
                eui: eui.to_string(),
            })?;
        Ok(SlotResolver::Static {
            eui: eui.to_string(),
            slot,
        })
    }

    /// A resolver that has not yet claimed a slot
    pub fn self_learning() -> Self {
        SlotResolver::SelfLearning { learned: None }
    }

    /// The slot this node owns, once known
    pub fn owned_slot(&self) -> Option<SlotId> {
        match self {
            SlotResolver::Static { slot, .. } => Some(*slot),
            SlotResolver::SelfLearning { learned } => *learned,
        }
    }

    /// Returns true if this node may transmit in the given second
    ///
    /// Only the window second of the owned slot qualifies. An unlearned
    /// self-learning node may try any window.
    pub fn may_transmit(&self, decision: SlotDecision) -> bool {
        decision.transmit_window
            && match self.owned_slot() {
                Some(owned) => owned == decision.slot,
                None => matches!(self, SlotResolver::SelfLearning { .. }),
            }
    }

    /// Note a successful transmission in `slot`
    ///
    /// Returns the slot if this call claimed it. A learned slot never changes.
    pub fn record_success(&mut self, slot: SlotId) -> Option<SlotId> {
        match self {
            SlotResolver::SelfLearning { learned } if learned.is_none() => {
                *learned = Some(slot);
                info!("Claimed {} for this node", slot);
                Some(slot)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::SlotTable;
    use proptest::prelude::*;

    const EUI: &str = "0004A30B001A2B3C";

    fn window(slot: u32) -> SlotDecision {
        SlotDecision {
            slot: SlotId(slot),
            transmit_window: true,
        }
    }

    #[test]
    fn test_static_lookup() {
        let registry: SlotRegistry = [(EUI, SlotId(2))].into_iter().collect();
        let resolver =
            SlotResolver::from_registry(&registry, &EUI.to_lowercase(), &SlotPlan::default())
                .unwrap();
        assert_eq!(resolver.owned_slot(), Some(SlotId(2)));
        assert!(resolver.may_transmit(window(2)));
        assert!(!resolver.may_transmit(window(1)));
        assert!(!resolver.may_transmit(SlotDecision {
            slot: SlotId(2),
            transmit_window: false
        }));
    }

    #[test]
    fn test_unknown_eui_is_refused() {
        let registry: SlotRegistry = [(EUI, SlotId(1))].into_iter().collect();
        assert_eq!(
            SlotResolver::from_registry(&registry, "FFFFFFFFFFFFFFFF", &SlotPlan::default()),
            Err(ScheduleError::UnregisteredDevice {
                eui: "FFFFFFFFFFFFFFFF".into()
            })
        );
    }

    #[test]
    fn test_slot_outside_plan_is_refused() {
        let registry: SlotRegistry = [(EUI, SlotId(3))].into_iter().collect();
        assert!(matches!(
            SlotResolver::from_registry(&registry, EUI, &SlotPlan::default()),
            Err(ScheduleError::SlotOutOfRange { slot: 3, .. })
        ));
    }

    #[test]
    fn test_self_learning_claims_first_success() {
        let mut resolver = SlotResolver::self_learning();
        assert!(resolver.may_transmit(window(1)));
        assert!(resolver.may_transmit(window(2)));

        assert_eq!(resolver.record_success(SlotId(2)), Some(SlotId(2)));
        assert!(!resolver.may_transmit(window(1)));
        assert!(resolver.may_transmit(window(2)));
    }

    #[test]
    fn test_static_resolver_ignores_successes() {
        let mut resolver = SlotResolver::Static {
            eui: EUI.into(),
            slot: SlotId(1),
        };
        assert_eq!(resolver.record_success(SlotId(2)), None);
        assert_eq!(resolver.owned_slot(), Some(SlotId(1)));
    }

    #[test]
    fn test_registry_serde() {
        let registry: SlotRegistry = serde_json::from_str(r#"{"0004a30b001a2b3c": 2}"#).unwrap();
        assert_eq!(registry.get(EUI), Some(SlotId(2)));
        assert_eq!(registry.len(), 1);
    }

    proptest! {
        #[test]
        fn learned_slot_never_changes(
            first in 1u32..=2,
            later in proptest::collection::vec(1u32..=2, 0..20),
        ) {
            let mut resolver = SlotResolver::self_learning();
            resolver.record_success(SlotId(first));
            for slot in later {
                prop_assert_eq!(resolver.record_success(SlotId(slot)), None);
            }
            prop_assert_eq!(resolver.owned_slot(), Some(SlotId(first)));
        }

        #[test]
        fn owned_windows_only(slot in 1u32..=2, second in 0u32..60) {
            let table = SlotTable::new(SlotPlan::default()).unwrap();
            let resolver = SlotResolver::Static { eui: EUI.into(), slot: SlotId(slot) };
            let decision = table.decide(second);
            prop_assert_eq!(
                resolver.may_transmit(decision),
                decision.transmit_window && decision.slot == SlotId(slot)
            );
        }
    }
}
