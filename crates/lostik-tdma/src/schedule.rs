//! Time-slot schedule
//!
//! Each minute is divided into repeating cycles of `slot_count` slots, each
//! `seconds_per_slot` long. The first second of a slot is its transmit window;
//! the rest of the slot, like every other slot, is for listening. Slot numbers
//! start at 1.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Seconds in the schedule's period
pub const SECONDS_PER_MINUTE: u32 = 60;

/// A numbered time slot (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl SlotId {
    /// Get the raw slot number
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Slot layout of the shared channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotPlan {
    pub seconds_per_slot: u32,
    pub slot_count: u32,
}

impl Default for SlotPlan {
    fn default() -> Self {
        Self {
            seconds_per_slot: 5,
            slot_count: 2,
        }
    }
}

impl SlotPlan {
    /// Create a plan, rejecting layouts that do not tile a minute
    pub fn new(seconds_per_slot: u32, slot_count: u32) -> Result<Self, ScheduleError> {
        let plan = Self {
            seconds_per_slot,
            slot_count,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Check that the plan splits the minute into whole cycles
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let valid = self.seconds_per_slot >= 1
            && self.slot_count >= 1
            && self
                .cycle_seconds()
                .is_some_and(|cycle| SECONDS_PER_MINUTE % cycle == 0);
        if valid {
            Ok(())
        } else {
            Err(ScheduleError::InvalidSlotPlan {
                seconds_per_slot: self.seconds_per_slot,
                slot_count: self.slot_count,
            })
        }
    }

    /// Length of one full cycle through every slot
    pub fn cycle_seconds(&self) -> Option<u32> {
        self.seconds_per_slot.checked_mul(self.slot_count)
    }

    /// Returns true if `slot` exists in this plan
    pub fn contains(&self, slot: SlotId) -> bool {
        (1..=self.slot_count).contains(&slot.0)
    }
}

/// What the schedule says about one second of the minute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDecision {
    /// Slot that owns this second
    pub slot: SlotId,
    /// True only for the first second of the slot
    pub transmit_window: bool,
}

/// Precomputed decisions for every second of the minute
#[derive(Debug, Clone)]
pub struct SlotTable {
    decisions: Vec<SlotDecision>,
}

impl SlotTable {
    /// Build the table for a plan
    pub fn new(plan: SlotPlan) -> Result<Self, ScheduleError> {
        plan.validate()?;
        let decisions = (0..SECONDS_PER_MINUTE)
            .map(|s| SlotDecision {
                slot: SlotId((s / plan.seconds_per_slot) % plan.slot_count + 1),
                transmit_window: s % plan.seconds_per_slot == 0,
            })
            .collect();
        Ok(Self { decisions })
    }

    /// Decision for a second of the minute; larger values wrap
    pub fn decide(&self, second: u32) -> SlotDecision {
        self.decisions[(second % SECONDS_PER_MINUTE) as usize]
    }
}
