//! Radio link state

use std::fmt;

/// What the modem's radio is doing, as far as the service knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Configured, neither receiving nor transmitting
    #[default]
    Idle,
    /// Continuous receive mode (`radio rx 0`)
    Receiving,
    /// A `radio tx` is in flight
    Transmitting,
}

impl LinkState {
    /// Short label for status displays
    pub fn label(&self) -> &'static str {
        match self {
            LinkState::Idle => "IDLE",
            LinkState::Receiving => "RX",
            LinkState::Transmitting => "TX",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
