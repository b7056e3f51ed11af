//! Polled data channels.

use alloc::string::String;
use core::fmt;
use core::str::FromStr;

/// One independently polled data category of a vehicle.
///
/// Every channel maps to exactly one upstream endpoint and is refreshed by its
/// own coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Channel {
    /// Battery level, range, plug and charge state.
    Battery,
    /// Charge mode (always / scheduled).
    ChargeMode,
    /// Odometer and fuel gauges.
    Cockpit,
    /// Climate control state and outside temperature.
    Hvac,
    /// GPS position.
    Location,
    /// Door, hatch and lock state.
    Lock,
    /// Remote engine start (reservation) state.
    ResState,
}

impl Channel {
    /// All channels, in polling order.
    pub const ALL: [Channel; 7] = [
        Channel::Battery,
        Channel::ChargeMode,
        Channel::Cockpit,
        Channel::Hvac,
        Channel::Location,
        Channel::Lock,
        Channel::ResState,
    ];

    /// Short identifier used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Battery => "battery",
            Channel::ChargeMode => "charge_mode",
            Channel::Cockpit => "cockpit",
            Channel::Hvac => "hvac",
            Channel::Location => "location",
            Channel::Lock => "lock",
            Channel::ResState => "res_state",
        }
    }

    /// Upstream endpoint path segment for this channel.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Channel::Battery => "battery-status",
            Channel::ChargeMode => "charge-mode",
            Channel::Cockpit => "cockpit",
            Channel::Hvac => "hvac-status",
            Channel::Location => "location",
            Channel::Lock => "lock-status",
            Channel::ResState => "res-state",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChannel(pub String);

impl fmt::Display for UnknownChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown channel: {}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownChannel {}

impl FromStr for Channel {
    type Err = UnknownChannel;

    /// Accepts both the short identifier and the endpoint name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.endpoint() == s)
            .ok_or_else(|| UnknownChannel(s.into()))
    }
}
