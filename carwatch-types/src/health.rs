//! Channel health as seen by consumers.

use core::fmt;

/// Failure mode of a polled channel.
///
/// `Healthy` is the initial state. Leaving it is one-way: a `Denied` or
/// `Unsupported` channel is never polled again for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChannelHealth {
    #[default]
    Healthy,
    /// The account has no rights on this endpoint.
    Denied,
    /// The vehicle does not support this endpoint.
    Unsupported,
}

impl ChannelHealth {
    /// True once the channel has been permanently demoted.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelHealth::Healthy)
    }

    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            ChannelHealth::Healthy => "OK",
            ChannelHealth::Denied => "DENIED",
            ChannelHealth::Unsupported => "N/A",
        }
    }
}

impl fmt::Display for ChannelHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
