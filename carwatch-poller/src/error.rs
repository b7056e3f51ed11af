//! Errors surfaced by coordinators.

use carwatch_types::Channel;
use thiserror::Error;

/// How a failed poll is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Access denied before the channel ever succeeded. Polling stops.
    PermanentAuthFailure,
    /// The endpoint is not supported. Polling stops.
    PermanentCapabilityMismatch,
    /// Throttled. The vehicle enters cooldown.
    TransientThrottle,
    /// Anything else. Polling continues on the normal schedule.
    TransientOther,
}

impl FailureClass {
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            FailureClass::PermanentAuthFailure | FailureClass::PermanentCapabilityMismatch
        )
    }
}

/// A poll that failed and was surfaced to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("{channel}: this endpoint is denied: {reason}")]
    AccessDenied {
        channel: Channel,
        reason: String,
        /// True when the channel had never succeeded and is now disabled.
        permanent: bool,
    },

    #[error("{channel}: this endpoint is not supported: {reason}")]
    NotSupported { channel: Channel, reason: String },

    #[error("{channel}: API throttled: {reason}")]
    Throttled { channel: Channel, reason: String },

    #[error("{channel}: error communicating with API: {reason}")]
    Remote { channel: Channel, reason: String },
}

impl PollError {
    /// The channel that failed.
    pub fn channel(&self) -> Channel {
        match self {
            PollError::AccessDenied { channel, .. }
            | PollError::NotSupported { channel, .. }
            | PollError::Throttled { channel, .. }
            | PollError::Remote { channel, .. } => *channel,
        }
    }

    /// Classification of this failure.
    pub fn class(&self) -> FailureClass {
        match self {
            PollError::AccessDenied { permanent: true, .. } => FailureClass::PermanentAuthFailure,
            PollError::AccessDenied { permanent: false, .. } => FailureClass::TransientOther,
            PollError::NotSupported { .. } => FailureClass::PermanentCapabilityMismatch,
            PollError::Throttled { .. } => FailureClass::TransientThrottle,
            PollError::Remote { .. } => FailureClass::TransientOther,
        }
    }

    /// True if the channel will not be polled again.
    pub fn is_permanent(&self) -> bool {
        self.class().is_permanent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_permanence_follows_flag() {
        let first = PollError::AccessDenied {
            channel: Channel::Hvac,
            reason: "forbidden".into(),
            permanent: true,
        };
        let later = PollError::AccessDenied {
            channel: Channel::Hvac,
            reason: "forbidden".into(),
            permanent: false,
        };

        assert_eq!(first.class(), FailureClass::PermanentAuthFailure);
        assert!(first.is_permanent());
        assert_eq!(later.class(), FailureClass::TransientOther);
        assert!(!later.is_permanent());
    }

    #[test]
    fn classes() {
        let unsupported = PollError::NotSupported {
            channel: Channel::ResState,
            reason: "501".into(),
        };
        let throttled = PollError::Throttled {
            channel: Channel::Battery,
            reason: "429".into(),
        };
        assert!(unsupported.is_permanent());
        assert_eq!(throttled.class(), FailureClass::TransientThrottle);
        assert!(!throttled.is_permanent());
    }

    #[test]
    fn message_names_channel() {
        let err = PollError::Remote {
            channel: Channel::Location,
            reason: "timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "location: error communicating with API: timeout"
        );
        assert_eq!(err.channel(), Channel::Location);
    }
}
