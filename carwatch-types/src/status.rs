//! Charge and plug states reported by the battery channel.
//!
//! The upstream API encodes both as numbers (`chargingStatus` is a float,
//! `plugStatus` an integer). These enums give the codes names.

/// Battery charge state (`chargingStatus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChargeState {
    NotInCharge,
    WaitingForAPlannedCharge,
    ChargeEnded,
    WaitingForCurrentCharge,
    EnergyFlapOpened,
    ChargeInProgress,
    V2gChargingWaiting,
    V2lConnected,
    V2gDischarging,
    V2gChargingNormal,
    /// "Not charging" on older batteries, "error" on newer ones.
    ChargeError,
    Unavailable,
}

const CHARGE_CODES: [(ChargeState, f64); 12] = [
    (ChargeState::NotInCharge, 0.0),
    (ChargeState::WaitingForAPlannedCharge, 0.1),
    (ChargeState::ChargeEnded, 0.2),
    (ChargeState::WaitingForCurrentCharge, 0.3),
    (ChargeState::EnergyFlapOpened, 0.4),
    (ChargeState::ChargeInProgress, 1.0),
    (ChargeState::V2gChargingWaiting, -1.3),
    (ChargeState::V2lConnected, -1.4),
    (ChargeState::V2gDischarging, -1.5),
    (ChargeState::V2gChargingNormal, -1.6),
    (ChargeState::ChargeError, -1.0),
    (ChargeState::Unavailable, -1.1),
];

impl ChargeState {
    /// Decode a numeric `chargingStatus`.
    pub fn from_code(code: f64) -> Option<Self> {
        CHARGE_CODES
            .iter()
            .find(|(_, c)| {
                let diff = c - code;
                diff < 1e-6 && diff > -1e-6
            })
            .map(|(state, _)| *state)
    }

    /// The numeric code used upstream.
    pub fn code(&self) -> f64 {
        CHARGE_CODES
            .iter()
            .find(|(state, _)| state == self)
            .map(|(_, c)| *c)
            .unwrap_or(-1.1)
    }

    /// Lowercase snake-case name, as exposed to consumers.
    pub fn name(&self) -> &'static str {
        match self {
            ChargeState::NotInCharge => "not_in_charge",
            ChargeState::WaitingForAPlannedCharge => "waiting_for_a_planned_charge",
            ChargeState::ChargeEnded => "charge_ended",
            ChargeState::WaitingForCurrentCharge => "waiting_for_current_charge",
            ChargeState::EnergyFlapOpened => "energy_flap_opened",
            ChargeState::ChargeInProgress => "charge_in_progress",
            ChargeState::V2gChargingWaiting => "v2g_charging_waiting",
            ChargeState::V2lConnected => "v2l_connected",
            ChargeState::V2gDischarging => "v2g_discharging",
            ChargeState::V2gChargingNormal => "v2g_charging_normal",
            ChargeState::ChargeError => "charge_error",
            ChargeState::Unavailable => "unavailable",
        }
    }

    /// States that imply a cable is connected.
    pub fn implies_plugged(&self) -> bool {
        matches!(
            self,
            ChargeState::ChargeInProgress
                | ChargeState::WaitingForAPlannedCharge
                | ChargeState::WaitingForCurrentCharge
                | ChargeState::ChargeEnded
                | ChargeState::V2gChargingWaiting
                | ChargeState::V2gChargingNormal
                | ChargeState::V2gDischarging
                | ChargeState::V2lConnected
        )
    }
}

/// Charging cable state (`plugStatus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlugState {
    Unplugged,
    Plugged,
    PlugError,
    PlugUnknown,
}

impl PlugState {
    /// Decode a numeric `plugStatus`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PlugState::Unplugged),
            1 => Some(PlugState::Plugged),
            -1 => Some(PlugState::PlugError),
            -2147483648 => Some(PlugState::PlugUnknown),
            _ => None,
        }
    }

    /// The numeric code used upstream.
    pub fn code(&self) -> i64 {
        match self {
            PlugState::Unplugged => 0,
            PlugState::Plugged => 1,
            PlugState::PlugError => -1,
            PlugState::PlugUnknown => -2147483648,
        }
    }

    /// Lowercase snake-case name, as exposed to consumers.
    pub fn name(&self) -> &'static str {
        match self {
            PlugState::Unplugged => "unplugged",
            PlugState::Plugged => "plugged",
            PlugState::PlugError => "plug_error",
            PlugState::PlugUnknown => "plug_unknown",
        }
    }
}
