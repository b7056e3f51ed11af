//! Suppression of implausible full-charge battery readings.
//!
//! Some vehicle models occasionally report a 100% battery level that is not
//! real. The [`ReadingSanitizer`] decides, from a short history and the
//! charge/plug/range signals reported alongside the level, whether a full
//! reading can be trusted. When it cannot, the last trusted level is emitted
//! instead; values are never interpolated.
//!
//! # State transitions
//!
//! * A reading below 100 is always trusted. It becomes the new baseline and
//!   clears every streak flag.
//! * A reading at 100 extends the current streak:
//!   * if a "charge ended" status has been seen in the streak, it is accepted;
//!   * otherwise the plausibility checks run in order (charge/plug state,
//!     range floor, implied charge rate, charging observed) and the first
//!     failing check suppresses it;
//!   * a suppression caused by the charge/plug state or by the missing
//!     charging observation may be overridden once per streak, if charging
//!     was seen on an earlier full reading of the streak and enough time has
//!     passed since the baseline for it to explain a full battery. Charging
//!     on the baseline itself does not count.
//!
//! Models without a [`DefectProfile`] bypass all of this.

use carwatch_types::{ChargeState, PlugState, Snapshot};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Level at or above which a reading is considered full.
pub const FULL: f64 = 100.0;

/// Thresholds for a model known to report false full readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectProfile {
    pub model_id: String,
    /// Usable battery capacity.
    pub battery_capacity_kwh: f64,
    /// Fastest charge the vehicle accepts.
    pub max_charge_power_kw: f64,
    /// Range below which a full battery is not believable.
    pub min_full_range_km: f64,
}

impl DefectProfile {
    /// Model code of the Twingo III electric.
    pub const TWINGO_III: &'static str = "X071VE";

    /// Known profile for the Twingo III: 22 kWh pack, 22 kW charger.
    pub fn twingo_iii() -> Self {
        Self {
            model_id: Self::TWINGO_III.to_string(),
            battery_capacity_kwh: 22.0,
            max_charge_power_kw: 22.0,
            min_full_range_km: 170.0,
        }
    }

    /// Find the profile for a model, if it has one.
    pub fn lookup<'a>(profiles: &'a [DefectProfile], model_id: &str) -> Option<&'a DefectProfile> {
        profiles.iter().find(|p| p.model_id == model_id)
    }

    /// Energy needed to go from `from_percent` to full.
    fn energy_to_full_kwh(&self, from_percent: f64) -> f64 {
        (FULL - from_percent) / 100.0 * self.battery_capacity_kwh
    }
}

/// Gauges that go through a sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GaugeSignal {
    BatteryLevel,
}

/// One battery reading with its side signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeInput {
    pub percent: Option<f64>,
    pub charge_state: Option<ChargeState>,
    pub plug_state: Option<PlugState>,
    pub range_km: Option<f64>,
    pub observed_at: Instant,
}

impl GaugeInput {
    /// Extract the gauge and side signals from a battery snapshot.
    pub fn from_snapshot(snapshot: &Snapshot, observed_at: Instant) -> Self {
        Self {
            percent: snapshot.get_f64("batteryLevel"),
            charge_state: snapshot.charge_state(),
            plug_state: snapshot.plug_state(),
            range_km: snapshot.get_f64("batteryAutonomy"),
            observed_at,
        }
    }
}

/// The last reading that was accepted below full.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustedReading {
    pub percent: f64,
    pub at: Instant,
    pub range_km: Option<f64>,
}

/// Flags describing the current streak of full readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakFlags {
    /// At least one full reading has been evaluated since the baseline.
    pub in_streak: bool,
    /// A "charge ended" status confirmed the battery is full.
    pub full_corroborated: bool,
    /// Charging was observed during the streak.
    pub charging_seen: bool,
    /// The one override of the streak has been used.
    pub override_spent: bool,
}

/// Everything the sanitizer remembers between readings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SanitizerState {
    pub last_trusted: Option<TrustedReading>,
    pub last_charge_state: Option<ChargeState>,
    pub streak: StreakFlags,
}

/// Why a full reading was not trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Charge state missing, unavailable or waiting, or plug state unknown.
    UncertainChargeState,
    /// Range missing or below the profile floor.
    RangeTooLow,
    /// Reaching full from the baseline would exceed the charger power.
    ImplausibleChargeRate,
    /// Jumped to full with no charging on either side of the jump.
    NoChargingObserved,
}

impl SuppressReason {
    /// Whether observed charging may override this suppression.
    pub fn is_overridable(&self) -> bool {
        matches!(
            self,
            SuppressReason::UncertainChargeState | SuppressReason::NoChargingObserved
        )
    }
}

/// How the output value was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not subject to sanitizing (no reading or unaffected model).
    PassThrough,
    /// Below full; stored as the new baseline.
    Baseline,
    /// Full, confirmed by a charge-ended status in this streak.
    Corroborated,
    /// Full, and every plausibility check passed.
    Plausible,
    /// Full, a check failed but observed charging explains it.
    Overridden(SuppressReason),
    /// Full, not trusted; the last trusted level is emitted.
    Suppressed(SuppressReason),
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanitizedReading {
    pub value: Option<f64>,
    pub verdict: Verdict,
}

impl SanitizedReading {
    pub fn is_suppressed(&self) -> bool {
        matches!(self.verdict, Verdict::Suppressed(_))
    }
}

/// Stateful filter for one vehicle's battery gauge.
#[derive(Debug, Clone, Default)]
pub struct ReadingSanitizer {
    profile: Option<DefectProfile>,
    state: SanitizerState,
}

impl ReadingSanitizer {
    /// Create a sanitizer. With `None` every reading passes through.
    pub fn new(profile: Option<DefectProfile>) -> Self {
        Self {
            profile,
            state: SanitizerState::default(),
        }
    }

    /// Create a sanitizer for a model, using its profile if one is listed.
    pub fn for_model(model_id: &str, profiles: &[DefectProfile]) -> Self {
        Self::new(DefectProfile::lookup(profiles, model_id).cloned())
    }

    /// True if readings of this vehicle are checked.
    pub fn is_active(&self) -> bool {
        self.profile.is_some()
    }

    pub fn profile(&self) -> Option<&DefectProfile> {
        self.profile.as_ref()
    }

    pub fn state(&self) -> &SanitizerState {
        &self.state
    }

    /// Evaluate one reading and update the history.
    pub fn evaluate(&mut self, input: &GaugeInput) -> SanitizedReading {
        let Some(raw) = input.percent else {
            return SanitizedReading {
                value: None,
                verdict: Verdict::PassThrough,
            };
        };

        if raw < FULL {
            self.state = SanitizerState {
                last_trusted: Some(TrustedReading {
                    percent: raw,
                    at: input.observed_at,
                    range_km: input.range_km,
                }),
                last_charge_state: input.charge_state,
                streak: StreakFlags::default(),
            };
            return SanitizedReading {
                value: Some(raw),
                verdict: Verdict::Baseline,
            };
        }

        let Some(profile) = self.profile.as_ref() else {
            return SanitizedReading {
                value: Some(raw),
                verdict: Verdict::PassThrough,
            };
        };

        let previous_charge = self.state.last_charge_state;
        let first_of_streak = !self.state.streak.in_streak;
        let charging_now = input.charge_state == Some(ChargeState::ChargeInProgress);
        let charging_before = previous_charge == Some(ChargeState::ChargeInProgress);

        // Only charging seen on an earlier full reading can override this one.
        let override_allowed = self.state.streak.charging_seen;
        let streak = &mut self.state.streak;
        streak.in_streak = true;
        if charging_now {
            streak.charging_seen = true;
        }
        self.state.last_charge_state = input.charge_state;

        if self.state.streak.full_corroborated {
            return accept(raw, Verdict::Corroborated);
        }
        if input.charge_state == Some(ChargeState::ChargeEnded) {
            self.state.streak.full_corroborated = true;
            return accept(raw, Verdict::Corroborated);
        }

        let trusted = self.state.last_trusted;
        let reason = plausibility(profile, input, raw, trusted, first_of_streak, charging_before);
        let Some(reason) = reason else {
            return accept(raw, Verdict::Plausible);
        };

        let streak = &mut self.state.streak;
        let explained = trusted.map_or(true, |t| {
            let hours = input.observed_at.saturating_duration_since(t.at).as_secs_f64() / 3600.0;
            hours * profile.max_charge_power_kw >= profile.energy_to_full_kwh(t.percent)
        });
        if reason.is_overridable() && override_allowed && !streak.override_spent && explained {
            streak.override_spent = true;
            tracing::info!(model = %profile.model_id, ?reason, "full battery explained by charging");
            return accept(raw, Verdict::Overridden(reason));
        }

        tracing::warn!(
            model = %profile.model_id,
            ?reason,
            fallback = ?trusted.map(|t| t.percent),
            "suppressing implausible full battery reading"
        );
        SanitizedReading {
            value: trusted.map(|t| t.percent),
            verdict: Verdict::Suppressed(reason),
        }
    }
}

fn accept(raw: f64, verdict: Verdict) -> SanitizedReading {
    SanitizedReading {
        value: Some(raw),
        verdict,
    }
}

/// First failing plausibility check for a full reading, if any.
fn plausibility(
    profile: &DefectProfile,
    input: &GaugeInput,
    raw: f64,
    trusted: Option<TrustedReading>,
    first_of_streak: bool,
    charging_before: bool,
) -> Option<SuppressReason> {
    let uncertain_charge = matches!(
        input.charge_state,
        None | Some(ChargeState::Unavailable) | Some(ChargeState::WaitingForCurrentCharge)
    );
    let uncertain_plug = matches!(input.plug_state, None | Some(PlugState::PlugUnknown));
    if uncertain_charge || uncertain_plug {
        return Some(SuppressReason::UncertainChargeState);
    }

    match input.range_km {
        Some(range) if range >= profile.min_full_range_km => {}
        _ => return Some(SuppressReason::RangeTooLow),
    }

    let trusted = trusted?;

    let gained_kwh = (raw - trusted.percent) / 100.0 * profile.battery_capacity_kwh;
    let hours = input
        .observed_at
        .saturating_duration_since(trusted.at)
        .as_secs_f64()
        / 3600.0;
    if gained_kwh > 0.0 && (hours <= 0.0 || gained_kwh / hours > profile.max_charge_power_kw) {
        return Some(SuppressReason::ImplausibleChargeRate);
    }

    let charging_now = input.charge_state == Some(ChargeState::ChargeInProgress);
    if first_of_streak && !charging_before && !charging_now {
        return Some(SuppressReason::NoChargingObserved);
    }

    None
}
