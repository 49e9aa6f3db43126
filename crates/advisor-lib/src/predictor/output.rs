//! Decision engine
//!
//! Turns raw estimator outputs into recommendations: a charging suggestion for
//! a predicted range, and a maintenance projection for a failure probability.
//! Both policies are pure. Out-of-bounds predictions are rejected with a
//! [`DomainError`] and never clamped.

use crate::error::DomainError;
use crate::models::{MaintenanceResponse, TripContext};
use chrono::{Days, NaiveDate};
use std::fmt;

/// Range must exceed the trip by this factor to skip charging
pub const RANGE_BUFFER_FACTOR: f64 = 1.2;

/// Below this state of charge the driver is told to charge immediately
pub const LOW_SOC_PERCENT: f64 = 20.0;

/// Charge level suggested when the battery is low
pub const IMMEDIATE_CHARGE_PERCENT: u32 = 50;

/// Upper bound on a suggested charge level
pub const MAX_CHARGE_PERCENT: f64 = 80.0;

/// Failure probability above which maintenance is due
pub const MAINTENANCE_THRESHOLD: f64 = 0.6;

/// Longest maintenance horizon in days
pub const MAINTENANCE_HORIZON_DAYS: f64 = 30.0;

/// Date format used on the wire
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Charging policy constants
#[derive(Debug, Clone)]
pub struct ChargingConfig {
    pub range_buffer_factor: f64,
    pub low_soc_percent: f64,
    pub immediate_charge_percent: u32,
    pub max_charge_percent: f64,
}

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            range_buffer_factor: RANGE_BUFFER_FACTOR,
            low_soc_percent: LOW_SOC_PERCENT,
            immediate_charge_percent: IMMEDIATE_CHARGE_PERCENT,
            max_charge_percent: MAX_CHARGE_PERCENT,
        }
    }
}

/// Outcome of the charging policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargingSuggestion {
    NoChargeNeeded,
    ChargeImmediately { minimum_percent: u32 },
    ChargeTo { percent: u32 },
}

impl fmt::Display for ChargingSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargingSuggestion::NoChargeNeeded => write!(f, "No charging needed for this trip."),
            ChargingSuggestion::ChargeImmediately { minimum_percent } => write!(
                f,
                "Charge immediately to at least {}% for battery health.",
                minimum_percent
            ),
            ChargingSuggestion::ChargeTo { percent } => write!(
                f,
                "Charge to {}% for optimal range and battery health.",
                percent
            ),
        }
    }
}

/// Maps a predicted range and trip context to a charging suggestion
#[derive(Debug, Clone, Default)]
pub struct ChargingPolicy {
    config: ChargingConfig,
}

impl ChargingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChargingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChargingConfig {
        &self.config
    }

    /// Suggestion for a trip, or `None` when the context has no trip distance
    pub fn recommend(
        &self,
        predicted_range: f64,
        context: &TripContext,
    ) -> Result<Option<ChargingSuggestion>, DomainError> {
        let range = check_range(predicted_range)?;
        Ok(context
            .trip_distance
            .map(|distance| self.suggest(range, context.soc, distance)))
    }

    /// `range` must already be checked and `trip_distance` positive
    fn suggest(&self, range: f64, soc: f64, trip_distance: f64) -> ChargingSuggestion {
        if range >= self.config.range_buffer_factor * trip_distance {
            return ChargingSuggestion::NoChargeNeeded;
        }
        if soc < self.config.low_soc_percent {
            return ChargingSuggestion::ChargeImmediately {
                minimum_percent: self.config.immediate_charge_percent,
            };
        }
        // range == 0 gives an infinite ratio, which the cap absorbs
        let target = (trip_distance / range * 100.0).min(self.config.max_charge_percent);
        ChargingSuggestion::ChargeTo {
            percent: target.round() as u32,
        }
    }
}

/// Reject ranges that are negative or not finite
pub fn check_range(predicted_range: f64) -> Result<f64, DomainError> {
    if predicted_range.is_finite() && predicted_range >= 0.0 {
        Ok(predicted_range)
    } else {
        Err(DomainError::InvalidRange(predicted_range))
    }
}

/// Maintenance policy constants
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub threshold: f64,
    pub horizon_days: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            threshold: MAINTENANCE_THRESHOLD,
            horizon_days: MAINTENANCE_HORIZON_DAYS,
        }
    }
}

/// Condition label derived from the classifier's label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCondition {
    Normal,
    NeedsMaintenance,
}

impl EngineCondition {
    pub fn from_label(label: u8) -> Self {
        if label == 0 {
            EngineCondition::Normal
        } else {
            EngineCondition::NeedsMaintenance
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineCondition::Normal => "Normal",
            EngineCondition::NeedsMaintenance => "Needs Maintenance",
        }
    }
}

impl fmt::Display for EngineCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both maintenance signals: the classifier label and the threshold projection
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceProjection {
    pub label: u8,
    pub probability: f64,
    pub threshold: f64,
    /// `Some` only when the probability exceeds the threshold
    pub days_to_maintenance: Option<u32>,
    pub maintenance_date: Option<NaiveDate>,
    pub condition: EngineCondition,
}

impl MaintenanceProjection {
    pub fn is_due(&self) -> bool {
        self.days_to_maintenance.is_some()
    }

    pub fn into_response(self) -> MaintenanceResponse {
        MaintenanceResponse {
            predicted_class: self.label,
            probability: self.probability,
            threshold: self.threshold,
            maintenance_due: self.is_due(),
            days_to_maintenance: self.days_to_maintenance,
            maintenance_date: self
                .maintenance_date
                .map(|date| date.format(DATE_FORMAT).to_string()),
            engine_condition: self.condition.to_string(),
        }
    }
}

/// Projects a maintenance date from a failure probability
#[derive(Debug, Clone, Default)]
pub struct MaintenancePolicy {
    config: MaintenanceConfig,
}

impl MaintenancePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MaintenanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    /// Project from `today`. The label is reported as given, independent of
    /// whether the probability crosses the threshold.
    pub fn project(
        &self,
        probability: f64,
        label: u8,
        today: NaiveDate,
    ) -> Result<MaintenanceProjection, DomainError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(DomainError::ProbabilityOutOfBounds(probability));
        }

        let (days_to_maintenance, maintenance_date) = if probability > self.config.threshold {
            let days = (self.config.horizon_days * probability).floor() as u32;
            let date = today
                .checked_add_days(Days::new(u64::from(days)))
                .ok_or(DomainError::DateOutOfRange { from: today, days })?;
            (Some(days), Some(date))
        } else {
            (None, None)
        };

        Ok(MaintenanceProjection {
            label,
            probability,
            threshold: self.config.threshold,
            days_to_maintenance,
            maintenance_date,
            condition: EngineCondition::from_label(label),
        })
    }
}
