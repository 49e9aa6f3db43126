//! Core data models for the vehicle advisor

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which model a piece of state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// EV driving-range regressor
    Range,
    /// Engine failure classifier
    Maintenance,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Range, ModelKind::Maintenance];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Range => "range",
            ModelKind::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "range" => Ok(ModelKind::Range),
            "maintenance" => Ok(ModelKind::Maintenance),
            other => Err(format!("unknown model kind '{}'", other)),
        }
    }
}

/// Road traffic level during the trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficStatus {
    Light,
    Moderate,
    Heavy,
}

impl TrafficStatus {
    pub const FIELD: &'static str = "traffic_status";
    pub const VALUES: &'static [&'static str] = &["Light", "Moderate", "Heavy"];
    pub const ALL: [TrafficStatus; 3] = [
        TrafficStatus::Light,
        TrafficStatus::Moderate,
        TrafficStatus::Heavy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficStatus::Light => "Light",
            TrafficStatus::Moderate => "Moderate",
            TrafficStatus::Heavy => "Heavy",
        }
    }

    /// Parse an exact enumeration string
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "Light" => Ok(TrafficStatus::Light),
            "Moderate" => Ok(TrafficStatus::Moderate),
            "Heavy" => Ok(TrafficStatus::Heavy),
            other => Err(invalid_category(Self::FIELD, other, Self::VALUES)),
        }
    }

    /// Multiplier applied to the synthetic range target
    pub fn range_multiplier(&self) -> f64 {
        match self {
            TrafficStatus::Light => 1.0,
            TrafficStatus::Moderate => 0.9,
            TrafficStatus::Heavy => 0.7,
        }
    }
}

/// Engine fuel type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
}

impl FuelType {
    pub const FIELD: &'static str = "fuel_type";
    pub const VALUES: &'static [&'static str] = &["petrol", "diesel"];
    pub const ALL: [FuelType; 2] = [FuelType::Petrol, FuelType::Diesel];

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "petrol",
            FuelType::Diesel => "diesel",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "petrol" => Ok(FuelType::Petrol),
            "diesel" => Ok(FuelType::Diesel),
            other => Err(invalid_category(Self::FIELD, other, Self::VALUES)),
        }
    }
}

fn invalid_category(field: &str, value: &str, allowed: &[&str]) -> ValidationError {
    ValidationError::InvalidCategory {
        field: field.to_string(),
        value: value.to_string(),
        allowed: allowed.join(", "),
    }
}

/// Validated inputs of the range model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFeatures {
    pub battery_temp: f64,
    pub current_charging: f64,
    pub soc: f64,
    pub battery_capacity: f64,
    pub elevation: f64,
    pub traffic_status: TrafficStatus,
    pub speed: f64,
    pub wind_speed: f64,
    /// Accessory (A/C) load flag, 0 or 1
    pub ac_usage: u8,
}

/// Validated inputs of the maintenance model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceFeatures {
    pub engine_rpm: f64,
    pub lub_oil_pressure: f64,
    pub fuel_pressure: f64,
    pub coolant_pressure: f64,
    pub lub_oil_temp: f64,
    pub coolant_temp: f64,
    pub fuel_type: FuelType,
    pub mileage: f64,
    pub fuel_consumption_rate: f64,
    pub engine_runtime: f64,
    pub temperature_difference: f64,
}

/// Decision context supplied with a range request; never encoded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripContext {
    /// Planned trip distance, `None` when absent or not positive
    pub trip_distance: Option<f64>,
    pub soc: f64,
}

/// Raw estimator output. A model produces exactly one of the two shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PredictionResult {
    Range(f64),
    Failure { label: u8, probability: f64 },
}

/// Range request as received on the wire
///
/// Missing fields take the same defaults the range endpoint always used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRequest {
    pub battery_temp: f64,
    pub current_charging: f64,
    pub soc: f64,
    pub battery_capacity: f64,
    pub elevation: f64,
    pub traffic_status: String,
    pub speed: f64,
    pub wind_speed: f64,
    pub ac_usage: i64,
    pub trip_distance: f64,
}

impl Default for RangeRequest {
    fn default() -> Self {
        Self {
            battery_temp: 0.0,
            current_charging: 0.0,
            soc: 0.0,
            battery_capacity: 0.0,
            elevation: 0.0,
            traffic_status: TrafficStatus::Light.as_str().to_string(),
            speed: 0.0,
            wind_speed: 0.0,
            ac_usage: 0,
            trip_distance: 0.0,
        }
    }
}

impl RangeRequest {
    /// Validate the payload into typed features plus decision context
    pub fn validate(&self) -> Result<(RangeFeatures, TripContext), ValidationError> {
        let features = RangeFeatures {
            battery_temp: finite("battery_temp", self.battery_temp)?,
            current_charging: finite("current_charging", self.current_charging)?,
            soc: finite("soc", self.soc)?,
            battery_capacity: finite("battery_capacity", self.battery_capacity)?,
            elevation: finite("elevation", self.elevation)?,
            traffic_status: TrafficStatus::parse(&self.traffic_status)?,
            speed: finite("speed", self.speed)?,
            wind_speed: finite("wind_speed", self.wind_speed)?,
            ac_usage: flag("ac_usage", self.ac_usage)?,
        };
        let trip_distance = finite("trip_distance", self.trip_distance)?;
        let context = TripContext {
            trip_distance: (trip_distance > 0.0).then_some(trip_distance),
            soc: features.soc,
        };
        Ok((features, context))
    }
}

/// Maintenance request as received on the wire. Every field is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub engine_rpm: f64,
    pub lub_oil_pressure: f64,
    pub fuel_pressure: f64,
    pub coolant_pressure: f64,
    pub lub_oil_temp: f64,
    pub coolant_temp: f64,
    /// `"petrol"`/`"diesel"`, or the numeric codes 0 and 1
    #[serde(deserialize_with = "fuel_type_name")]
    pub fuel_type: String,
    pub mileage: f64,
    pub fuel_consumption_rate: f64,
    pub engine_runtime: f64,
    pub temperature_difference: f64,
}

impl MaintenanceRequest {
    pub fn validate(&self) -> Result<MaintenanceFeatures, ValidationError> {
        Ok(MaintenanceFeatures {
            engine_rpm: finite("engine_rpm", self.engine_rpm)?,
            lub_oil_pressure: finite("lub_oil_pressure", self.lub_oil_pressure)?,
            fuel_pressure: finite("fuel_pressure", self.fuel_pressure)?,
            coolant_pressure: finite("coolant_pressure", self.coolant_pressure)?,
            lub_oil_temp: finite("lub_oil_temp", self.lub_oil_temp)?,
            coolant_temp: finite("coolant_temp", self.coolant_temp)?,
            fuel_type: FuelType::parse(&self.fuel_type)?,
            mileage: non_negative("mileage", self.mileage)?,
            fuel_consumption_rate: finite("fuel_consumption_rate", self.fuel_consumption_rate)?,
            engine_runtime: non_negative("engine_runtime", self.engine_runtime)?,
            temperature_difference: finite("temperature_difference", self.temperature_difference)?,
        })
    }
}

/// Accepts a fuel type name or its numeric code. Unknown codes are kept as text
/// so validation reports them as an invalid category.
fn fuel_type_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FuelTypeWire {
        Name(String),
        Code(f64),
    }

    Ok(match FuelTypeWire::deserialize(deserializer)? {
        FuelTypeWire::Name(name) => name,
        FuelTypeWire::Code(code) if code == 0.0 => FuelType::Petrol.as_str().to_string(),
        FuelTypeWire::Code(code) if code == 1.0 => FuelType::Diesel.as_str().to_string(),
        FuelTypeWire::Code(code) => code.to_string(),
    })
}

fn finite(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite {
            field: field.to_string(),
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64, ValidationError> {
    let value = finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        });
    }
    Ok(value)
}

fn flag(field: &str, value: i64) -> Result<u8, ValidationError> {
    match value {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(ValidationError::InvalidFlag {
            field: field.to_string(),
            value: other,
        }),
    }
}

/// Range endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeResponse {
    pub predicted_range: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charging_suggestion: Option<String>,
}

/// Maintenance endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceResponse {
    pub predicted_class: u8,
    pub probability: f64,
    pub threshold: f64,
    pub maintenance_due: bool,
    pub days_to_maintenance: Option<u32>,
    /// `YYYY-MM-DD`, present only when maintenance is due
    pub maintenance_date: Option<String>,
    pub engine_condition: String,
}
