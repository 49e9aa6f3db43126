//! Feature encoding for model inference and training
//!
//! Raw records are expanded into numeric columns: continuous fields map to a
//! column of the same name, categorical fields to one indicator column per
//! value (`field_value`). The encoder then aligns the expansion to a fixed
//! [`FeatureSchema`] by index lookup. Schema columns the record did not
//! produce stay zero, produced columns the schema lacks are dropped.

use super::schema::{indicator_column, FeatureSchema};
use crate::error::{SchemaError, ValidationError};
use crate::models::{FuelType, MaintenanceFeatures, RangeFeatures, TrafficStatus};
use std::collections::BTreeSet;
use tracing::debug;

/// Value of a single raw field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Continuous(f64),
    Categorical {
        value: &'a str,
        domain: &'static [&'static str],
    },
}

/// A named raw field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawField<'a> {
    pub name: &'static str,
    pub value: RawValue<'a>,
}

impl<'a> RawField<'a> {
    pub fn continuous(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value: RawValue::Continuous(value),
        }
    }

    pub fn categorical(name: &'static str, value: &'a str, domain: &'static [&'static str]) -> Self {
        Self {
            name,
            value: RawValue::Categorical { value, domain },
        }
    }
}

/// A record the encoder can expand, fields in declaration order
pub trait FeatureRecord {
    fn raw_fields(&self) -> Vec<RawField<'_>>;
}

impl FeatureRecord for RangeFeatures {
    fn raw_fields(&self) -> Vec<RawField<'_>> {
        vec![
            RawField::continuous("battery_temp", self.battery_temp),
            RawField::continuous("current_charging", self.current_charging),
            RawField::continuous("soc", self.soc),
            RawField::continuous("battery_capacity", self.battery_capacity),
            RawField::continuous("elevation", self.elevation),
            RawField::categorical(
                TrafficStatus::FIELD,
                self.traffic_status.as_str(),
                TrafficStatus::VALUES,
            ),
            RawField::continuous("speed", self.speed),
            RawField::continuous("wind_speed", self.wind_speed),
            RawField::continuous("ac_usage", f64::from(self.ac_usage)),
        ]
    }
}

impl FeatureRecord for MaintenanceFeatures {
    fn raw_fields(&self) -> Vec<RawField<'_>> {
        vec![
            RawField::continuous("engine_rpm", self.engine_rpm),
            RawField::continuous("lub_oil_pressure", self.lub_oil_pressure),
            RawField::continuous("fuel_pressure", self.fuel_pressure),
            RawField::continuous("coolant_pressure", self.coolant_pressure),
            RawField::continuous("lub_oil_temp", self.lub_oil_temp),
            RawField::continuous("coolant_temp", self.coolant_temp),
            RawField::categorical(FuelType::FIELD, self.fuel_type.as_str(), FuelType::VALUES),
            RawField::continuous("mileage", self.mileage),
            RawField::continuous("fuel_consumption_rate", self.fuel_consumption_rate),
            RawField::continuous("engine_runtime", self.engine_runtime),
            RawField::continuous("temperature_difference", self.temperature_difference),
        ]
    }
}

/// Numeric vector aligned to a feature schema
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVector(Vec<f64>);

impl EncodedVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Encodes raw records against one schema
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder<'s> {
    schema: &'s FeatureSchema,
}

impl<'s> FeatureEncoder<'s> {
    pub fn new(schema: &'s FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.schema
    }

    /// Encode one record into a vector of exactly `schema.len()` columns
    pub fn encode<R: FeatureRecord + ?Sized>(&self, raw: &R) -> Result<EncodedVector, ValidationError> {
        let mut values = vec![0.0; self.schema.len()];

        for field in raw.raw_fields() {
            match field.value {
                RawValue::Continuous(value) => {
                    if !value.is_finite() {
                        return Err(ValidationError::NotFinite {
                            field: field.name.to_string(),
                        });
                    }
                    match self.schema.index_of(field.name) {
                        Some(idx) => values[idx] = value,
                        None => debug!(column = field.name, "Dropping column absent from schema"),
                    }
                }
                RawValue::Categorical { value, domain } => {
                    check_domain(field.name, value, domain)?;
                    let column = indicator_column(field.name, value);
                    match self.schema.index_of(&column) {
                        Some(idx) => values[idx] = 1.0,
                        None => debug!(column = %column, "Dropping column absent from schema"),
                    }
                }
            }
        }

        Ok(EncodedVector(values))
    }

    /// Encode many records, failing on the first invalid one
    pub fn encode_all<R: FeatureRecord>(&self, records: &[R]) -> Result<Vec<Vec<f64>>, ValidationError> {
        records
            .iter()
            .map(|record| self.encode(record).map(EncodedVector::into_inner))
            .collect()
    }
}

fn check_domain(field: &str, value: &str, domain: &[&str]) -> Result<(), ValidationError> {
    if domain.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCategory {
            field: field.to_string(),
            value: value.to_string(),
            allowed: domain.join(", "),
        })
    }
}

/// Derive the schema a set of training records expands to
///
/// Continuous columns come first in declaration order, followed by one
/// indicator column per categorical value observed in `records`, values
/// sorted lexically within each field.
pub fn derive_schema<R: FeatureRecord>(records: &[R]) -> Result<FeatureSchema, SchemaError> {
    let mut continuous: Vec<&'static str> = Vec::new();
    let mut categorical: Vec<(&'static str, BTreeSet<String>)> = Vec::new();

    for record in records {
        for field in record.raw_fields() {
            match field.value {
                RawValue::Continuous(_) => {
                    if !continuous.contains(&field.name) {
                        continuous.push(field.name);
                    }
                }
                RawValue::Categorical { value, .. } => {
                    match categorical.iter_mut().find(|(name, _)| *name == field.name) {
                        Some((_, seen)) => {
                            seen.insert(value.to_string());
                        }
                        None => categorical.push((field.name, BTreeSet::from([value.to_string()]))),
                    }
                }
            }
        }
    }

    let mut columns: Vec<String> = continuous.into_iter().map(str::to_string).collect();
    for (name, values) in categorical {
        columns.extend(values.iter().map(|value| indicator_column(name, value)));
    }
    FeatureSchema::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_features(traffic_status: TrafficStatus) -> RangeFeatures {
        RangeFeatures {
            battery_temp: 20.0,
            current_charging: 0.0,
            soc: 50.0,
            battery_capacity: 75.0,
            elevation: 0.0,
            traffic_status,
            speed: 60.0,
            wind_speed: 5.0,
            ac_usage: 1,
        }
    }

    fn range_schema() -> FeatureSchema {
        let records: Vec<RangeFeatures> = TrafficStatus::ALL.iter().map(|t| range_features(*t)).collect();
        derive_schema(&records).unwrap()
    }

    /// Record with an unchecked categorical value
    struct LooseRecord {
        traffic: String,
        speed: f64,
    }

    impl FeatureRecord for LooseRecord {
        fn raw_fields(&self) -> Vec<RawField<'_>> {
            vec![
                RawField::continuous("speed", self.speed),
                RawField::categorical(TrafficStatus::FIELD, &self.traffic, TrafficStatus::VALUES),
            ]
        }
    }

    #[test]
    fn test_derived_schema_layout() {
        let schema = range_schema();
        assert_eq!(
            schema.columns(),
            &[
                "battery_temp",
                "current_charging",
                "soc",
                "battery_capacity",
                "elevation",
                "speed",
                "wind_speed",
                "ac_usage",
                "traffic_status_Heavy",
                "traffic_status_Light",
                "traffic_status_Moderate",
            ]
        );
    }

    #[test]
    fn test_length_and_order_match_schema_for_every_category() {
        let schema = range_schema();
        let encoder = FeatureEncoder::new(&schema);

        for status in TrafficStatus::ALL {
            let encoded = encoder.encode(&range_features(status)).unwrap();
            assert_eq!(encoded.len(), schema.len());

            let values = encoded.as_slice();
            assert_eq!(values[schema.index_of("battery_temp").unwrap()], 20.0);
            assert_eq!(values[schema.index_of("soc").unwrap()], 50.0);
            assert_eq!(values[schema.index_of("speed").unwrap()], 60.0);
            assert_eq!(values[schema.index_of("ac_usage").unwrap()], 1.0);
        }
    }

    #[test]
    fn test_exactly_one_indicator_per_categorical_field() {
        let schema = range_schema();
        let encoder = FeatureEncoder::new(&schema);

        for status in TrafficStatus::ALL {
            let encoded = encoder.encode(&range_features(status)).unwrap();
            let set: Vec<&str> = schema
                .columns()
                .iter()
                .zip(encoded.as_slice())
                .filter(|(name, value)| name.starts_with("traffic_status_") && **value != 0.0)
                .map(|(name, _)| name.as_str())
                .collect();
            assert_eq!(set, vec![indicator_column(TrafficStatus::FIELD, status.as_str())]);
        }
    }

    #[test]
    fn test_alignment_follows_arbitrary_schema_order() {
        let schema = FeatureSchema::new(vec![
            "traffic_status_Moderate".to_string(),
            "speed".to_string(),
            "traffic_status_Heavy".to_string(),
            "soc".to_string(),
        ])
        .unwrap();
        let encoded = FeatureEncoder::new(&schema)
            .encode(&range_features(TrafficStatus::Heavy))
            .unwrap();
        assert_eq!(encoded.as_slice(), &[0.0, 60.0, 1.0, 50.0]);
    }

    #[test]
    fn test_missing_schema_columns_are_zero_and_extras_dropped() {
        // Schema never saw "Light": that indicator is dropped, "engine_rpm" stays zero
        let schema = FeatureSchema::new(vec![
            "speed".to_string(),
            "engine_rpm".to_string(),
            "traffic_status_Heavy".to_string(),
        ])
        .unwrap();
        let encoded = FeatureEncoder::new(&schema)
            .encode(&range_features(TrafficStatus::Light))
            .unwrap();
        assert_eq!(encoded.as_slice(), &[60.0, 0.0, 0.0]);
    }

    #[test]
    fn test_out_of_domain_category_is_validation_error() {
        let schema = range_schema();
        let record = LooseRecord {
            traffic: "Gridlock".to_string(),
            speed: 30.0,
        };
        let err = FeatureEncoder::new(&schema).encode(&record).unwrap_err();
        assert_eq!(err.field(), "traffic_status");
        assert_eq!(err.value().as_deref(), Some("Gridlock"));
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let schema = range_schema();
        let record = LooseRecord {
            traffic: "Light".to_string(),
            speed: f64::NAN,
        };
        let err = FeatureEncoder::new(&schema).encode(&record).unwrap_err();
        assert_eq!(err, ValidationError::NotFinite { field: "speed".to_string() });
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let schema = range_schema();
        let encoder = FeatureEncoder::new(&schema);
        let features = range_features(TrafficStatus::Moderate);
        assert_eq!(encoder.encode(&features).unwrap(), encoder.encode(&features).unwrap());
    }

    #[test]
    fn test_maintenance_schema_layout() {
        let record = |fuel_type| MaintenanceFeatures {
            engine_rpm: 800.0,
            lub_oil_pressure: 3.0,
            fuel_pressure: 6.0,
            coolant_pressure: 2.0,
            lub_oil_temp: 78.0,
            coolant_temp: 80.0,
            fuel_type,
            mileage: 50_000.0,
            fuel_consumption_rate: 8.0,
            engine_runtime: 1_000.0,
            temperature_difference: 5.0,
        };
        let schema = derive_schema(&[record(FuelType::Petrol), record(FuelType::Diesel)]).unwrap();
        assert_eq!(schema.len(), 12);
        assert_eq!(schema.columns()[10], "fuel_type_diesel");
        assert_eq!(schema.columns()[11], "fuel_type_petrol");

        let encoded = FeatureEncoder::new(&schema).encode(&record(FuelType::Petrol)).unwrap();
        assert_eq!(encoded.as_slice()[10], 0.0);
        assert_eq!(encoded.as_slice()[11], 1.0);
    }
}
