//! Synthetic data generators
//!
//! Every field is drawn from an independent uniform distribution. Draw order
//! is fixed (fields in declaration order, then the label), so a seeded
//! generator always yields the same dataset.

use super::dataset::Dataset;
use crate::models::{FuelType, MaintenanceFeatures, RangeFeatures, TrafficStatus};
use rand::rngs::StdRng;
use rand::Rng;

/// Ground-truth range for a set of EV features
pub fn range_target(f: &RangeFeatures) -> f64 {
    let base = f.battery_capacity * 5.0
        - f.battery_temp * 0.5
        - f.elevation.max(0.0) * 0.02
        - f.speed.powi(2) * 0.001
        - f.wind_speed * 0.5
        - f64::from(f.ac_usage) * 10.0;
    (base * f.traffic_status.range_multiplier()).max(0.0)
}

fn sample_range_features(rng: &mut StdRng) -> RangeFeatures {
    RangeFeatures {
        battery_temp: rng.gen_range(0.0..40.0),
        current_charging: rng.gen_range(0.0..100.0),
        soc: rng.gen_range(0.0..100.0),
        battery_capacity: rng.gen_range(50.0..100.0),
        elevation: rng.gen_range(-100.0..1000.0),
        traffic_status: TrafficStatus::ALL[rng.gen_range(0..TrafficStatus::ALL.len())],
        speed: rng.gen_range(0.0..120.0),
        wind_speed: rng.gen_range(0.0..30.0),
        ac_usage: rng.gen_range(0..=1),
    }
}

/// `n` range samples labelled with [`range_target`]
pub fn generate_range(n: usize, rng: &mut StdRng) -> Dataset<RangeFeatures> {
    let mut records = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    for _ in 0..n {
        let features = sample_range_features(rng);
        targets.push(range_target(&features));
        records.push(features);
    }
    Dataset::new(records, targets)
}

/// Engine failure probability from a logistic risk score
pub fn failure_probability(f: &MaintenanceFeatures) -> f64 {
    let low_oil_pressure = (2.5 - f.lub_oil_pressure).max(0.0) * 1.1;
    let hot_coolant = (f.coolant_temp - 90.0).max(0.0) / 20.0 * 2.0;
    let temp_spread = f.temperature_difference / 40.0 * 1.5;
    let wear = f.mileage / 300_000.0 * 1.5 + f.engine_runtime / 10_000.0;
    let off_idle = ((f.engine_rpm - 1400.0).abs() - 700.0).max(0.0) / 300.0;
    let diesel = match f.fuel_type {
        FuelType::Diesel => 0.3,
        FuelType::Petrol => 0.0,
    };

    let z = -3.2 + low_oil_pressure + hot_coolant + temp_spread + wear + off_idle + diesel;
    1.0 / (1.0 + (-z).exp())
}

fn sample_maintenance_features(rng: &mut StdRng) -> MaintenanceFeatures {
    MaintenanceFeatures {
        engine_rpm: rng.gen_range(400.0..2400.0),
        lub_oil_pressure: rng.gen_range(0.5..7.0),
        fuel_pressure: rng.gen_range(1.0..21.0),
        coolant_pressure: rng.gen_range(0.5..7.5),
        lub_oil_temp: rng.gen_range(70.0..95.0),
        coolant_temp: rng.gen_range(60.0..110.0),
        fuel_type: FuelType::ALL[rng.gen_range(0..FuelType::ALL.len())],
        mileage: rng.gen_range(0.0..300_000.0),
        fuel_consumption_rate: rng.gen_range(4.0..20.0),
        engine_runtime: rng.gen_range(0.0..10_000.0),
        temperature_difference: rng.gen_range(0.0..40.0),
    }
}

/// `n` maintenance samples with Bernoulli failure labels (1.0 = failure)
pub fn generate_maintenance(n: usize, rng: &mut StdRng) -> Dataset<MaintenanceFeatures> {
    let mut records = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    for _ in 0..n {
        let features = sample_maintenance_features(rng);
        let failed = rng.gen_bool(failure_probability(&features));
        targets.push(if failed { 1.0 } else { 0.0 });
        records.push(features);
    }
    Dataset::new(records, targets)
}
