//! Prediction commands

use advisor_lib::{MaintenanceRequest, RangeRequest};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_probability, color_status, format_km, print_json, OutputFormat};

/// Vehicle state for a range prediction
#[derive(Debug, Args)]
pub struct RangeArgs {
    /// Battery temperature (°C)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub battery_temp: f64,

    /// Charging current (A)
    #[arg(long, default_value_t = 0.0)]
    pub current_charging: f64,

    /// State of charge (%)
    #[arg(long)]
    pub soc: f64,

    /// Battery capacity (kWh)
    #[arg(long)]
    pub battery_capacity: f64,

    /// Elevation (m)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub elevation: f64,

    /// Traffic status (Light, Moderate, Heavy)
    #[arg(long, default_value = "Light")]
    pub traffic_status: String,

    /// Speed (km/h)
    #[arg(long, default_value_t = 0.0)]
    pub speed: f64,

    /// Wind speed (km/h)
    #[arg(long, default_value_t = 0.0)]
    pub wind_speed: f64,

    /// Air conditioning on
    #[arg(long)]
    pub ac: bool,

    /// Planned trip distance (km); enables a charging suggestion
    #[arg(long)]
    pub trip_distance: Option<f64>,
}

impl From<RangeArgs> for RangeRequest {
    fn from(args: RangeArgs) -> Self {
        RangeRequest {
            battery_temp: args.battery_temp,
            current_charging: args.current_charging,
            soc: args.soc,
            battery_capacity: args.battery_capacity,
            elevation: args.elevation,
            traffic_status: args.traffic_status,
            speed: args.speed,
            wind_speed: args.wind_speed,
            ac_usage: i64::from(args.ac),
            trip_distance: args.trip_distance.unwrap_or(0.0),
        }
    }
}

/// Engine sensor readings for a maintenance prediction
#[derive(Debug, Args)]
pub struct MaintenanceArgs {
    #[arg(long)]
    pub engine_rpm: f64,

    /// Lubricating oil pressure (bar)
    #[arg(long)]
    pub lub_oil_pressure: f64,

    /// Fuel pressure (bar)
    #[arg(long)]
    pub fuel_pressure: f64,

    /// Coolant pressure (bar)
    #[arg(long)]
    pub coolant_pressure: f64,

    /// Lubricating oil temperature (°C)
    #[arg(long)]
    pub lub_oil_temp: f64,

    /// Coolant temperature (°C)
    #[arg(long)]
    pub coolant_temp: f64,

    /// Fuel type (petrol, diesel)
    #[arg(long)]
    pub fuel_type: String,

    /// Odometer reading (km)
    #[arg(long)]
    pub mileage: f64,

    /// Fuel consumption (L/100 km)
    #[arg(long)]
    pub fuel_consumption_rate: f64,

    /// Engine runtime (hours)
    #[arg(long)]
    pub engine_runtime: f64,

    /// Coolant minus oil temperature (°C)
    #[arg(long, allow_negative_numbers = true)]
    pub temperature_difference: f64,
}

impl From<MaintenanceArgs> for MaintenanceRequest {
    fn from(args: MaintenanceArgs) -> Self {
        MaintenanceRequest {
            engine_rpm: args.engine_rpm,
            lub_oil_pressure: args.lub_oil_pressure,
            fuel_pressure: args.fuel_pressure,
            coolant_pressure: args.coolant_pressure,
            lub_oil_temp: args.lub_oil_temp,
            coolant_temp: args.coolant_temp,
            fuel_type: args.fuel_type,
            mileage: args.mileage,
            fuel_consumption_rate: args.fuel_consumption_rate,
            engine_runtime: args.engine_runtime,
            temperature_difference: args.temperature_difference,
        }
    }
}

/// Predict driving range
pub async fn predict_range(client: &ApiClient, args: RangeArgs, format: OutputFormat) -> Result<()> {
    let request = RangeRequest::from(args);
    let response = client.predict_range(&request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            println!("{}", "Range Prediction".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Predicted range:        {}",
                format_km(response.predicted_range).cyan()
            );
            if request.trip_distance > 0.0 {
                println!("Trip distance:          {}", format_km(request.trip_distance));
            }
            if let Some(suggestion) = &response.charging_suggestion {
                println!();
                println!("{} {}", "Suggestion:".bold(), suggestion);
            }
        }
    }

    Ok(())
}

/// Predict engine maintenance
pub async fn predict_maintenance(
    client: &ApiClient,
    args: MaintenanceArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = MaintenanceRequest::from(args);
    let response = client.predict_maintenance(&request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            println!("{}", "Maintenance Prediction".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Engine condition:       {}",
                color_status(&response.engine_condition)
            );
            println!(
                "Failure probability:    {} (threshold {:.0}%)",
                color_probability(response.probability, response.threshold),
                response.threshold * 100.0
            );

            match (response.days_to_maintenance, &response.maintenance_date) {
                (Some(days), Some(date)) => {
                    println!();
                    println!(
                        "{} schedule within {} days (by {})",
                        "Maintenance due:".red().bold(),
                        days,
                        date
                    );
                }
                _ => println!("Maintenance due:        {}", "no".green()),
            }
        }
    }

    Ok(())
}
