//! Offline artifact commands: train and inspect

use advisor_lib::artifact::TrainingMetadata;
use advisor_lib::{
    ArtifactStore, EvaluationReport, ModelArtifact, ModelKind, SyntheticTrainer, TrainerConfig,
};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{print_info, print_json, print_success, print_table, OutputFormat};

/// Row for the schema table
#[derive(Tabled)]
struct ColumnRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Column")]
    name: String,
}

#[derive(Serialize)]
struct TrainSummary<'a> {
    kind: ModelKind,
    path: &'a PathBuf,
    schema_width: usize,
    evaluation: &'a EvaluationReport,
    duration_ms: u128,
}

#[derive(Serialize)]
struct InspectSummary<'a> {
    kind: ModelKind,
    estimator: &'static str,
    n_trees: usize,
    schema: &'a [String],
    metadata: &'a TrainingMetadata,
}

/// Train a synthetic model and write it to `output`
pub async fn train(
    kind: ModelKind,
    output: PathBuf,
    config: TrainerConfig,
    format: OutputFormat,
) -> Result<()> {
    if let OutputFormat::Table = format {
        print_info(&format!(
            "Training {} model on {} synthetic samples ({} trees)...",
            kind, config.n_samples, config.n_estimators
        ));
    }

    let trained = tokio::task::spawn_blocking(move || SyntheticTrainer::new(config).train(kind))
        .await
        .context("Training task panicked")?
        .with_context(|| format!("Failed to train {} model", kind))?;

    ArtifactStore::new(&output)
        .save(&trained.artifact)
        .with_context(|| format!("Failed to write artifact to {}", output.display()))?;

    match format {
        OutputFormat::Json => print_json(&TrainSummary {
            kind,
            path: &output,
            schema_width: trained.artifact.schema.len(),
            evaluation: &trained.evaluation,
            duration_ms: trained.duration.as_millis(),
        })?,
        OutputFormat::Table => {
            print_success(&format!("Wrote {}", output.display()));
            println!("Schema width:           {}", trained.artifact.schema.len());
            println!("Held-out evaluation:    {}", trained.evaluation.to_string().cyan());
            println!("Duration:               {} ms", trained.duration.as_millis());
        }
    }

    Ok(())
}

/// Load an artifact and print its kind, schema and metadata
pub fn inspect(kind: ModelKind, path: PathBuf, format: OutputFormat) -> Result<()> {
    let artifact: ModelArtifact = ArtifactStore::new(&path)
        .load(kind)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    match format {
        OutputFormat::Json => print_json(&InspectSummary {
            kind: artifact.kind,
            estimator: artifact.estimator.type_name(),
            n_trees: artifact.estimator.forest().n_trees(),
            schema: artifact.schema.columns(),
            metadata: &artifact.metadata,
        })?,
        OutputFormat::Table => {
            let meta = &artifact.metadata;
            println!("{}", "Model Artifact".bold());
            println!("{}", "=".repeat(50));
            println!("Kind:                   {}", artifact.kind.to_string().cyan());
            println!(
                "Estimator:              {} ({} trees)",
                artifact.estimator.type_name(),
                artifact.estimator.forest().n_trees()
            );
            println!("Created:                {}", meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("Trainer version:        {}", meta.trainer_version);
            println!(
                "Samples:                {} ({} train), seed {}",
                meta.n_samples, meta.n_train, meta.seed
            );
            match meta.max_depth {
                Some(depth) => println!("Max depth:              {}", depth),
                None => println!("Max depth:              unlimited"),
            }
            println!();

            let rows: Vec<ColumnRow> = artifact
                .schema
                .columns()
                .iter()
                .enumerate()
                .map(|(index, name)| ColumnRow {
                    index,
                    name: name.clone(),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}
