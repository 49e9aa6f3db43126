//! Vehicle advisor server
//!
//! Loads (or trains) the range and maintenance models at startup and serves
//! predictions over HTTP.

pub mod api;
pub mod config;

use advisor_lib::{
    health::components, AdvisorService, ComponentHealth, HealthRegistry, InitializationError,
    ManagedArtifact, ModelArtifactManager, ModelKind, StructuredLogger,
};
use anyhow::{Context, Result};
use config::AdvisorConfig;
use tracing::{info, warn};

/// Resolve one model off the async runtime; training is CPU bound
async fn initialize_model(
    kind: ModelKind,
    config: &AdvisorConfig,
    logger: &StructuredLogger,
) -> Result<Result<ManagedArtifact, InitializationError>> {
    let path = match kind {
        ModelKind::Range => config.range_artifact_path.clone(),
        ModelKind::Maintenance => config.maintenance_artifact_path.clone(),
    };
    let manager = ModelArtifactManager::new(kind, path, config.trainer.clone(), logger.clone());

    tokio::task::spawn_blocking(move || manager.load_or_initialize())
        .await
        .with_context(|| format!("{} model initialization task panicked", kind))
}

/// Build the serving facade and record model health
///
/// A model that cannot be initialized leaves its endpoint answering 503;
/// the server still starts so the other model keeps serving.
pub async fn initialize_service(
    config: &AdvisorConfig,
    logger: StructuredLogger,
    health: &HealthRegistry,
) -> Result<AdvisorService> {
    let mut service = AdvisorService::new(logger.clone());

    for kind in ModelKind::ALL {
        let managed = match initialize_model(kind, config, &logger).await? {
            Ok(managed) => managed,
            Err(err) => {
                warn!(model = %kind, error = %err, "Model unavailable");
                health.record_model_failure(&err).await;
                continue;
            }
        };

        match service.attach(managed.artifact.clone()) {
            Ok(()) => {
                health.record_model(kind, &managed).await;
                info!(model = %kind, source = %managed.source, "Model ready");
            }
            Err(err) => {
                warn!(model = %kind, error = %err, "Artifact rejected by predictor");
                health
                    .update(
                        components::for_model(kind),
                        ComponentHealth::unhealthy(err.to_string()),
                    )
                    .await;
            }
        }
    }

    health.set_ready(true).await;
    Ok(service)
}
