use bulkhead_api::{ConsumerState, Deployment, IsolationEngine, RegistrationService};
use bulkhead_core::{IsolationConfig, IsolationContainer, IsolationHandle, Result};
use std::path::Path;
use std::sync::Arc;

/// Builds an empty isolation engine from `config`.
///
/// Host-side stores (runtime, framework, agent, system) are left empty; embedders
/// that own such stores should go through [`IsolationContainer::builder`] instead.
pub fn build_default_engine(config: IsolationConfig) -> Result<Arc<dyn IsolationEngine>> {
    let container = IsolationContainer::builder(config).build()?;
    Ok(Arc::new(IsolationHandle::new(container)))
}

/// Registers every module of `deployment`, publishes the export index and
/// activates the consumers.
pub fn deploy(config: IsolationConfig, deployment: &Deployment) -> Result<Arc<dyn IsolationEngine>> {
    let engine = build_default_engine(config)?;

    for spec in &deployment.providers {
        engine.register_provider(spec.clone())?;
    }
    let mut consumers = Vec::with_capacity(deployment.consumers.len());
    for spec in &deployment.consumers {
        consumers.push(engine.register_consumer(spec.clone())?);
    }

    let stats = engine.build_export_index();

    for id in &consumers {
        engine.transition_consumer(id, ConsumerState::Resolved)?;
        engine.transition_consumer(id, ConsumerState::Active)?;
    }

    tracing::info!(
        "Deployed {} providers and {} consumers (index epoch {})",
        deployment.providers.len(),
        consumers.len(),
        stats.epoch
    );
    Ok(engine)
}

pub fn load_deployment(path: &Path) -> Result<Deployment> {
    let json = std::fs::read_to_string(path)?;
    let deployment = Deployment::from_json_str(&json)?;
    tracing::debug!(
        "Loaded deployment descriptor {} ({} providers, {} consumers)",
        path.display(),
        deployment.providers.len(),
        deployment.consumers.len()
    );
    Ok(deployment)
}

/// Loads the config (defaults plus environment overrides when no file is given)
/// and the descriptor, then deploys.
pub fn deploy_from_paths(
    config_path: Option<&Path>,
    descriptor: &Path,
) -> Result<Arc<dyn IsolationEngine>> {
    let config = match config_path {
        Some(path) => IsolationConfig::load(path)?,
        None => {
            let config = IsolationConfig::default().with_env_overrides()?;
            config.validate()?;
            config
        }
    };
    deploy(config, &load_deployment(descriptor)?)
}

/// Initializes the logging system for a specific component.
/// This delegates to the core logging module.
pub fn init_logging(component: &str, to_stderr: bool) -> Option<impl Drop> {
    Some(bulkhead_core::logging::init_logging(component, to_stderr))
}
