use super::Session;
use crate::manifest::address;
use apimflow_cloud::{ActionType, ApplyResult, Reconciler, ResourceState};
use std::time::Instant;

/// Adopt an existing resource under `label`
///
/// The recorded configuration is derived from the observed state, so a
/// following apply with a matching manifest entry is a no-op.
pub async fn run<R: Reconciler>(
    reconciler: &R,
    label: &str,
    id: &str,
    session: &mut Session,
) -> anyhow::Result<ApplyResult> {
    let started = Instant::now();
    let mut result = ApplyResult::new();
    let resource_type = reconciler.resource_type().to_string();
    let address = address(&resource_type, label);

    if let Some(record) = session.state.get_resource(&address) {
        anyhow::bail!("{} is already managed as {}", address, record.id);
    }

    tracing::info!("Importing {} as {}", id, address);
    match reconciler.import(id).await {
        Ok(applied) => {
            let observed = serde_json::to_value(&applied.observed)?;
            let config = reconciler.schema().configuration_of(&observed);
            let mut record = ResourceState::new(&applied.id, &resource_type).with_config(config);
            record.observe(observed);
            session.state.set_resource(address.clone(), record);
            result.add_success(&address, ActionType::Import, applied.id);
        }
        Err(e) => result.add_failure(&address, ActionType::Import, e.to_string()),
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    Ok(result)
}
