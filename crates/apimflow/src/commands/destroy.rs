use super::Session;
use crate::manifest::address;
use apimflow_cloud::{ActionType, ApplyResult, Reconciler, ResourceStatus};
use std::time::Instant;

/// Delete recorded resources, all of the reconciler's type or one label
///
/// Records are removed once the backend confirms the delete. A failed
/// delete keeps the record, marked failed, so it can be retried.
pub async fn run<R: Reconciler>(
    reconciler: &R,
    label: Option<&str>,
    session: &mut Session,
) -> anyhow::Result<ApplyResult> {
    let started = Instant::now();
    let mut result = ApplyResult::new();
    let resource_type = reconciler.resource_type().to_string();

    let targets: Vec<(String, String)> = match label {
        Some(label) => {
            let address = address(&resource_type, label);
            let Some(record) = session.state.get_resource(&address) else {
                anyhow::bail!("No recorded resource at {}", address);
            };
            vec![(address, record.id.clone())]
        }
        None => session
            .state
            .by_type(&resource_type)
            .into_iter()
            .map(|(address, record)| (address.clone(), record.id.clone()))
            .collect(),
    };

    for (address, id) in targets {
        if id.is_empty() {
            session.state.remove_resource(&address);
            result.add_success(&address, ActionType::Delete, "record had no identity");
            continue;
        }

        tracing::info!("Deleting {} ({})", address, id);
        if let Some(record) = session.state.get_resource_mut(&address) {
            record.status = ResourceStatus::Deleting;
        }
        session.checkpoint().await?;

        match reconciler.delete(&id).await {
            Ok(()) => {
                session.state.remove_resource(&address);
                result.add_success(&address, ActionType::Delete, id);
            }
            Err(e) => {
                if let Some(record) = session.state.get_resource_mut(&address) {
                    record.fail(ResourceStatus::Failed, e.to_string());
                }
                result.add_failure(&address, ActionType::Delete, e.to_string());
            }
        }
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    Ok(result)
}
