use super::Session;
use crate::manifest::address;
use apimflow_cloud::{
    ActionType, ApplyResult, CloudError, Reconciler, ResourceState, ResourceStatus,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

/// Drive every declared resource toward its configuration
///
/// Resources without a record are created, recorded ones are updated in
/// place. A record whose configuration is unchanged and which was last seen
/// present is left alone. Changes to force-new attributes are refused.
pub async fn run<R: Reconciler>(
    reconciler: &R,
    resources: &BTreeMap<String, Value>,
    session: &mut Session,
) -> anyhow::Result<ApplyResult> {
    let started = Instant::now();
    let mut result = ApplyResult::new();
    let resource_type = reconciler.resource_type().to_string();
    let schema = reconciler.schema();

    for (label, raw) in resources {
        let address = address(&resource_type, label);
        let existing = session
            .state
            .get_resource(&address)
            .filter(|record| !record.id.is_empty())
            .cloned();
        let action = if existing.is_some() {
            ActionType::Update
        } else {
            ActionType::Create
        };

        let config = match reconciler.decode(raw) {
            Ok(config) => config,
            Err(e) => {
                result.add_failure(&address, action, e.to_string());
                continue;
            }
        };
        let conformed = serde_json::to_value(&config)?;

        let Some(record) = existing else {
            tracing::info!("Creating {}", address);
            session.state.set_resource(
                address.clone(),
                ResourceState::new("", &resource_type)
                    .with_status(ResourceStatus::Creating)
                    .with_config(conformed.clone()),
            );
            session.checkpoint().await?;

            match reconciler.create(&config).await {
                Ok(applied) => {
                    let mut record =
                        ResourceState::new(&applied.id, &resource_type).with_config(conformed);
                    record.observe(serde_json::to_value(&applied.observed)?);
                    session.state.set_resource(address.clone(), record);
                    result.add_success(&address, action, applied.id);
                }
                Err(CloudError::Unsynced { id, message }) => {
                    let mut record = ResourceState::new(&id, &resource_type).with_config(conformed);
                    record.fail(ResourceStatus::Unsynced, &message);
                    session.state.set_resource(address.clone(), record);
                    result.add_failure(
                        &address,
                        action,
                        format!("{} was created but could not be read back: {}", id, message),
                    );
                }
                Err(e) => {
                    session.state.remove_resource(&address);
                    result.add_failure(&address, action, e.to_string());
                }
            }
            continue;
        };

        let replaced = schema.replacement_paths(&record.config, &conformed);
        if !replaced.is_empty() {
            result.add_failure(
                &address,
                action,
                format!(
                    "changing {} requires replacement; run `apim destroy {}` first",
                    replaced.join(", "),
                    label
                ),
            );
            continue;
        }

        if record.status == ResourceStatus::Present && record.config == conformed {
            result.add_success(&address, ActionType::NoOp, record.id);
            continue;
        }

        tracing::info!("Updating {} ({})", address, record.id);
        if let Some(record) = session.state.get_resource_mut(&address) {
            record.status = ResourceStatus::Updating;
        }
        session.checkpoint().await?;

        let outcome = reconciler.update(&record.id, &config).await;
        let Some(record) = session.state.get_resource_mut(&address) else {
            continue;
        };
        match outcome {
            Ok(observed) => {
                record.config = conformed;
                record.observe(serde_json::to_value(&observed)?);
                result.add_success(&address, action, record.id.clone());
            }
            Err(CloudError::Unsynced { message, .. }) => {
                record.config = conformed;
                record.fail(ResourceStatus::Unsynced, &message);
                result.add_failure(
                    &address,
                    action,
                    format!("update was applied but could not be read back: {}", message),
                );
            }
            Err(e) => {
                record.fail(ResourceStatus::Failed, e.to_string());
                result.add_failure(&address, action, e.to_string());
            }
        }
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    Ok(result)
}
