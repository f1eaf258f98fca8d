use super::Session;
use apimflow_cloud::{ActionType, ApplyResult, Reconciler};
use std::time::Instant;

/// Re-read every recorded resource of the reconciler's type
///
/// Observations replace the recorded attributes; resources that no longer
/// exist are dropped from the record store. Records left without an
/// identity by an interrupted create are dropped as well.
pub async fn run<R: Reconciler>(
    reconciler: &R,
    session: &mut Session,
) -> anyhow::Result<ApplyResult> {
    let started = Instant::now();
    let mut result = ApplyResult::new();

    let records: Vec<(String, String)> = session
        .state
        .by_type(reconciler.resource_type())
        .into_iter()
        .map(|(address, record)| (address.clone(), record.id.clone()))
        .collect();

    for (address, id) in records {
        if id.is_empty() {
            session.state.remove_resource(&address);
            result.add_success(
                &address,
                ActionType::Refresh,
                "dropped record without identity",
            );
            continue;
        }

        match reconciler.read(&id).await {
            Ok(Some(observed)) => {
                if let Some(record) = session.state.get_resource_mut(&address) {
                    record.observe(serde_json::to_value(&observed)?);
                }
                result.add_success(&address, ActionType::Refresh, id);
            }
            Ok(None) => {
                tracing::info!("{} no longer exists, removing from state", address);
                session.state.remove_resource(&address);
                result.add_success(&address, ActionType::Refresh, "gone; removed from state");
            }
            Err(e) => result.add_failure(&address, ActionType::Refresh, e.to_string()),
        }
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::apply;
    use crate::commands::testing::{EntryReconciler, RESOURCE_TYPE, session};
    use crate::manifest::address;
    use apimflow_cloud::{ResourceState, ResourceStatus};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn declared() -> BTreeMap<String, serde_json::Value> {
        BTreeMap::from([("main".to_string(), json!({ "name": "alpha", "size": 1 }))])
    }

    #[tokio::test]
    async fn test_refresh_heals_unsynced_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir).await;
        let reconciler = EntryReconciler::new();
        reconciler.fail_reads(true);
        apply::run(&reconciler, &declared(), &mut session).await.unwrap();
        reconciler.fail_reads(false);

        let result = run(&reconciler, &mut session).await.unwrap();

        assert!(result.is_success());
        let record = session
            .state
            .get_resource(&address(RESOURCE_TYPE, "main"))
            .unwrap();
        assert_eq!(record.status, ResourceStatus::Present);
        assert_eq!(record.get_attribute::<String>("name").as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn test_refresh_prunes_vanished_resource() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir).await;
        let reconciler = EntryReconciler::new();
        apply::run(&reconciler, &declared(), &mut session).await.unwrap();
        reconciler.remove("alpha");

        let result = run(&reconciler, &mut session).await.unwrap();

        assert!(result.is_success());
        assert!(session.state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_reports_malformed_identity() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir).await;
        let reconciler = EntryReconciler::new();
        session.state.set_resource(
            address(RESOURCE_TYPE, "broken"),
            ResourceState::new("not-a-path", RESOURCE_TYPE).with_status(ResourceStatus::Present),
        );

        let result = run(&reconciler, &mut session).await.unwrap();

        assert_eq!(result.failed.len(), 1);
        assert!(result.failed[0].error.as_deref().unwrap().contains("not-a-path"));
        assert_eq!(session.state.resources.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_ignores_other_resource_types() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir).await;
        let reconciler = EntryReconciler::new();
        session.state.set_resource(
            "other_type.main".to_string(),
            ResourceState::new("/elsewhere/1", "other_type"),
        );

        let result = run(&reconciler, &mut session).await.unwrap();

        assert!(result.succeeded.is_empty());
        assert_eq!(reconciler.calls(), 0);
    }
}
