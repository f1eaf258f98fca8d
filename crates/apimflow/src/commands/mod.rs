pub mod apply;
pub mod destroy;
pub mod import;
pub mod refresh;
pub mod schema;
pub mod show;
pub mod validate;

use apimflow_cloud::{ApplyResult, GlobalState, StateLock, StateManager};
use colored::Colorize;

/// Loaded record store for one command run
///
/// `checkpoint` persists in-flight statuses before backend calls so an
/// interrupted run leaves a trace in the state file. A locked session also
/// refreshes its lock there, keeping it live through long runs.
pub struct Session {
    manager: StateManager,
    lock: Option<StateLock>,
    pub state: GlobalState,
}

impl Session {
    pub async fn open(manager: StateManager) -> anyhow::Result<Self> {
        let state = manager.load().await?;
        Ok(Self {
            manager,
            lock: None,
            state,
        })
    }

    /// Take the state lock, then load
    pub async fn open_locked(manager: StateManager) -> anyhow::Result<Self> {
        let lock = manager.acquire_lock().await?;
        let mut session = Self::open(manager).await?;
        session.lock = Some(lock);
        Ok(session)
    }

    pub async fn checkpoint(&mut self) -> anyhow::Result<()> {
        if let Some(lock) = self.lock.as_mut() {
            lock.refresh().await?;
        }
        self.manager.save(&self.state).await?;
        Ok(())
    }

    /// Final checkpoint, then release the lock
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.checkpoint().await?;
        if let Some(lock) = self.lock.take() {
            lock.release().await?;
        }
        Ok(())
    }
}

/// Print per-resource outcomes and fail when any action failed
pub fn report(result: &ApplyResult) -> anyhow::Result<()> {
    for action in &result.succeeded {
        println!(
            "  {} {} {}",
            "✓".green(),
            action.address.cyan(),
            format!("({}) {}", action.action_type, action.message).dimmed()
        );
    }
    for action in &result.failed {
        eprintln!(
            "  {} {} ({})",
            "✗".red(),
            action.address.cyan(),
            action.action_type
        );
        if let Some(error) = &action.error {
            eprintln!("    {}", error);
        }
    }

    println!();
    let summary = format!("{} in {}ms", result, result.duration_ms);
    if result.is_success() {
        println!("{}", summary.green().bold());
        Ok(())
    } else {
        println!("{}", summary.red().bold());
        anyhow::bail!("{} action(s) failed", result.failed.len())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use apimflow_cloud::{ResourceState, ResourceStatus};

    #[tokio::test]
    async fn test_locked_session_holds_lock_until_closed() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::open_locked(StateManager::new(dir.path()))
            .await
            .unwrap();
        session.state.set_resource(
            "test_entry.main".to_string(),
            ResourceState::new("", "test_entry").with_status(ResourceStatus::Creating),
        );

        session.checkpoint().await.unwrap();
        assert!(
            StateManager::new(dir.path())
                .acquire_lock()
                .await
                .is_err()
        );

        session.close().await.unwrap();
        let reloaded = StateManager::new(dir.path()).load().await.unwrap();
        assert!(reloaded.get_resource("test_entry.main").is_some());
        assert!(StateManager::new(dir.path()).acquire_lock().await.is_ok());
    }

    #[tokio::test]
    async fn test_checkpoint_fails_once_lock_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::open_locked(StateManager::new(dir.path()))
            .await
            .unwrap();
        std::fs::write(
            dir.path().join(".apimflow").join("lock.json"),
            r#"{"holder":"other-host","pid":1,"refreshed_at":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let err = session.checkpoint().await.unwrap_err();
        assert!(err.to_string().contains("other-host"));
    }
}
