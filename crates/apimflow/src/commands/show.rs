use apimflow_cloud::{GlobalState, ResourceStatus};
use colored::Colorize;

pub fn handle(state: &GlobalState, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    if state.resources.is_empty() {
        println!("{}", "No resources recorded".dimmed());
        return Ok(());
    }

    for (address, record) in &state.resources {
        let status = match record.status {
            ResourceStatus::Present => record.status.to_string().green(),
            ResourceStatus::Unsynced | ResourceStatus::Failed => record.status.to_string().red(),
            _ => record.status.to_string().yellow(),
        };
        println!("{} [{}]", address.cyan().bold(), status);
        if !record.id.is_empty() {
            println!("  id: {}", record.id);
        }
        if let Some(attributes) = record.attributes.as_object() {
            for (key, value) in attributes {
                if key == "id" || value.is_null() {
                    continue;
                }
                println!("  {}: {}", key, value);
            }
        }
        if let Some(error) = &record.error {
            println!("  {}: {}", "error".red(), error);
        }
    }

    Ok(())
}
