use apimflow_cloud_azure::{RESOURCE_TYPE, service};

/// Print the resource schema as JSON
pub fn handle() -> anyhow::Result<()> {
    let schema = serde_json::json!({
        "resource_type": RESOURCE_TYPE,
        "schema": service::schema(),
    });
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
