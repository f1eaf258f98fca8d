use colored::Colorize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Decode every declared resource, returning `(label, error)` for each
/// one that is rejected
pub fn check<T, F>(resources: &BTreeMap<String, Value>, decode: F) -> Vec<(String, String)>
where
    F: Fn(&Value) -> apimflow_cloud::Result<T>,
{
    resources
        .iter()
        .filter_map(|(label, raw)| decode(raw).err().map(|e| (label.clone(), e.to_string())))
        .collect()
}

pub fn handle<T, F>(resources: &BTreeMap<String, Value>, decode: F) -> anyhow::Result<()>
where
    F: Fn(&Value) -> apimflow_cloud::Result<T>,
{
    println!("{}", "Validating manifest...".blue());

    let errors = check(resources, decode);
    for label in resources.keys() {
        match errors.iter().find(|(l, _)| l == label) {
            None => println!("  {} {}", "✓".green(), label.cyan()),
            Some((_, error)) => {
                eprintln!("  {} {}", "✗".red(), label.cyan());
                eprintln!("    {}", error);
            }
        }
    }

    println!();
    if errors.is_empty() {
        println!(
            "{}",
            format!("✓ {} resource(s) valid", resources.len())
                .green()
                .bold()
        );
        Ok(())
    } else {
        anyhow::bail!("{} of {} resource(s) invalid", errors.len(), resources.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apimflow_cloud_azure::service;
    use serde_json::json;

    #[test]
    fn test_check_reports_only_invalid_labels() {
        let resources = BTreeMap::from([
            (
                "good".to_string(),
                json!({
                    "name": "svc1",
                    "resource_group_name": "rg1",
                    "location": "West US",
                    "sku": [{ "type": "Developer", "capacity": 1 }],
                    "publisher": { "name": "Acme", "email": "a@acme.com" }
                }),
            ),
            (
                "bad".to_string(),
                json!({
                    "name": "svc2",
                    "resource_group_name": "rg1",
                    "location": "West US",
                    "sku": { "name": "Gold", "capacity": 1 },
                    "publisher": { "name": "Acme", "email": "a@acme.com" }
                }),
            ),
        ]);

        let errors = check(&resources, service::decode);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "bad");
        assert!(errors[0].1.contains("Gold"));
    }

    #[test]
    fn test_check_collects_schema_diagnostics() {
        let resources = BTreeMap::from([(
            "partial".to_string(),
            json!({ "name": "svc1", "gateway_url": "https://x" }),
        )]);

        let errors = check(&resources, service::decode);

        let message = &errors[0].1;
        assert!(message.contains("resource_group_name"));
        assert!(message.contains("gateway_url: computed attribute cannot be set"));
        assert!(message.contains("sku"));
    }
}
