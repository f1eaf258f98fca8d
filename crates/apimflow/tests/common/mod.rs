use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const VALID_MANIFEST: &str = r#"
api_management_services:
  primary:
    name: acme-apim
    resource_group_name: acme-rg
    location: West Europe
    sku:
      - type: Developer
        capacity: 1
    publisher:
      name: Acme
      email: ops@acme.com
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_manifest(&self, content: &str) -> PathBuf {
        let path = self.manifest_path();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.path().join("apim.yaml")
    }

    #[allow(dead_code)]
    pub fn write_state(&self, content: &str) {
        let dir = self.root.path().join(".apimflow");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("state.json"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
