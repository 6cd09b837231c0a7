use serde::{Deserialize, Serialize};

/// A single generated file inside an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// Path inside the environment, e.g. `index.html` or `app/main.py`.
    pub path: String,
    /// Full file content.
    pub content: String,
}

/// Everything needed to recreate a running environment from scratch:
/// the generated file set, an optional dependency-install directive,
/// and the port the app serves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Files are written in order.
    pub files: Vec<ArtifactFile>,
    /// Command that installs `dependencies`, e.g. `npm install left-pad`.
    #[serde(default)]
    pub install_command: Option<String>,
    /// Names of additional dependencies beyond the environment template.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Port the app listens on inside the environment.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    80
}

impl Artifact {
    /// Whether a rebuild must run the install directive before writing files.
    pub fn has_additional_dependencies(&self) -> bool {
        self.install_command.is_some() && !self.dependencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_defaults_to_80() {
        let artifact: Artifact = serde_json::from_str(
            r#"{"files": [{"path": "index.html", "content": "<h1>hi</h1>"}]}"#,
        )
        .unwrap();
        assert_eq!(artifact.port, 80);
        assert!(artifact.install_command.is_none());
        assert!(artifact.dependencies.is_empty());
    }

    #[test]
    fn test_additional_dependencies_require_both_fields() {
        let mut artifact = Artifact {
            files: vec![],
            install_command: None,
            dependencies: vec![],
            port: 3000,
        };
        assert!(!artifact.has_additional_dependencies());

        artifact.dependencies = vec!["left-pad".to_string()];
        assert!(!artifact.has_additional_dependencies());

        artifact.install_command = Some("npm install left-pad".to_string());
        assert!(artifact.has_additional_dependencies());
    }
}
