use std::collections::HashMap;
use std::fs;

use serde::Deserialize;
use shared::{AdviceEntry, DiseaseClass};

#[derive(Debug, thiserror::Error)]
pub enum AdviceError {
    #[error("failed to read advice file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse advice file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("no advice entry for class {0}")]
    MissingClass(String),
}

#[derive(Debug, Deserialize)]
struct AdviceFile {
    #[allow(dead_code)]
    version: f32,
    default: AdviceEntry,
    classes: HashMap<String, AdviceEntry>,
}

/// Static cure/prevention text keyed by class name, loaded once at startup.
#[derive(Clone)]
pub struct AdviceTable {
    entries: HashMap<String, AdviceEntry>,
    default_entry: AdviceEntry,
}

impl AdviceTable {
    pub fn load(path: &str) -> Result<Self, AdviceError> {
        let contents = fs::read_to_string(path).map_err(|source| AdviceError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_str(&contents)
    }

    fn from_str(contents: &str) -> Result<Self, AdviceError> {
        let file: AdviceFile = serde_yaml::from_str(contents)?;

        // Every class the model can predict must be covered.
        for name in DiseaseClass::names() {
            if !file.classes.contains_key(name) {
                return Err(AdviceError::MissingClass(name.to_string()));
            }
        }

        Ok(Self {
            entries: file.classes,
            default_entry: file.default,
        })
    }

    /// Exact-match lookup; unknown names fall back to the default entry.
    pub fn lookup(&self, class_name: &str) -> &AdviceEntry {
        self.entries.get(class_name).unwrap_or(&self.default_entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AdviceTable {
        let path = format!("{}/../config/advice.yaml", env!("CARGO_MANIFEST_DIR"));
        AdviceTable::load(&path).unwrap()
    }

    #[test]
    fn healthy_class_has_trivial_cure() {
        let advice = table().lookup("Tomato_healthy").clone();
        assert_eq!(advice.cure, vec!["No treatment needed".to_string()]);
    }

    #[test]
    fn every_class_has_an_entry() {
        let table = table();
        for name in DiseaseClass::names() {
            let entry = table.lookup(name);
            assert!(!entry.cure.is_empty());
            assert!(!entry.prevention.is_empty());
        }
    }

    #[test]
    fn unknown_class_falls_back_to_default() {
        let advice = table().lookup("nonexistent_class").clone();
        assert_eq!(
            advice.cure,
            vec!["No information available for this class.".to_string()]
        );
    }

    #[test]
    fn load_rejects_incomplete_table() {
        let yaml = r#"
version: 1.0
default:
  cure: ["n/a"]
  prevention: ["n/a"]
classes:
  Tomato_healthy:
    cure: ["No treatment needed"]
    prevention: ["keep watering"]
"#;
        let err = AdviceTable::from_str(yaml).unwrap_err();
        assert!(matches!(err, AdviceError::MissingClass(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AdviceTable::load("/nonexistent/advice.yaml").unwrap_err();
        assert!(matches!(err, AdviceError::Io { .. }));
    }
}
