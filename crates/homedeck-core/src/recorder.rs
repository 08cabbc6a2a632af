// ── Action recording ──
//
// While recording is active, every acknowledged write is merged into a
// named action: `actions[name][device][field] = value`. The whole file is
// rewritten as pretty JSON after each merge.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::CoreError;
use crate::model::{DeviceId, FieldMap};

/// Device -> recorded field values, for one action.
pub type ActionSteps = BTreeMap<DeviceId, FieldMap>;

/// Action name -> steps.
pub type RecordedActions = BTreeMap<String, ActionSteps>;

#[derive(Debug)]
pub struct ActionRecorder {
    action: String,
    path: PathBuf,
    actions: Mutex<RecordedActions>,
}

impl ActionRecorder {
    /// Open the action file at `path` (created on first write) and record
    /// into the action called `action`.
    pub fn open(action: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let actions = load(&path)?;
        Ok(Self {
            action: action.into(),
            path,
            actions: Mutex::new(actions),
        })
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge `fields` into the current action and persist.
    pub fn record(&self, device: &DeviceId, fields: &FieldMap) -> Result<(), CoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut actions = self
            .actions
            .lock()
            .map_err(|_| CoreError::Internal("action recorder lock poisoned".into()))?;
        actions
            .entry(self.action.clone())
            .or_default()
            .entry(device.clone())
            .or_default()
            .extend(fields.iter().map(|(k, v)| (k.clone(), *v)));

        debug!(
            action = %self.action,
            device = %device,
            fields = fields.len(),
            "recorded action step"
        );
        save(&self.path, &actions)
    }

    pub fn steps(&self) -> ActionSteps {
        self.actions
            .lock()
            .ok()
            .and_then(|a| a.get(&self.action).cloned())
            .unwrap_or_default()
    }
}

fn load(path: &Path) -> Result<RecordedActions, CoreError> {
    match std::fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => Ok(RecordedActions::new()),
        Ok(raw) => serde_json::from_str(&raw).map_err(|e| CoreError::Recording {
            message: format!("{}: {e}", path.display()),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RecordedActions::new()),
        Err(e) => Err(CoreError::Recording {
            message: format!("{}: {e}", path.display()),
        }),
    }
}

fn save(path: &Path, actions: &RecordedActions) -> Result<(), CoreError> {
    let recording_err = |e: &dyn std::fmt::Display| CoreError::Recording {
        message: format!("{}: {e}", path.display()),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| recording_err(&e))?;
    }
    let json = serde_json::to_string_pretty(actions).map_err(|e| recording_err(&e))?;
    std::fs::write(path, json).map_err(|e| recording_err(&e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(pairs: &[(&str, i64)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).into()))
            .collect()
    }

    #[test]
    fn steps_merge_per_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        let recorder = ActionRecorder::open("Movie night", &path).unwrap();

        recorder.record(&"lamp-1".into(), &fields(&[("On", 1)])).unwrap();
        recorder
            .record(&"lamp-1".into(), &fields(&[("Brightness", 20)]))
            .unwrap();
        recorder.record(&"plug-7".into(), &fields(&[("On", 0)])).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({
                "Movie night": {
                    "lamp-1": { "Brightness": 20, "On": 1 },
                    "plug-7": { "On": 0 }
                }
            })
        );
    }

    #[test]
    fn existing_actions_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(&path, r#"{ "Morning": { "blinds": { "TargetPosition": 100 } } }"#).unwrap();

        let recorder = ActionRecorder::open("Evening", &path).unwrap();
        recorder.record(&"lamp-1".into(), &fields(&[("On", 1)])).unwrap();

        let written: RecordedActions =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.contains_key("Morning"));
        assert_eq!(recorder.steps().len(), 1);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ActionRecorder::open("x", &path),
            Err(CoreError::Recording { .. })
        ));
    }
}
