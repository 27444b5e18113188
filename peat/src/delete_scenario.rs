use crate::{options::DeleteScenario, workspace::Workspace};
use anyhow::Result;
use evac::naming::clean_scenario_name;
use log::warn;

impl DeleteScenario {
    pub fn run(&self) -> Result<()> {
        let ws = Workspace::new(&self.workspace);
        if !delete_scenario(&ws, &self.scenario)? {
            warn!("no artifacts for scenario {}", self.scenario);
        }
        Ok(())
    }
}

/// Removes a scenario's directory. The name is cleaned the same way
/// the steps that wrote it cleaned it.
pub fn delete_scenario(ws: &Workspace, scenario: &str) -> Result<bool> {
    let scenario = clean_scenario_name(scenario)?;
    ws.delete_scenario(&scenario)
}

#[cfg(test)]
mod tests {
    use super::delete_scenario;
    use crate::workspace::Workspace;
    use evac::{
        naming::{ArtifactKey, Role},
        ConfigError,
    };

    #[test]
    fn test_cleaned_name() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let path = ws.path(&ArtifactKey::scenario(Role::CostInverse, "S2024_flood"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();

        assert!(delete_scenario(&ws, "2024 flood").unwrap());
        assert!(!path.exists());
        assert!(dir.path().exists());

        let err = delete_scenario(&ws, "scratch").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ScenarioName(_))
        ));
    }
}
