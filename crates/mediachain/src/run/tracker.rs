use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use crate::blueprint::{BlueprintRegistry, BlueprintSummary};
use crate::error::WorkflowError;

use super::model::Run;
use super::store::RunStore;

pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;

/// Clamps a caller-supplied page size into `[1, MAX_LIST_LIMIT]`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIST_LIMIT)
}

/// Creates runs from blueprints and owns their persistence.
pub struct RunTracker {
    registry: Arc<BlueprintRegistry>,
    store: Arc<dyn RunStore>,
}

impl RunTracker {
    pub fn new(registry: Arc<BlueprintRegistry>, store: Arc<dyn RunStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &BlueprintRegistry {
        &self.registry
    }

    pub fn list_blueprints(&self) -> Vec<BlueprintSummary> {
        self.registry.summaries()
    }

    /// Materializes a pending run of `blueprint_name` and persists it.
    /// Nothing is written when the blueprint is unknown.
    pub fn start_run(
        &self,
        blueprint_name: &str,
        inputs: Map<String, Value>,
        labels: Map<String, Value>,
    ) -> Result<Run, WorkflowError> {
        let blueprint = self
            .registry
            .get(blueprint_name)
            .ok_or_else(|| WorkflowError::UnknownBlueprint(blueprint_name.to_string()))?;

        let run = Run::new(&blueprint.name, &blueprint.deliverables, inputs, labels);
        self.store.put(&run)?;

        info!(
            run_id = %run.run_id,
            blueprint = %run.blueprint_name,
            deliverables = run.deliverables.len(),
            "Run started"
        );
        Ok(run)
    }

    pub fn get_run(&self, run_id: &str) -> Result<Run, WorkflowError> {
        self.store
            .get(run_id)?
            .ok_or_else(|| WorkflowError::RunNotFound(run_id.to_string()))
    }

    pub fn list_runs(&self, limit: usize) -> Result<Vec<Run>, WorkflowError> {
        Ok(self.store.list(clamp_limit(limit))?)
    }

    /// Re-derives the status, bumps `updated_at` and writes the run.
    pub fn save_run(&self, run: &mut Run) -> Result<(), WorkflowError> {
        run.touch();
        self.store.put(run)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::model::{DeliverableStatus, RunStatus};
    use crate::run::store::MemoryRunStore;

    fn tracker() -> RunTracker {
        RunTracker::new(
            Arc::new(BlueprintRegistry::builtin()),
            Arc::new(MemoryRunStore::new()),
        )
    }

    #[test]
    fn test_start_run_materializes_deliverables() {
        let tracker = tracker();
        let run = tracker
            .start_run("launch_campaign", Map::new(), Map::new())
            .unwrap();

        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.deliverables.len(), 3);
        assert!(run
            .deliverables
            .iter()
            .all(|d| d.status == DeliverableStatus::Pending));
        assert_eq!(tracker.get_run(&run.run_id).unwrap(), run);
    }

    #[test]
    fn test_unknown_blueprint_writes_nothing() {
        let tracker = tracker();
        let err = tracker
            .start_run("does_not_exist", Map::new(), Map::new())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownBlueprint(name) if name == "does_not_exist"));
        assert!(tracker.list_runs(100).unwrap().is_empty());
    }

    #[test]
    fn test_get_missing_run() {
        assert!(matches!(
            tracker().get_run("nope"),
            Err(WorkflowError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_list_runs_clamps_limit() {
        let tracker = tracker();
        for _ in 0..3 {
            tracker
                .start_run("social_pack", Map::new(), Map::new())
                .unwrap();
        }
        assert_eq!(tracker.list_runs(0).unwrap().len(), 1);
        assert_eq!(tracker.list_runs(2).unwrap().len(), 2);
        assert_eq!(tracker.list_runs(500).unwrap().len(), 3);
        assert_eq!(clamp_limit(500), MAX_LIST_LIMIT);
    }

    #[test]
    fn test_save_run_rederives_status() {
        let tracker = tracker();
        let mut run = tracker
            .start_run("social_pack", Map::new(), Map::new())
            .unwrap();
        run.deliverables[0].status = DeliverableStatus::Ready;
        tracker.save_run(&mut run).unwrap();

        let stored = tracker.get_run(&run.run_id).unwrap();
        assert_eq!(stored.status, RunStatus::Completed);
        assert!(stored.updated_at >= stored.created_at);
    }
}
