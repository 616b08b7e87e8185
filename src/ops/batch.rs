//! Runs one batch: decode, resolve, gate, plan, apply.

use serde::Serialize;

use crate::model::config::{EngineConfig, WorkspaceConfig};
use crate::model::item::CollectionId;
use crate::ops::apply::{self, ApplyError, ApplyReport};
use crate::ops::decode::{self, Action, DecodeError, Operation, Request};
use crate::ops::gate::{GateError, GateRequest, TargetFilter, TargetGate, TargetScope};
use crate::ops::index::ContainerIndex;
use crate::ops::planner::{self, Destination, Plan, PlanError};
use crate::ops::store::{DeletionQueue, Store, StoreError};

/// Error type for a batch as a whole
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] DecodeError),
    #[error("{action}: invalid target: {reason}")]
    InvalidTarget {
        action: Action,
        #[source]
        reason: PlanError,
    },
    #[error("target filter error: {0}")]
    PolicyViolation(#[from] GateError),
    #[error("collection not found: {0}")]
    UnknownCollection(CollectionId),
    #[error(transparent)]
    StoreWrite(#[from] ApplyError),
}

impl BatchError {
    fn from_store(err: StoreError, collection: CollectionId) -> Self {
        match err {
            StoreError::UnknownCollection(id) => BatchError::UnknownCollection(id),
            _ => BatchError::UnknownCollection(collection),
        }
    }
}

/// Outcome of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub action: Action,
    pub collection: CollectionId,
    /// Items that took part after resolving ids
    pub selected: usize,
    /// Ids that were unknown, foreign or already deleting
    pub dropped: usize,
    #[serde(flatten)]
    pub outcome: ApplyReport,
}

/// The batch mutation engine: engine settings plus the target filter chain
pub struct BatchEngine {
    engine: EngineConfig,
    gate: TargetGate,
}

impl BatchEngine {
    pub fn new(engine: EngineConfig, gate: TargetGate) -> Self {
        BatchEngine { engine, gate }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        BatchEngine::new(config.engine.clone(), TargetGate::from_config(&config.gate))
    }

    /// Append a filter to the gate chain
    pub fn with_filter(mut self, filter: impl TargetFilter + 'static) -> Self {
        self.gate = self.gate.with(filter);
        self
    }

    /// Decode a payload and run it against `collection`
    pub fn run(
        &self,
        store: &mut dyn Store,
        queue: &dyn DeletionQueue,
        collection: CollectionId,
        payload: &str,
    ) -> Result<BatchReport, BatchError> {
        let request = decode::decode(payload)?;
        self.execute(store, queue, collection, request)
    }

    pub fn execute(
        &self,
        store: &mut dyn Store,
        queue: &dyn DeletionQueue,
        collection: CollectionId,
        request: Request,
    ) -> Result<BatchReport, BatchError> {
        let action = request.action;
        let settings = store
            .settings(collection)
            .map_err(|e| BatchError::from_store(e, collection))?;

        let selection = decode::resolve(store, collection, &request.item_ids);
        tracing::info!(
            %action,
            collection,
            selected = selection.items.len(),
            dropped = selection.dropped,
            "batch started"
        );
        if selection.dropped > 0 {
            tracing::debug!(dropped = selection.dropped, "ignored stale item ids");
        }

        let mut report = BatchReport {
            action,
            collection,
            selected: selection.items.len(),
            dropped: selection.dropped,
            outcome: ApplyReport::default(),
        };
        if selection.items.is_empty() {
            return Ok(report);
        }

        let source = ContainerIndex::build(store, collection)
            .map_err(|e| BatchError::from_store(e, collection))?;
        let items = selection.items;
        let invalid = |reason: PlanError| BatchError::InvalidTarget { action, reason };

        let plan: Plan = match request.operation {
            Operation::Indent { delta } => {
                planner::plan_indent(action, &source, items, delta, self.engine.max_indent)
            }
            Operation::SetVisibility { visible, on_page } => {
                planner::plan_visibility(action, &source, settings, items, visible, on_page)
            }
            Operation::Duplicate => {
                planner::plan_duplicate(action, &source, settings, items, &self.engine.copy_suffix)
            }
            Operation::Delete => planner::plan_delete(action, &source, items),
            Operation::MoveTo {
                target,
                collection: target_collection,
            } => {
                if let Some(other) = target_collection.filter(|&c| c != collection) {
                    return Err(invalid(PlanError::CrossCollectionMove(other)));
                }
                let request = GateRequest::new(&source, settings, TargetScope::Same);
                let verdict = self.gate.run(&request)?;
                let dest = Destination {
                    index: &source,
                    settings,
                    verdict: &verdict,
                };
                planner::plan_move_to(action, &dest, items, target).map_err(invalid)?
            }
            Operation::DuplicateTo {
                collection: target_collection,
                target,
            } => {
                let dest_id = target_collection.unwrap_or(collection);
                let (scope, dest_settings, dest_index) = if dest_id == collection {
                    (TargetScope::Same, settings, source.clone())
                } else {
                    let dest_settings = store
                        .settings(dest_id)
                        .map_err(|e| BatchError::from_store(e, dest_id))?;
                    let dest_index = ContainerIndex::build(store, dest_id)
                        .map_err(|e| BatchError::from_store(e, dest_id))?;
                    (TargetScope::Another, dest_settings, dest_index)
                };
                let request = GateRequest::new(&dest_index, dest_settings, scope);
                let verdict = self.gate.run(&request)?;
                let dest = Destination {
                    index: &dest_index,
                    settings: dest_settings,
                    verdict: &verdict,
                };
                planner::plan_duplicate_to(
                    action,
                    &source,
                    &dest,
                    items,
                    target,
                    &self.engine.copy_suffix,
                )
                .map_err(invalid)?
            }
        };
        tracing::debug!(%action, steps = plan.len(), "plan ready");

        report.outcome = apply::apply(store, queue, &plan)?;
        tracing::info!(
            %action,
            collection,
            changed = report.outcome.changed.len(),
            created = report.outcome.created.len(),
            "batch finished"
        );
        Ok(report)
    }
}
