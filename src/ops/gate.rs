//! Target filter gate: a chain of filters that may veto candidate target
//! containers before move-to and duplicate-to.

use serde::Serialize;

use crate::model::collection::CollectionSettings;
use crate::model::config::GateConfig;
use crate::model::item::CollectionId;
use crate::ops::index::ContainerIndex;

/// Error type for filters that misuse the gate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("{policy} can only be denied for targets in another collection")]
    PolicyViolation { policy: &'static str },
    #[error("target filter #{0} widened the candidate set")]
    Widened(usize),
}

/// Whether the target collection is the batch's own collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetScope {
    Same,
    Another,
}

/// What the filters are asked about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRequest {
    pub collection: CollectionId,
    pub scope: TargetScope,
    /// Existing container numbers, plus the next free number if a new
    /// container would fit
    pub candidates: Vec<u32>,
}

impl GateRequest {
    pub fn new(
        index: &ContainerIndex,
        settings: CollectionSettings,
        scope: TargetScope,
    ) -> Self {
        let mut candidates = index.numbers();
        let fits = settings
            .max_containers
            .is_none_or(|max| (index.len() as u64) < u64::from(max));
        if fits {
            candidates.push(index.next_number());
        }
        GateRequest {
            collection: index.collection(),
            scope,
            candidates,
        }
    }
}

/// The surviving candidates and policy flags after filtering.
///
/// A verdict can only be narrowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateVerdict {
    containers: Vec<u32>,
    keep_original: bool,
    create_new: bool,
    scope: TargetScope,
}

impl GateVerdict {
    pub(crate) fn open(request: &GateRequest) -> Self {
        GateVerdict {
            containers: request.candidates.clone(),
            keep_original: true,
            create_new: true,
            scope: request.scope,
        }
    }

    pub fn containers(&self) -> &[u32] {
        &self.containers
    }

    pub fn keep_original(&self) -> bool {
        self.keep_original
    }

    pub fn create_new(&self) -> bool {
        self.create_new
    }

    pub fn allows(&self, number: u32) -> bool {
        self.containers.contains(&number)
    }

    /// Remove a candidate container
    pub fn without(mut self, number: u32) -> Self {
        self.containers.retain(|&n| n != number);
        self
    }

    pub fn deny_keep_original(mut self) -> Result<Self, GateError> {
        if self.scope == TargetScope::Same {
            return Err(GateError::PolicyViolation {
                policy: "keep_original",
            });
        }
        self.keep_original = false;
        Ok(self)
    }

    pub fn deny_create_new(mut self) -> Result<Self, GateError> {
        if self.scope == TargetScope::Same {
            return Err(GateError::PolicyViolation {
                policy: "create_new",
            });
        }
        self.create_new = false;
        Ok(self)
    }

    /// Whether `self` is no wider than `prev`
    fn narrows(&self, prev: &GateVerdict) -> bool {
        self.scope == prev.scope
            && self.containers.iter().all(|n| prev.allows(*n))
            && (prev.keep_original || !self.keep_original)
            && (prev.create_new || !self.create_new)
    }
}

/// A listener that may veto candidate targets
pub trait TargetFilter {
    fn filter(&self, request: &GateRequest, verdict: GateVerdict)
    -> Result<GateVerdict, GateError>;
}

impl<F> TargetFilter for F
where
    F: Fn(&GateRequest, GateVerdict) -> Result<GateVerdict, GateError>,
{
    fn filter(
        &self,
        request: &GateRequest,
        verdict: GateVerdict,
    ) -> Result<GateVerdict, GateError> {
        self(request, verdict)
    }
}

/// Ordered chain of target filters, folded left to right
#[derive(Default)]
pub struct TargetGate {
    filters: Vec<Box<dyn TargetFilter>>,
}

impl TargetGate {
    pub fn new() -> Self {
        TargetGate::default()
    }

    /// Gate with the built-in veto list from the workspace config
    pub fn from_config(config: &GateConfig) -> Self {
        TargetGate::new().with(VetoList::from(config))
    }

    pub fn with(mut self, filter: impl TargetFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn run(&self, request: &GateRequest) -> Result<GateVerdict, GateError> {
        self.filters
            .iter()
            .enumerate()
            .try_fold(GateVerdict::open(request), |verdict, (i, f)| {
                let next = f.filter(request, verdict.clone())?;
                if !next.narrows(&verdict) {
                    return Err(GateError::Widened(i));
                }
                Ok(next)
            })
    }
}

/// Built-in filter: vetoed numbers plus the cross-collection policy flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VetoList {
    pub veto: Vec<u32>,
    pub keep_original: bool,
    pub create_new: bool,
}

impl From<&GateConfig> for VetoList {
    fn from(config: &GateConfig) -> Self {
        VetoList {
            veto: config.veto.clone(),
            keep_original: config.keep_original,
            create_new: config.create_new,
        }
    }
}

impl TargetFilter for VetoList {
    fn filter(
        &self,
        request: &GateRequest,
        verdict: GateVerdict,
    ) -> Result<GateVerdict, GateError> {
        let mut verdict = self.veto.iter().fold(verdict, |v, &n| v.without(n));
        if request.scope == TargetScope::Another {
            if !self.keep_original {
                verdict = verdict.deny_keep_original()?;
            }
            if !self.create_new {
                verdict = verdict.deny_create_new()?;
            }
        }
        Ok(verdict)
    }
}
