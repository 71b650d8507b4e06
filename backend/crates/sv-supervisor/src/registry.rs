//! Static table of worker definitions, keyed by port.

use crate::{SupervisorError, SupervisorResult, WorkerDefinition};

use std::collections::{BTreeMap, HashSet};
use std::panic::Location;

use error_location::ErrorLocation;
use sv_config::WorkerConfig;

/// Read-only after construction. Construction fails on duplicate ports or
/// duplicate tool ids, so a built registry is always consistent.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: BTreeMap<u16, WorkerDefinition>,
}

impl Registry {
    #[track_caller]
    pub fn new(definitions: Vec<WorkerDefinition>) -> SupervisorResult<Self> {
        let mut by_port: BTreeMap<u16, WorkerDefinition> = BTreeMap::new();
        let mut tools = HashSet::new();

        for definition in definitions {
            if let Some(existing) = by_port.get(&definition.port) {
                return Err(SupervisorError::DuplicatePort {
                    port: definition.port,
                    first: existing.name.clone(),
                    second: definition.name,
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            if let Some(ref tool_id) = definition.tool_id
                && !tools.insert(tool_id.clone())
            {
                return Err(SupervisorError::DuplicateTool {
                    tool_id: tool_id.clone(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            by_port.insert(definition.port, definition);
        }

        Ok(Self {
            definitions: by_port,
        })
    }

    #[track_caller]
    pub fn from_config(workers: &[WorkerConfig]) -> SupervisorResult<Self> {
        Self::new(workers.iter().map(WorkerDefinition::from).collect())
    }

    /// All definitions in port order.
    pub fn all(&self) -> impl Iterator<Item = &WorkerDefinition> {
        self.definitions.values()
    }

    pub fn by_port(&self, port: u16) -> Option<&WorkerDefinition> {
        self.definitions.get(&port)
    }

    pub fn by_tool(&self, tool_id: &str) -> Option<&WorkerDefinition> {
        self.definitions
            .values()
            .find(|definition| definition.tool_id.as_deref() == Some(tool_id))
    }

    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.definitions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
