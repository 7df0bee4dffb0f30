//! Primitive-module and scheduler bookkeeping (spec §4.2, §9's "move global
//! process state into explicit subsystems" redesign flag).
//!
//! Neither registry interprets what it stores: loading an actual primitive
//! implementation or scheduling algorithm is the scripting prelude's concern
//! and stays out of the core.

use std::collections::HashMap;

use patchbay_core::GroupId;

/// A registered primitive's declared port shape, keyed by qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveDescriptor {
    /// Fully-qualified name used when a group references this primitive.
    pub qualified_name: String,
    /// Declared input port names.
    pub input_ports: Vec<String>,
    /// Declared output port names.
    pub output_ports: Vec<String>,
}

/// A registered scheduler, identified by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerDescriptor {
    /// The scheduler's registered name.
    pub name: String,
}

/// Opaque store of primitive descriptors the runtime can list or look up by
/// qualified name.
#[derive(Debug, Default)]
pub struct PrimitiveRegistry {
    entries: HashMap<String, PrimitiveDescriptor>,
}

impl PrimitiveRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primitive, overwriting any prior registration under the
    /// same qualified name.
    pub fn register(&mut self, descriptor: PrimitiveDescriptor) {
        self.entries.insert(descriptor.qualified_name.clone(), descriptor);
    }

    /// Look up a primitive by qualified name.
    #[must_use]
    pub fn get(&self, qualified_name: &str) -> Option<&PrimitiveDescriptor> {
        self.entries.get(qualified_name)
    }

    /// Every registered primitive, in no particular order.
    #[must_use]
    pub fn list(&self) -> Vec<&PrimitiveDescriptor> {
        self.entries.values().collect()
    }
}

/// Opaque store of scheduler descriptors plus the current per-group
/// selection.
#[derive(Debug, Default)]
pub struct SchedulerRegistry {
    entries: HashMap<String, SchedulerDescriptor>,
    selections: HashMap<GroupId, String>,
}

impl SchedulerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scheduler, overwriting any prior registration under the
    /// same name.
    pub fn register(&mut self, descriptor: SchedulerDescriptor) {
        self.entries.insert(descriptor.name.clone(), descriptor);
    }

    /// Look up a scheduler by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SchedulerDescriptor> {
        self.entries.get(name)
    }

    /// Whether `name` is a registered scheduler.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Record that `group_id` should use the scheduler named `name`.
    /// Recorded verbatim regardless of whether `name` was ever registered
    /// with [`Self::register`], since nothing in this core interprets the
    /// selection.
    pub fn select(&mut self, group_id: GroupId, name: impl Into<String>) {
        self.selections.insert(group_id, name.into());
    }

    /// The scheduler currently selected for `group_id`, if any.
    #[must_use]
    pub fn selected(&self, group_id: GroupId) -> Option<&str> {
        self.selections.get(&group_id).map(String::as_str)
    }
}
