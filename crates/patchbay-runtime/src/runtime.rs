//! The userspace runtime: owns [`NetworkState`], exposes the authoring
//! operations of spec §4.2, and decodes [`ExternalInput`] arriving from
//! drivers.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use patchbay_core::{
    BlendMode, BoundaryDirection, Contact, ContactChange, ContactId, CoreError, ExternalInput,
    ExternalReply, Group, GroupId, GroupState, NetworkState, PrimitiveDescriptor as GroupPrimitive,
    Value, Wire, WireId, WireKind,
};
use patchbay_kernel::{Kernel, UserspaceHandler};
use tokio::sync::Mutex;
use tracing::debug;

use crate::registry::{PrimitiveDescriptor, PrimitiveRegistry, SchedulerRegistry};
use crate::subscription::{SubscriberFn, SubscriberRegistry, SubscriptionId};

/// Owns the network, mirrors propagation results to the kernel, and answers
/// [`ExternalInput`] on the kernel's behalf.
///
/// A fresh runtime boots with one root group (spec §3's `rootGroupId`),
/// which also becomes the current group new top-level operations default
/// to.
pub struct Runtime {
    state: Mutex<NetworkState>,
    kernel: Arc<Kernel>,
    subscribers: Mutex<SubscriberRegistry>,
    primitives: Mutex<PrimitiveRegistry>,
    schedulers: Mutex<SchedulerRegistry>,
    subscribed_contacts: Mutex<HashSet<ContactId>>,
}

impl Runtime {
    /// Create a runtime wired to `kernel`, with a fresh root group.
    #[must_use]
    pub fn new(kernel: Arc<Kernel>) -> Self {
        let root = Group::new("root", None);
        let root_id = root.id;

        let mut state = NetworkState::new();
        state.groups.insert(
            root_id,
            GroupState {
                group: Some(root),
                contacts: std::collections::HashMap::new(),
                wires: std::collections::HashMap::new(),
            },
        );
        state.root_group_id = Some(root_id);
        state.current_group_id = Some(root_id);

        Self {
            state: Mutex::new(state),
            kernel,
            subscribers: Mutex::new(SubscriberRegistry::new()),
            primitives: Mutex::new(PrimitiveRegistry::new()),
            schedulers: Mutex::new(SchedulerRegistry::new()),
            subscribed_contacts: Mutex::new(HashSet::new()),
        }
    }

    /// The group created when this runtime booted.
    pub async fn root_group_id(&self) -> GroupId {
        self.state
            .lock()
            .await
            .root_group_id
            .expect("a runtime always has a root group")
    }

    /// Current value of a contact, if it has one.
    pub async fn contact_content(&self, contact_id: ContactId) -> Option<Value> {
        self.state.lock().await.contact(contact_id)?.content.clone()
    }

    /// Register a group, idempotent by ID (spec §4.2): a group already
    /// present under `group.id` is left untouched and its ID is returned.
    ///
    /// For a group carrying a [`GroupPrimitive`] descriptor, one boundary
    /// contact is materialized per declared input and output port before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GroupNotFound`] if `group.parent_id` names a
    /// group that does not exist, or [`CoreError::DuplicateGroupId`] if
    /// `group.id` is already registered under a different name or parent —
    /// only reachable when a caller supplies its own ID rather than one
    /// produced by [`Group::new`] (spec §4.2).
    pub async fn register_group(&self, group: Group) -> Result<GroupId, CoreError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.groups.get(&group.id).and_then(|g| g.group.as_ref()) {
            return if existing.name == group.name && existing.parent_id == group.parent_id {
                Ok(group.id)
            } else {
                Err(CoreError::DuplicateGroupId(group.id))
            };
        }
        if let Some(parent_id) = group.parent_id {
            if !state.groups.contains_key(&parent_id) {
                return Err(CoreError::GroupNotFound(parent_id));
            }
        }

        let group_id = group.id;
        let parent_id = group.parent_id;
        let primitive = group.primitive.clone();

        state.groups.insert(
            group_id,
            GroupState {
                group: Some(group),
                contacts: std::collections::HashMap::new(),
                wires: std::collections::HashMap::new(),
            },
        );
        if let Some(parent_id) = parent_id {
            if let Some(parent) = state.groups.get_mut(&parent_id).and_then(|g| g.group.as_mut()) {
                parent.subgroup_ids.push(group_id);
            }
        }

        if let Some(primitive) = primitive {
            materialize_boundary_ports(&mut state, group_id, &primitive);
        }

        debug!(%group_id, "group registered");
        Ok(group_id)
    }

    /// Create and register a new group named `name`, nested under
    /// `parent_id` (or top-level if `None`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GroupNotFound`] if `parent_id` is given but does
    /// not name an existing group.
    pub async fn create_group(
        &self,
        name: impl Into<String>,
        parent_id: Option<GroupId>,
    ) -> Result<GroupId, CoreError> {
        self.register_group(Group::new(name, parent_id)).await
    }

    /// Add a contact to `group_id` (spec §4.2's `addContact`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GroupNotFound`] if `group_id` does not exist.
    pub async fn add_contact(
        &self,
        group_id: GroupId,
        blend_mode: BlendMode,
        boundary: Option<(BoundaryDirection, String)>,
    ) -> Result<ContactId, CoreError> {
        let mut state = self.state.lock().await;
        let group_state = state.groups.get_mut(&group_id).ok_or(CoreError::GroupNotFound(group_id))?;

        let mut contact = Contact::new(group_id, blend_mode);
        if let Some((direction, name)) = boundary {
            contact = contact.as_boundary(direction, name);
        }
        let contact_id = contact.id;
        let is_boundary = contact.is_boundary();

        group_state.contacts.insert(contact_id, contact);
        if let Some(group) = group_state.group.as_mut() {
            group.contact_ids.push(contact_id);
            if is_boundary {
                group.boundary_contact_ids.push(contact_id);
            }
        }

        Ok(contact_id)
    }

    /// Connect two contacts with a wire (spec §4.2's `connect`).
    ///
    /// If the source endpoint already has content, propagation runs
    /// immediately from source to target; for a bidirectional wire where
    /// both endpoints already have content, the source's value wins.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ContactNotFound`] if either endpoint is
    /// missing, or [`CoreError::CrossGroupViolation`] if the endpoints
    /// cross a group boundary without a boundary contact (spec §3).
    pub async fn connect(
        &self,
        group_id: GroupId,
        from: ContactId,
        to: ContactId,
        kind: WireKind,
    ) -> Result<WireId, CoreError> {
        let (wire_id, initial) = {
            let mut state = self.state.lock().await;
            if state.contact(from).is_none() {
                return Err(CoreError::ContactNotFound(from));
            }
            if state.contact(to).is_none() {
                return Err(CoreError::ContactNotFound(to));
            }
            if !state.validate_wire_endpoints(from, to) {
                return Err(CoreError::CrossGroupViolation { from, to });
            }

            let wire = Wire::new(group_id, from, to, kind);
            let wire_id = wire.id;
            let group_state = state.groups.get_mut(&group_id).ok_or(CoreError::GroupNotFound(group_id))?;
            group_state.wires.insert(wire_id, wire);
            if let Some(group) = group_state.group.as_mut() {
                group.wire_ids.push(wire_id);
            }

            let initial = state.contact(from).and_then(|c| c.content.clone());
            (wire_id, initial)
        };

        if let Some(value) = initial {
            self.schedule_update(from, value).await?;
        }

        Ok(wire_id)
    }

    /// Push a new value into `contact_id` and run propagation (spec §4.2's
    /// `scheduleUpdate`).
    ///
    /// Each resulting change is handed to the kernel without waiting for
    /// driver dispatch to finish, then delivered to local subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Propagation`] if `contact_id` does not exist.
    pub async fn schedule_update(
        &self,
        contact_id: ContactId,
        value: Value,
    ) -> Result<Vec<ContactChange>, CoreError> {
        let changes = {
            let mut state = self.state.lock().await;
            patchbay_propagation::propagate(&mut state, contact_id, value)?
        };

        for change in &changes {
            self.kernel.handle_change(change.clone()).await;
            self.subscribers.lock().await.notify(change);
        }

        Ok(changes)
    }

    /// Register a local callback for every change `scheduleUpdate` produces.
    pub async fn subscribe(&self, callback: SubscriberFn) -> SubscriptionId {
        self.subscribers.lock().await.subscribe(callback)
    }

    /// Stop a previously registered local callback from receiving changes.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().await.unsubscribe(id);
    }

    /// Remove a contact, detaching every wire that touches it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ContactNotFound`] if `contact_id` does not
    /// exist.
    pub async fn remove_contact(&self, contact_id: ContactId) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let group_id = state
            .contact(contact_id)
            .ok_or(CoreError::ContactNotFound(contact_id))?
            .group_id;

        for group_state in state.groups.values_mut() {
            group_state
                .wires
                .retain(|_, wire| wire.from_id != contact_id && wire.to_id != contact_id);
        }

        let group_state = state.groups.get_mut(&group_id).expect("group looked up by contact must exist");
        group_state.contacts.remove(&contact_id);
        if let Some(group) = group_state.group.as_mut() {
            group.contact_ids.retain(|id| *id != contact_id);
            group.boundary_contact_ids.retain(|id| *id != contact_id);
        }

        Ok(())
    }

    /// Remove a group and everything nested under it, recursively.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GroupNotFound`] if `group_id` does not exist.
    pub async fn remove_group(&self, group_id: GroupId) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        if !state.groups.contains_key(&group_id) {
            return Err(CoreError::GroupNotFound(group_id));
        }

        remove_group_recursive(&mut state, group_id);

        for group_state in state.groups.values_mut() {
            if let Some(group) = group_state.group.as_mut() {
                group.subgroup_ids.retain(|id| *id != group_id);
            }
        }

        Ok(())
    }

    /// Create a wire (spec §4.2's `create_wire`, identical in effect to
    /// [`Self::connect`]).
    ///
    /// # Errors
    ///
    /// See [`Self::connect`].
    pub async fn create_wire(
        &self,
        group_id: GroupId,
        from: ContactId,
        to: ContactId,
        kind: WireKind,
    ) -> Result<WireId, CoreError> {
        self.connect(group_id, from, to, kind).await
    }

    /// Remove a wire without touching its endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WireNotFound`] if `wire_id` does not exist.
    pub async fn remove_wire(&self, wire_id: WireId) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        for group_state in state.groups.values_mut() {
            if let Some(group) = group_state.group.as_mut() {
                group.wire_ids.retain(|id| *id != wire_id);
            }
            if group_state.wires.remove(&wire_id).is_some() {
                return Ok(());
            }
        }
        Err(CoreError::WireNotFound(wire_id))
    }

    /// Register a primitive implementation's declared port shape.
    pub async fn register_primitive(&self, descriptor: PrimitiveDescriptor) {
        self.primitives.lock().await.register(descriptor);
    }

    /// Select the scheduler a group should use for propagation ordering.
    /// Recorded but not interpreted (spec §4.2 Non-goals).
    pub async fn select_scheduler(&self, group_id: GroupId, name: impl Into<String>) {
        self.schedulers.lock().await.select(group_id, name);
    }

    /// Whether an anonymous external caller has registered interest in
    /// `contact_id` via [`ExternalInput::Subscribe`].
    ///
    /// The envelope only specifies registration, not a delivery channel back
    /// to an anonymous caller (spec §6) — this lets a bridge poll interest
    /// before including a contact's changes in its own outbound batches,
    /// without this core inventing a push mechanism the spec never defines.
    pub async fn is_subscribed(&self, contact_id: ContactId) -> bool {
        self.subscribed_contacts.lock().await.contains(&contact_id)
    }

    /// Read a contact's current value without scheduling an update
    /// (spec §6's `external-query-contact`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ContactNotFound`] if `contact_id` does not
    /// exist.
    pub async fn query_contact(&self, contact_id: ContactId) -> Result<Option<Value>, CoreError> {
        let state = self.state.lock().await;
        let contact = state.contact(contact_id).ok_or(CoreError::ContactNotFound(contact_id))?;
        Ok(contact.content.clone())
    }

    /// Read a group's structure without mutating it (spec §6's
    /// `external-query-group`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::GroupNotFound`] if `group_id` does not exist.
    #[allow(clippy::type_complexity)]
    pub async fn query_group(
        &self,
        group_id: GroupId,
        include_contacts: bool,
        include_wires: bool,
        include_subgroups: bool,
    ) -> Result<(Option<Vec<ContactId>>, Option<Vec<WireId>>, Option<Vec<GroupId>>), CoreError> {
        let state = self.state.lock().await;
        let group_state = state.groups.get(&group_id).ok_or(CoreError::GroupNotFound(group_id))?;

        let contacts = include_contacts.then(|| group_state.contacts.keys().copied().collect());
        let wires = include_wires.then(|| group_state.wires.keys().copied().collect());
        let subgroups = include_subgroups.then(|| {
            group_state
                .group
                .as_ref()
                .map(|g| g.subgroup_ids.clone())
                .unwrap_or_default()
        });

        Ok((contacts, wires, subgroups))
    }

    /// Dispatch a query's result as a change on the synthetic `system`
    /// contact (spec §6: "query variants produce reply change records
    /// addressed to a synthetic `system` contact"), so bridges and
    /// subscribers observe query replies the same way they observe any
    /// other change.
    async fn publish_system_reply(&self, payload: serde_json::Value) {
        let root = self.root_group_id().await;
        let change = ContactChange::new(ContactId::system(), root, None, Value::Json(payload), Utc::now());
        self.kernel.handle_change(change).await;
    }
}

fn materialize_boundary_ports(state: &mut NetworkState, group_id: GroupId, primitive: &GroupPrimitive) {
    let group_state = state.groups.get_mut(&group_id).expect("group just inserted");

    let mut new_contacts = Vec::new();
    for name in &primitive.input_ports {
        let contact = Contact::new(group_id, BlendMode::AcceptLast)
            .as_boundary(BoundaryDirection::Input, name.clone());
        new_contacts.push(contact);
    }
    for name in &primitive.output_ports {
        let contact = Contact::new(group_id, BlendMode::AcceptLast)
            .as_boundary(BoundaryDirection::Output, name.clone());
        new_contacts.push(contact);
    }

    for contact in new_contacts {
        let contact_id = contact.id;
        group_state.contacts.insert(contact_id, contact);
        if let Some(group) = group_state.group.as_mut() {
            group.contact_ids.push(contact_id);
            group.boundary_contact_ids.push(contact_id);
        }
    }
}

fn remove_group_recursive(state: &mut NetworkState, group_id: GroupId) {
    let subgroup_ids = state
        .groups
        .get(&group_id)
        .and_then(|g| g.group.as_ref())
        .map(|g| g.subgroup_ids.clone())
        .unwrap_or_default();

    for subgroup_id in subgroup_ids {
        remove_group_recursive(state, subgroup_id);
    }

    if let Some(removed) = state.groups.remove(&group_id) {
        let owned_contacts: HashSet<ContactId> = removed.contacts.keys().copied().collect();
        for group_state in state.groups.values_mut() {
            group_state
                .wires
                .retain(|_, wire| !owned_contacts.contains(&wire.from_id) && !owned_contacts.contains(&wire.to_id));
        }
    }
}

#[async_trait]
impl UserspaceHandler for Runtime {
    async fn handle_external_input(&self, input: ExternalInput) -> ExternalReply {
        match input {
            ExternalInput::RegisterGroup { name, parent_id } => {
                match self.create_group(name, parent_id).await {
                    Ok(group_id) => ExternalReply::GroupRegistered { group_id },
                    Err(err) => ExternalReply::Failed { reason: err.to_string() },
                }
            },

            ExternalInput::AddContact {
                group_id,
                blend_mode,
                boundary,
            } => match self.add_contact(group_id, blend_mode, boundary).await {
                Ok(contact_id) => ExternalReply::ContactAdded { contact_id },
                Err(err) => ExternalReply::Failed { reason: err.to_string() },
            },

            ExternalInput::CreateWire {
                group_id,
                from_id,
                to_id,
                kind,
            } => match self.create_wire(group_id, from_id, to_id, kind).await {
                Ok(wire_id) => ExternalReply::WireCreated { wire_id },
                Err(err) => ExternalReply::Failed { reason: err.to_string() },
            },

            ExternalInput::RemoveWire { wire_id } => match self.remove_wire(wire_id).await {
                Ok(()) => ExternalReply::Removed,
                Err(err) => ExternalReply::Failed { reason: err.to_string() },
            },

            ExternalInput::RemoveContact { contact_id } => match self.remove_contact(contact_id).await {
                Ok(()) => ExternalReply::Removed,
                Err(err) => ExternalReply::Failed { reason: err.to_string() },
            },

            ExternalInput::RemoveGroup { group_id } => match self.remove_group(group_id).await {
                Ok(()) => ExternalReply::Removed,
                Err(err) => ExternalReply::Failed { reason: err.to_string() },
            },

            ExternalInput::ScheduleUpdate { contact_id, value } => {
                match self.schedule_update(contact_id, value).await {
                    Ok(changes) => ExternalReply::Updated {
                        changed: changes.into_iter().map(|c| c.contact_id).collect(),
                    },
                    Err(err) => ExternalReply::Failed { reason: err.to_string() },
                }
            },

            ExternalInput::Subscribe { contact_id } => {
                self.subscribed_contacts.lock().await.insert(contact_id);
                ExternalReply::Subscribed
            },

            ExternalInput::RegisterPrimitive {
                qualified_name,
                input_ports,
                output_ports,
            } => {
                self.register_primitive(PrimitiveDescriptor {
                    qualified_name,
                    input_ports,
                    output_ports,
                })
                .await;
                ExternalReply::PrimitiveRegistered
            },

            ExternalInput::SelectScheduler { group_id, name } => {
                self.select_scheduler(group_id, name).await;
                ExternalReply::SchedulerSelected
            },

            ExternalInput::QueryContact { contact_id } => match self.query_contact(contact_id).await {
                Ok(value) => {
                    self.publish_system_reply(serde_json::json!({
                        "query": "contact",
                        "contact_id": contact_id,
                        "value": value,
                    }))
                    .await;
                    ExternalReply::ContactQueried { contact_id, value }
                },
                Err(err) => ExternalReply::Failed { reason: err.to_string() },
            },

            ExternalInput::QueryGroup {
                group_id,
                include_contacts,
                include_wires,
                include_subgroups,
            } => match self
                .query_group(group_id, include_contacts, include_wires, include_subgroups)
                .await
            {
                Ok((contacts, wires, subgroups)) => {
                    self.publish_system_reply(serde_json::json!({
                        "query": "group",
                        "group_id": group_id,
                        "contacts": contacts,
                        "wires": wires,
                        "subgroups": subgroups,
                    }))
                    .await;
                    ExternalReply::GroupQueried {
                        group_id,
                        contacts,
                        wires,
                        subgroups,
                    }
                },
                Err(err) => ExternalReply::Failed { reason: err.to_string() },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use patchbay_core::PrimitiveDescriptor as GroupPrimitiveDescriptor;
    use patchbay_kernel::KernelConfig;

    use super::*;

    fn new_runtime() -> Runtime {
        Runtime::new(Arc::new(Kernel::new(KernelConfig::default())))
    }

    #[tokio::test]
    async fn register_group_is_idempotent_by_id() {
        let runtime = new_runtime();
        let group = Group::new("widgets", None);

        let first = runtime.register_group(group.clone()).await.unwrap();
        let second = runtime.register_group(group).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn register_group_rejects_id_collision_with_different_content() {
        let runtime = new_runtime();
        let mut group = Group::new("widgets", None);
        runtime.register_group(group.clone()).await.unwrap();

        group.name = "gadgets".into();
        let result = runtime.register_group(group.clone()).await;
        assert_eq!(result, Err(CoreError::DuplicateGroupId(group.id)));
    }

    #[tokio::test]
    async fn register_group_rejects_unknown_parent() {
        let runtime = new_runtime();
        let orphan = Group::new("orphan", Some(GroupId::new()));
        let result = runtime.register_group(orphan).await;
        assert!(matches!(result, Err(CoreError::GroupNotFound(_))));
    }

    #[tokio::test]
    async fn register_group_with_primitive_materializes_boundary_ports() {
        let runtime = new_runtime();
        let group = Group::new_primitive(
            "adder",
            None,
            GroupPrimitiveDescriptor {
                input_ports: vec!["a".into(), "b".into()],
                output_ports: vec!["sum".into()],
            },
        );
        let group_id = runtime.register_group(group).await.unwrap();

        let state = runtime.state.lock().await;
        let group_state = state.group(group_id).unwrap();
        assert_eq!(group_state.group.as_ref().unwrap().boundary_contact_ids.len(), 3);
        assert_eq!(group_state.contacts.len(), 3);
    }

    #[tokio::test]
    async fn connect_propagates_immediately_when_source_has_content() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();
        let b = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();

        runtime.schedule_update(a, Value::Number(5.0)).await.unwrap();
        runtime.connect(root, a, b, WireKind::Directed).await.unwrap();

        assert_eq!(runtime.contact_content(b).await, Some(Value::Number(5.0)));
    }

    #[tokio::test]
    async fn connect_rejects_unknown_endpoints() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();

        let result = runtime.connect(root, a, ContactId::new(), WireKind::Directed).await;
        assert!(matches!(result, Err(CoreError::ContactNotFound(_))));
    }

    #[tokio::test]
    async fn connect_rejects_cross_group_wires_without_a_boundary() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let other = runtime.create_group("other", None).await.unwrap();
        let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();
        let b = runtime.add_contact(other, BlendMode::AcceptLast, None).await.unwrap();

        let result = runtime.connect(root, a, b, WireKind::Directed).await;
        assert!(matches!(result, Err(CoreError::CrossGroupViolation { .. })));
    }

    #[tokio::test]
    async fn remove_contact_detaches_its_wires() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();
        let b = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();
        let wire_id = runtime.connect(root, a, b, WireKind::Directed).await.unwrap();

        runtime.remove_contact(a).await.unwrap();

        let result = runtime.remove_wire(wire_id).await;
        assert!(matches!(result, Err(CoreError::WireNotFound(_))));
    }

    #[tokio::test]
    async fn remove_group_cascades_to_contacts_and_subgroups() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let child = runtime.create_group("child", Some(root)).await.unwrap();
        let contact = runtime.add_contact(child, BlendMode::AcceptLast, None).await.unwrap();

        runtime.remove_group(child).await.unwrap();

        assert_eq!(runtime.contact_content(contact).await, None);
        let state = runtime.state.lock().await;
        assert!(state.group(child).is_none());
        assert!(!state
            .group(root)
            .unwrap()
            .group
            .as_ref()
            .unwrap()
            .subgroup_ids
            .contains(&child));
    }

    #[tokio::test]
    async fn schedule_update_notifies_local_subscribers() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        runtime
            .subscribe(Arc::new(move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
            }))
            .await;

        runtime.schedule_update(a, Value::Number(1.0)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn external_subscribe_is_recorded_and_queryable() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();

        assert!(!runtime.is_subscribed(a).await);
        let reply = runtime.handle_external_input(ExternalInput::Subscribe { contact_id: a }).await;
        assert_eq!(reply, ExternalReply::Subscribed);
        assert!(runtime.is_subscribed(a).await);
    }

    #[tokio::test]
    async fn query_contact_returns_current_value() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();
        runtime.schedule_update(a, Value::Number(9.0)).await.unwrap();

        let reply = runtime.handle_external_input(ExternalInput::QueryContact { contact_id: a }).await;
        assert_eq!(
            reply,
            ExternalReply::ContactQueried {
                contact_id: a,
                value: Some(Value::Number(9.0)),
            }
        );
    }

    #[tokio::test]
    async fn query_contact_rejects_unknown_id() {
        let runtime = new_runtime();
        let result = runtime.query_contact(ContactId::new()).await;
        assert!(matches!(result, Err(CoreError::ContactNotFound(_))));
    }

    #[tokio::test]
    async fn query_group_respects_include_flags() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;
        let a = runtime.add_contact(root, BlendMode::AcceptLast, None).await.unwrap();
        let child = runtime.create_group("child", Some(root)).await.unwrap();

        let reply = runtime
            .handle_external_input(ExternalInput::QueryGroup {
                group_id: root,
                include_contacts: true,
                include_wires: false,
                include_subgroups: true,
            })
            .await;

        match reply {
            ExternalReply::GroupQueried {
                contacts,
                wires,
                subgroups,
                ..
            } => {
                assert_eq!(contacts, Some(vec![a]));
                assert_eq!(wires, None);
                assert_eq!(subgroups, Some(vec![child]));
            },
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn external_input_decodes_register_primitive_and_select_scheduler() {
        let runtime = new_runtime();
        let root = runtime.root_group_id().await;

        let reply = runtime
            .handle_external_input(ExternalInput::RegisterPrimitive {
                qualified_name: "core.add".into(),
                input_ports: vec!["a".into()],
                output_ports: vec!["sum".into()],
            })
            .await;
        assert_eq!(reply, ExternalReply::PrimitiveRegistered);

        let reply = runtime
            .handle_external_input(ExternalInput::SelectScheduler {
                group_id: root,
                name: "round-robin".into(),
            })
            .await;
        assert_eq!(reply, ExternalReply::SchedulerSelected);
    }
}
