//! The network data model: contacts, wires, groups, and the root aggregate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ContactId, GroupId, WireId};
use crate::value::{BlendMode, Value};

/// Which side of a group boundary a boundary contact faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryDirection {
    /// Accepts values crossing into the group from outside.
    Input,
    /// Emits values crossing out of the group.
    Output,
}

/// Boundary-port metadata for a contact marked `is_boundary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryInfo {
    /// Which way values cross at this port.
    pub direction: BoundaryDirection,
    /// Human name used when the owning group acts as a primitive gadget.
    pub name: String,
}

/// An addressable value slot (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Unique identifier.
    pub id: ContactId,
    /// The owning group.
    pub group_id: GroupId,
    /// Current payload, absent until the first update reaches this contact.
    pub content: Option<Value>,
    /// How new values are combined with existing content.
    pub blend_mode: BlendMode,
    /// Boundary-port metadata, present only when this contact crosses a
    /// group wall.
    pub boundary: Option<BoundaryInfo>,
}

impl Contact {
    /// Create a new, content-less contact in `group_id`.
    #[must_use]
    pub fn new(group_id: GroupId, blend_mode: BlendMode) -> Self {
        Self {
            id: ContactId::new(),
            group_id,
            content: None,
            blend_mode,
            boundary: None,
        }
    }

    /// Mark this contact as a boundary port.
    #[must_use]
    pub fn as_boundary(mut self, direction: BoundaryDirection, name: impl Into<String>) -> Self {
        self.boundary = Some(BoundaryInfo {
            direction,
            name: name.into(),
        });
        self
    }

    /// Whether this contact is a boundary port (spec §3).
    #[must_use]
    pub fn is_boundary(&self) -> bool {
        self.boundary.is_some()
    }
}

/// Whether a wire carries values one way or both ways (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireKind {
    /// Values flow only from `from_id` to `to_id`.
    Directed,
    /// Values flow in both directions.
    Bidirectional,
}

/// A typed edge inside a group, or crossing a group wall via a boundary
/// contact (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    /// Unique identifier.
    pub id: WireId,
    /// The group this wire is declared in.
    pub group_id: GroupId,
    /// Source endpoint.
    pub from_id: ContactId,
    /// Destination endpoint.
    pub to_id: ContactId,
    /// Directed or bidirectional.
    pub kind: WireKind,
}

impl Wire {
    /// Create a new wire. Does not validate the same-group-or-boundary
    /// invariant — callers should use
    /// [`NetworkState::validate_wire_endpoints`] first.
    #[must_use]
    pub fn new(group_id: GroupId, from_id: ContactId, to_id: ContactId, kind: WireKind) -> Self {
        Self {
            id: WireId::new(),
            group_id,
            from_id,
            to_id,
            kind,
        }
    }

    /// Whether `contact` can act as a propagation source on this wire.
    #[must_use]
    pub fn sources_from(&self, contact: ContactId) -> bool {
        match self.kind {
            WireKind::Bidirectional => self.from_id == contact || self.to_id == contact,
            WireKind::Directed => self.from_id == contact,
        }
    }

    /// The endpoint opposite `contact`, if `contact` participates in this
    /// wire at all.
    #[must_use]
    pub fn other_endpoint(&self, contact: ContactId) -> Option<ContactId> {
        if self.from_id == contact {
            Some(self.to_id)
        } else if self.to_id == contact {
            Some(self.from_id)
        } else {
            None
        }
    }
}

/// Input/output port names for a group acting as a primitive gadget
/// (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveDescriptor {
    /// Names of boundary contacts materialized as inputs.
    pub input_ports: Vec<String>,
    /// Names of boundary contacts materialized as outputs.
    pub output_ports: Vec<String>,
}

/// A named container of contacts, wires, and subgroups (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier.
    pub id: GroupId,
    /// Human-readable name.
    pub name: String,
    /// The enclosing group, `None` for the root group.
    pub parent_id: Option<GroupId>,
    /// Contacts owned directly by this group, in creation order.
    pub contact_ids: Vec<ContactId>,
    /// Wires owned directly by this group, in creation order.
    pub wire_ids: Vec<WireId>,
    /// Subgroups nested directly under this group, in creation order.
    pub subgroup_ids: Vec<GroupId>,
    /// Boundary contacts owned by this group, in creation order.
    pub boundary_contact_ids: Vec<ContactId>,
    /// Present when this group is a parameterized primitive gadget.
    pub primitive: Option<PrimitiveDescriptor>,
}

impl Group {
    /// Create a new, empty group.
    #[must_use]
    pub fn new(name: impl Into<String>, parent_id: Option<GroupId>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            parent_id,
            contact_ids: Vec::new(),
            wire_ids: Vec::new(),
            subgroup_ids: Vec::new(),
            boundary_contact_ids: Vec::new(),
            primitive: None,
        }
    }

    /// Create a new group acting as a primitive gadget.
    #[must_use]
    pub fn new_primitive(
        name: impl Into<String>,
        parent_id: Option<GroupId>,
        primitive: PrimitiveDescriptor,
    ) -> Self {
        let mut group = Self::new(name, parent_id);
        group.primitive = Some(primitive);
        group
    }
}

/// A group's owned contacts and wires (spec §3's `GroupState`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupState {
    /// The group's own metadata.
    pub group: Option<Group>,
    /// Contacts owned by this group, keyed by ID.
    pub contacts: HashMap<ContactId, Contact>,
    /// Wires owned by this group, keyed by ID.
    pub wires: HashMap<WireId, Wire>,
}

/// The root aggregate: every group in one runtime instance (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkState {
    /// All groups, keyed by ID.
    pub groups: HashMap<GroupId, GroupState>,
    /// The top-level group created when the runtime boots.
    pub root_group_id: Option<GroupId>,
    /// The group userspace operations apply to when no explicit group is
    /// given.
    pub current_group_id: Option<GroupId>,
}

impl NetworkState {
    /// Create an empty network with no groups yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a contact by ID across all groups.
    #[must_use]
    pub fn contact(&self, id: ContactId) -> Option<&Contact> {
        self.groups.values().find_map(|g| g.contacts.get(&id))
    }

    /// Look up a contact by ID across all groups, mutably.
    pub fn contact_mut(&mut self, id: ContactId) -> Option<&mut Contact> {
        self.groups.values_mut().find_map(|g| g.contacts.get_mut(&id))
    }

    /// Look up a group's state by ID.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&GroupState> {
        self.groups.get(&id)
    }

    /// All wires, in any group, where `contact` participates as a
    /// propagation source (spec §4.1 step 4).
    ///
    /// Searches every group rather than just the contact's own, because a
    /// boundary contact can be the endpoint of a wire declared in the
    /// neighboring group it crosses into.
    #[must_use]
    pub fn outgoing_wires(&self, contact: ContactId) -> Vec<&Wire> {
        self.groups
            .values()
            .flat_map(|g| g.wires.values())
            .filter(|w| w.sources_from(contact))
            .collect()
    }

    /// Validate the wire-endpoint invariant (spec §3): endpoints share a
    /// group, unless at least one is a boundary contact.
    #[must_use]
    pub fn validate_wire_endpoints(&self, from: ContactId, to: ContactId) -> bool {
        let (Some(from_contact), Some(to_contact)) = (self.contact(from), self.contact(to)) else {
            return false;
        };
        from_contact.group_id == to_contact.group_id
            || from_contact.is_boundary()
            || to_contact.is_boundary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_group(state: &mut NetworkState, group: Group) {
        state.groups.insert(
            group.id,
            GroupState {
                group: Some(group),
                contacts: HashMap::new(),
                wires: HashMap::new(),
            },
        );
    }

    #[test]
    fn wire_endpoints_same_group_is_valid() {
        let mut state = NetworkState::new();
        let group = Group::new("g", None);
        let gid = group.id;
        insert_group(&mut state, group);

        let a = Contact::new(gid, BlendMode::AcceptLast);
        let b = Contact::new(gid, BlendMode::AcceptLast);
        let (aid, bid) = (a.id, b.id);
        state.groups.get_mut(&gid).unwrap().contacts.insert(aid, a);
        state.groups.get_mut(&gid).unwrap().contacts.insert(bid, b);

        assert!(state.validate_wire_endpoints(aid, bid));
    }

    #[test]
    fn wire_endpoints_cross_group_requires_boundary() {
        let mut state = NetworkState::new();
        let g1 = Group::new("g1", None);
        let g2 = Group::new("g2", None);
        let (g1id, g2id) = (g1.id, g2.id);
        insert_group(&mut state, g1);
        insert_group(&mut state, g2);

        let a = Contact::new(g1id, BlendMode::AcceptLast);
        let b = Contact::new(g2id, BlendMode::AcceptLast);
        let (aid, bid) = (a.id, b.id);
        state.groups.get_mut(&g1id).unwrap().contacts.insert(aid, a);
        state.groups.get_mut(&g2id).unwrap().contacts.insert(bid, b);

        assert!(!state.validate_wire_endpoints(aid, bid));

        let boundary = Contact::new(g1id, BlendMode::AcceptLast)
            .as_boundary(BoundaryDirection::Output, "out");
        let boundary_id = boundary.id;
        state
            .groups
            .get_mut(&g1id)
            .unwrap()
            .contacts
            .insert(boundary_id, boundary);

        assert!(state.validate_wire_endpoints(boundary_id, bid));
    }

    #[test]
    fn wire_sources_from_respects_kind() {
        let gid = GroupId::new();
        let a = ContactId::new();
        let b = ContactId::new();

        let directed = Wire::new(gid, a, b, WireKind::Directed);
        assert!(directed.sources_from(a));
        assert!(!directed.sources_from(b));

        let bidi = Wire::new(gid, a, b, WireKind::Bidirectional);
        assert!(bidi.sources_from(a));
        assert!(bidi.sources_from(b));
    }
}
