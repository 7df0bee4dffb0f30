//! The external-input envelope (spec §6): everything a driver or an
//! out-of-process caller can ask the userspace runtime to do.

use serde::{Deserialize, Serialize};

use crate::ids::{ContactId, GroupId, WireId};
use crate::model::{BoundaryDirection, WireKind};
use crate::value::{BlendMode, Value};

/// A request crossing from a driver (or the outside world) into the
/// userspace runtime.
///
/// Tag-discriminated the same way the kernel's own request/response
/// envelopes are, so a bridge can forward these over the wire unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ExternalInput {
    /// Create a new group, optionally nested under `parent_id`.
    RegisterGroup {
        /// Human-readable name for the new group.
        name: String,
        /// Enclosing group, or `None` for a top-level group.
        parent_id: Option<GroupId>,
    },

    /// Create a new contact inside `group_id`.
    AddContact {
        /// The owning group.
        group_id: GroupId,
        /// How new values are combined with existing content.
        blend_mode: BlendMode,
        /// Boundary-port declaration, if this contact crosses the group
        /// wall.
        boundary: Option<(BoundaryDirection, String)>,
    },

    /// Connect two contacts with a wire.
    CreateWire {
        /// The group the wire is declared in.
        group_id: GroupId,
        /// Source endpoint.
        from_id: ContactId,
        /// Destination endpoint.
        to_id: ContactId,
        /// Directed or bidirectional.
        kind: WireKind,
    },

    /// Remove a wire without touching its endpoints.
    RemoveWire {
        /// The wire to remove.
        wire_id: WireId,
    },

    /// Remove a contact, detaching every wire that references it.
    RemoveContact {
        /// The contact to remove.
        contact_id: ContactId,
    },

    /// Remove a group and everything nested under it: contacts, wires, and
    /// subgroups, recursively.
    RemoveGroup {
        /// The group to remove.
        group_id: GroupId,
    },

    /// Push a new value into a contact and run propagation from it.
    ScheduleUpdate {
        /// The contact to update.
        contact_id: ContactId,
        /// The value to blend in.
        value: Value,
    },

    /// Register interest in a contact's future changes.
    Subscribe {
        /// The contact to watch.
        contact_id: ContactId,
    },

    /// Register a primitive module implementation, identified by a
    /// qualified name, with its declared port shape. The runtime treats the
    /// implementation as opaque; interpreting it is out of scope
    /// (spec §4.2 Non-goals).
    RegisterPrimitive {
        /// Fully-qualified name used when a group references this
        /// primitive.
        qualified_name: String,
        /// Declared input port names.
        input_ports: Vec<String>,
        /// Declared output port names.
        output_ports: Vec<String>,
    },

    /// Select which scheduler a group should use for propagation ordering.
    /// Recorded but not interpreted (spec §4.2 Non-goals).
    SelectScheduler {
        /// The group the scheduler applies to.
        group_id: GroupId,
        /// Name of the registered scheduler.
        name: String,
    },

    /// Read a contact's current value without scheduling an update.
    QueryContact {
        /// The contact to read.
        contact_id: ContactId,
    },

    /// Read a group's structure without mutating it.
    QueryGroup {
        /// The group to read.
        group_id: GroupId,
        /// Include each of the group's direct contact IDs.
        include_contacts: bool,
        /// Include each of the group's direct wire IDs.
        include_wires: bool,
        /// Include the group's direct subgroup IDs.
        include_subgroups: bool,
    },
}

/// The userspace runtime's reply to an [`ExternalInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ExternalReply {
    /// A group was created.
    GroupRegistered {
        /// The new group's ID.
        group_id: GroupId,
    },
    /// A contact was created.
    ContactAdded {
        /// The new contact's ID.
        contact_id: ContactId,
    },
    /// A wire was created.
    WireCreated {
        /// The new wire's ID.
        wire_id: WireId,
    },
    /// A structural removal (wire, contact, or group) completed.
    Removed,
    /// A scheduled update was accepted and propagated.
    Updated {
        /// Contacts whose content changed as a result.
        changed: Vec<ContactId>,
    },
    /// A subscription was registered.
    Subscribed,
    /// A primitive implementation was registered.
    PrimitiveRegistered,
    /// A scheduler was selected for a group.
    SchedulerSelected,
    /// A contact query's result (spec §6: the reply is also published as a
    /// change on the synthetic `system` contact, [`ContactId::system`]).
    ContactQueried {
        /// The contact that was read.
        contact_id: ContactId,
        /// Its current value, or `None` if it has never been updated.
        value: Option<Value>,
    },
    /// A group query's result. Each `Option` is `None` when the
    /// corresponding `include_*` flag on the request was `false`.
    GroupQueried {
        /// The group that was read.
        group_id: GroupId,
        /// Direct contact IDs, if requested.
        contacts: Option<Vec<ContactId>>,
        /// Direct wire IDs, if requested.
        wires: Option<Vec<WireId>>,
        /// Direct subgroup IDs, if requested.
        subgroups: Option<Vec<GroupId>>,
    },
    /// The request failed; the cause is carried as a display string so this
    /// type stays serializable without coupling to the runtime's error
    /// enum.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}
