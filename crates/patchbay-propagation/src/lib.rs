//! The single-pass fixed-point propagation engine (spec §4.1).
//!
//! Propagation starts from one contact receiving a new value, blends it in,
//! and fans the result out along every outgoing wire, breadth-first, until
//! no contact's content changes anymore. Each contact is only ever visited
//! again if an earlier hop produced a *different* value than the one it was
//! already given in this pass — this is what keeps a single pass from
//! looping forever on a cyclic wiring.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use patchbay_core::{blend, ContactChange, ContactId, NetworkState, PropagationError, Value};
use tracing::trace;

/// Run one propagation pass starting from `origin` receiving `new_value`.
///
/// Returns every [`ContactChange`] produced, in the order contacts were
/// settled. A contact whose blended value equals its current content
/// produces no change and is not fanned out further (spec §4.1 step 3,
/// §8 invariant 3/9: idempotence).
///
/// # Errors
///
/// Returns [`PropagationError::ContactNotFound`] if `origin`, or any
/// contact reached while fanning out, does not exist in `state`.
pub fn propagate(
    state: &mut NetworkState,
    origin: ContactId,
    new_value: Value,
) -> Result<Vec<ContactChange>, PropagationError> {
    let mut settled: HashMap<ContactId, Value> = HashMap::new();
    let mut frontier: VecDeque<(ContactId, Value)> = VecDeque::new();
    let mut changes = Vec::new();

    frontier.push_back((origin, new_value));

    while let Some((contact_id, incoming)) = frontier.pop_front() {
        let contact = state
            .contact(contact_id)
            .ok_or(PropagationError::ContactNotFound(contact_id))?;
        let group_id = contact.group_id;
        let previous = contact.content.clone();
        let blend_mode = contact.blend_mode;

        let blended = blend(previous.as_ref(), &incoming, blend_mode);

        if previous.as_ref() == Some(&blended) {
            trace!(%contact_id, "propagation reached a no-op, not fanning out");
            continue;
        }
        if settled.get(&contact_id) == Some(&blended) {
            trace!(%contact_id, "contact already settled at this value this pass");
            continue;
        }
        settled.insert(contact_id, blended.clone());

        let contact_mut = state
            .contact_mut(contact_id)
            .ok_or(PropagationError::ContactNotFound(contact_id))?;
        contact_mut.content = Some(blended.clone());

        changes.push(ContactChange::new(
            contact_id,
            group_id,
            previous,
            blended.clone(),
            Utc::now(),
        ));

        for wire in state.outgoing_wires(contact_id) {
            if let Some(target) = wire.other_endpoint(contact_id) {
                frontier.push_back((target, blended.clone()));
            }
        }
    }

    Ok(changes)
}
