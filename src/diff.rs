use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::registry::Registry;
use crate::types::*;

/// A leaf that differs between two JSON documents.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Change {
    pub path: String,
    pub old: Value,
    pub new: Value,
}

fn child_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

/// Collects changed leaves. Arrays are compared index by index, so a zone
/// listing diffs as `3.devices.0.batteryState` rather than as a whole.
pub(crate) fn diff_json(previous: &Value, current: &Value, prefix: &str, changes: &mut Vec<Change>) {
    match (previous, current) {
        (Value::Object(prev), Value::Object(curr)) => {
            for (key, curr_val) in curr {
                let path = child_path(prefix, key);
                diff_json(prev.get(key).unwrap_or(&Value::Null), curr_val, &path, changes);
            }
            for (key, prev_val) in prev {
                if !curr.contains_key(key) {
                    diff_json(prev_val, &Value::Null, &child_path(prefix, key), changes);
                }
            }
        }
        (Value::Array(prev), Value::Array(curr)) => {
            for idx in 0..prev.len().max(curr.len()) {
                diff_json(
                    prev.get(idx).unwrap_or(&Value::Null),
                    curr.get(idx).unwrap_or(&Value::Null),
                    &child_path(prefix, &idx.to_string()),
                    changes,
                );
            }
        }
        (Value::Null, Value::Object(_) | Value::Array(_)) => {
            let empty = match current {
                Value::Object(_) => Value::Object(Default::default()),
                _ => Value::Array(Vec::new()),
            };
            diff_json(&empty, current, prefix, changes);
        }
        (prev, curr) if prev != curr => changes.push(Change {
            path: prefix.to_string(),
            old: prev.clone(),
            new: curr.clone(),
        }),
        _ => {}
    }
}

/// One accessory the current poll says should exist.
#[derive(Debug, Clone)]
pub(crate) struct Wanted {
    pub name: String,
    pub context: AccessoryContext,
}

#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub create: Vec<Wanted>,
    pub refresh: Vec<(String, AccessoryContext)>,
    pub remove: Vec<String>,
}

/// Suffixes the id onto display names shared by different remote entities.
pub(crate) fn unique_names(mut wanted: Vec<Wanted>) -> Vec<Wanted> {
    let mut seen: HashMap<String, AccessoryKey> = HashMap::new();
    for w in &mut wanted {
        let key = w.context.key();
        match seen.get(&w.name) {
            Some(owner) if *owner != key => {
                w.name = format!("{} {}", w.name, key.id);
            }
            _ => {}
        }
        seen.entry(w.name.clone()).or_insert(key);
    }
    wanted
}

/// Diffs the wanted set against every registry record the pass manages.
/// Matching is by identity key, never by display name. Creations keep the
/// order of `wanted`, and one whose name is held by another record gets its
/// id suffixed.
pub(crate) fn plan(
    registry: &Registry,
    managed: impl Fn(&AccessoryContext) -> bool,
    wanted: Vec<Wanted>,
) -> Plan {
    let mut index: HashMap<AccessoryKey, usize> = HashMap::new();
    let mut pending: Vec<Option<Wanted>> = Vec::new();
    for w in wanted {
        if let Entry::Vacant(slot) = index.entry(w.context.key()) {
            slot.insert(pending.len());
            pending.push(Some(w));
        }
    }

    let mut plan = Plan::default();
    for accessory in registry.all().filter(|a| managed(&a.context)) {
        let matched = index
            .get(&accessory.context.key())
            .and_then(|&idx| pending[idx].take());
        match matched {
            Some(w) => plan.refresh.push((accessory.display_name.clone(), w.context)),
            // also drops a second record claiming an already matched key
            None => plan.remove.push(accessory.display_name.clone()),
        }
    }

    // A name held by a record this plan keeps belongs to that record.
    let freed: HashSet<&str> = plan.remove.iter().map(String::as_str).collect();
    plan.create = pending
        .into_iter()
        .flatten()
        .map(|mut w| {
            if let Some(holder) = registry.get(&w.name)
                && !freed.contains(w.name.as_str())
                && holder.context.key() != w.context.key()
            {
                w.name = format!("{} {}", w.name, w.context.key().id);
            }
            w
        })
        .collect();
    plan
}

pub(crate) fn apply(plan: Plan, registry: &mut Registry) -> Vec<Event> {
    let mut events = Vec::new();

    for name in plan.remove {
        remove_accessory(registry, &name, &mut events);
    }

    for (name, context) in plan.refresh {
        if let Some(accessory) = registry.get_mut(&name)
            && accessory.context.refresh_from(&context)
        {
            debug!(name = %name, "accessory refreshed");
            events.push(Event::AccessoryUpdated {
                name,
                context: accessory.context.clone(),
            });
        }
    }

    for wanted in plan.create {
        add_accessory(registry, wanted, &mut events);
    }

    events
}

pub(crate) fn add_accessory(registry: &mut Registry, wanted: Wanted, events: &mut Vec<Event>) {
    let Wanted { name, context } = wanted;
    let (accessory, inserted) = registry.upsert(&name, || Accessory::new(&name, context.clone()));
    if inserted {
        info!(name = %name, kind = %context.kind, "adding accessory");
        events.push(Event::AccessoryAdded(accessory.clone()));
    } else if accessory.context.refresh_from(&context) {
        debug!(name = %name, "display name taken, refreshed existing accessory");
        events.push(Event::AccessoryUpdated {
            name,
            context: accessory.context.clone(),
        });
    }
}

pub(crate) fn remove_accessory(registry: &mut Registry, name: &str, events: &mut Vec<Event>) {
    if let Some(accessory) = registry.remove(name) {
        warn!(name = %name, "removing accessory, no longer configured");
        events.push(Event::AccessoryRemoved(accessory));
    }
}
