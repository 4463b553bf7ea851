use std::collections::BTreeMap;

use crate::types::{Accessory, AccessoryContext, AccessoryType};

/// The local, authoritative accessory set, keyed by display name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    accessories: BTreeMap<String, Accessory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the built accessory unless the name is taken. Returns the
    /// stored record and whether it was newly inserted; a colliding name never
    /// produces a second record.
    pub fn upsert(&mut self, name: &str, build: impl FnOnce() -> Accessory) -> (&mut Accessory, bool) {
        let mut inserted = false;
        let accessory = self.accessories.entry(name.to_string()).or_insert_with(|| {
            inserted = true;
            build()
        });
        (accessory, inserted)
    }

    pub fn remove(&mut self, name: &str) -> Option<Accessory> {
        self.accessories.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Accessory> {
        self.accessories.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Accessory> {
        self.accessories.get_mut(name)
    }

    pub fn find(&self, predicate: impl Fn(&Accessory) -> bool) -> Option<&Accessory> {
        self.accessories.values().find(|a| predicate(a))
    }

    pub fn all(&self) -> impl Iterator<Item = &Accessory> {
        self.accessories.values()
    }

    pub fn of_type(&self, kind: AccessoryType) -> impl Iterator<Item = &Accessory> {
        self.all().filter(move |a| a.context.kind == kind)
    }

    pub fn names_where(&self, predicate: impl Fn(&AccessoryContext) -> bool) -> Vec<String> {
        self.all()
            .filter(|a| predicate(&a.context))
            .map(|a| a.display_name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }
}
