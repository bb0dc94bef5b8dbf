//! A player's hotbar: several loadouts, one active, replicated owner to everyone.

use crate::entity::EntityId;
use crate::equipment::{EquipmentLibrary, EquipmentLoadout, ItemId, ItemSlot, ItemSpawner};
use crate::protocol::NetworkLoadout;
use crate::replication::{Replicated, ReplicatedList, Role, WritePermission};
use log::{debug, info};
use std::sync::Arc;

pub const MAX_LOADOUTS: usize = 3;

/// Read-only projection for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadoutView {
    pub selected: usize,
    pub loadouts: Vec<NetworkLoadout>,
}

#[derive(Debug, Clone)]
pub struct PlayerLoadout {
    role: Role,
    loadouts: Vec<EquipmentLoadout>,
    published: ReplicatedList<NetworkLoadout>,
    selected: Replicated<usize>,
}

impl PlayerLoadout {
    pub fn new(
        library: Arc<EquipmentLibrary>,
        wielder: EntityId,
        role: Role,
        spawner: &mut dyn ItemSpawner,
    ) -> Self {
        let mut loadouts: Vec<EquipmentLoadout> = (0..MAX_LOADOUTS)
            .map(|_| EquipmentLoadout::new(library.clone(), wielder, role.is_owner))
            .collect();
        loadouts[0].set_active(true, spawner);

        Self {
            role,
            loadouts,
            published: ReplicatedList::new(
                vec![NetworkLoadout::EMPTY; MAX_LOADOUTS],
                WritePermission::Owner,
            ),
            selected: Replicated::new(0, WritePermission::Owner),
        }
    }

    pub fn len(&self) -> usize {
        self.loadouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loadouts.is_empty()
    }

    pub fn selected(&self) -> usize {
        *self.selected.get()
    }

    pub fn current(&self) -> &EquipmentLoadout {
        &self.loadouts[self.selected()]
    }

    pub fn current_mut(&mut self) -> &mut EquipmentLoadout {
        let index = self.selected();
        &mut self.loadouts[index]
    }

    pub fn get(&self, index: usize) -> Option<&EquipmentLoadout> {
        self.loadouts.get(index)
    }

    /// Owner-only. Declined on replicas or for an invalid slot.
    pub fn add_item(&mut self, id: ItemId, slot: usize, spawner: &mut dyn ItemSpawner) -> bool {
        if !self.role.is_owner {
            return false;
        }
        match self.loadouts.get_mut(slot) {
            Some(loadout) => {
                let equipped = loadout.equip(id, spawner);
                debug!("equip item {} into loadout {}: {}", id, slot, equipped);
                equipped
            }
            None => false,
        }
    }

    pub fn swap_item(&mut self, id: ItemId, slot: usize, spawner: &mut dyn ItemSpawner) -> bool {
        if !self.role.is_owner {
            return false;
        }
        self.loadouts
            .get_mut(slot)
            .map_or(false, |loadout| loadout.swap_item(id, spawner))
    }

    pub fn remove_item(
        &mut self,
        item_slot: ItemSlot,
        slot: usize,
        spawner: &mut dyn ItemSpawner,
    ) -> bool {
        if !self.role.is_owner {
            return false;
        }
        self.loadouts
            .get_mut(slot)
            .map_or(false, |loadout| loadout.remove_item(item_slot, spawner))
    }

    /// Owner-only change of the active hotbar slot.
    pub fn select(&mut self, index: usize, spawner: &mut dyn ItemSpawner) -> bool {
        if index >= self.loadouts.len() {
            return false;
        }
        let previous = self.selected();
        if !self.selected.set(self.role, index) {
            return false;
        }
        self.switch_active(previous, index, spawner);
        true
    }

    fn switch_active(&mut self, previous: usize, current: usize, spawner: &mut dyn ItemSpawner) {
        if let Some(loadout) = self.loadouts.get_mut(previous) {
            loadout.set_active(false, spawner);
        }
        if let Some(loadout) = self.loadouts.get_mut(current) {
            loadout.set_active(true, spawner);
        }
        info!("selected loadout {} (was {})", current, previous);
    }

    /// Diff local loadouts against the published list and return the entries to send.
    pub fn synchronize(&mut self) -> Vec<(usize, NetworkLoadout)> {
        if !self.role.is_owner {
            return Vec::new();
        }
        for (index, loadout) in self.loadouts.iter().enumerate() {
            self.published.set(self.role, index, loadout.to_network());
        }
        self.published.take_changes()
    }

    pub fn take_selection_change(&mut self) -> Option<usize> {
        self.selected.take_changed()
    }

    /// Apply an authoritative loadout entry. Returns true if anything changed. The owner
    /// is the writer and ignores echoes of its own state.
    pub fn apply_remote_loadout(
        &mut self,
        index: usize,
        loadout: &NetworkLoadout,
        spawner: &mut dyn ItemSpawner,
    ) -> bool {
        if self.role.is_owner || !self.published.apply(index, *loadout) {
            return false;
        }
        if let Some(local) = self.loadouts.get_mut(index) {
            local.apply_network(loadout, spawner);
        }
        true
    }

    pub fn apply_remote_selection(&mut self, index: usize, spawner: &mut dyn ItemSpawner) -> bool {
        if self.role.is_owner || index >= self.loadouts.len() {
            return false;
        }
        let previous = self.selected();
        if !self.selected.apply(index) {
            return false;
        }
        self.switch_active(previous, index, spawner);
        true
    }

    pub fn view(&self) -> LoadoutView {
        LoadoutView {
            selected: self.selected(),
            loadouts: self.loadouts.iter().map(|loadout| loadout.to_network()).collect(),
        }
    }

    pub fn clear(&mut self, spawner: &mut dyn ItemSpawner) {
        for loadout in self.loadouts.iter_mut() {
            loadout.clear(spawner);
        }
    }
}
