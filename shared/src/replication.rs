//! Single-writer replicated values.
//!
//! The authority writes through [`Replicated::set`], which marks the value dirty; a
//! scheduled publish step drains it with [`Replicated::take_changed`]. Every other process
//! only calls [`Replicated::apply`], which compares before mutating so re-delivery of the
//! same value is a no-op.

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePermission {
    Server,
    Owner,
}

/// What this process is relative to one networked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Role {
    pub is_server: bool,
    pub is_owner: bool,
}

impl Role {
    pub fn server() -> Self {
        Self {
            is_server: true,
            is_owner: false,
        }
    }

    pub fn owner() -> Self {
        Self {
            is_server: false,
            is_owner: true,
        }
    }

    pub fn observer() -> Self {
        Self::default()
    }

    pub fn can_write(&self, permission: WritePermission) -> bool {
        match permission {
            WritePermission::Server => self.is_server,
            WritePermission::Owner => self.is_owner,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Replicated<T> {
    value: T,
    permission: WritePermission,
    dirty: bool,
}

impl<T: Clone + PartialEq + std::fmt::Debug> Replicated<T> {
    pub fn new(value: T, permission: WritePermission) -> Self {
        Self {
            value,
            permission,
            dirty: false,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn permission(&self) -> WritePermission {
        self.permission
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Authority-side write. Declined without permission; unchanged values stay clean.
    pub fn set(&mut self, role: Role, value: T) -> bool {
        if !role.can_write(self.permission) {
            debug!("declined write of {:?} without {:?} permission", value, self.permission);
            return false;
        }
        if self.value == value {
            return false;
        }
        self.value = value;
        self.dirty = true;
        true
    }

    pub fn take_changed(&mut self) -> Option<T> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.value.clone())
    }

    /// Replica-side apply. Returns true only if the value changed.
    pub fn apply(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }
}

/// Fixed-length list replicated entry by entry.
#[derive(Debug, Clone)]
pub struct ReplicatedList<T> {
    items: Vec<T>,
    dirty: Vec<bool>,
    permission: WritePermission,
}

impl<T: Clone + PartialEq + std::fmt::Debug> ReplicatedList<T> {
    pub fn new(items: Vec<T>, permission: WritePermission) -> Self {
        let dirty = vec![false; items.len()];
        Self {
            items,
            dirty,
            permission,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn set(&mut self, role: Role, index: usize, value: T) -> bool {
        if !role.can_write(self.permission) {
            return false;
        }
        match self.items.get_mut(index) {
            Some(item) if *item != value => {
                *item = value;
                self.dirty[index] = true;
                true
            }
            _ => false,
        }
    }

    pub fn take_changes(&mut self) -> Vec<(usize, T)> {
        let mut changes = Vec::new();
        for (index, dirty) in self.dirty.iter_mut().enumerate() {
            if *dirty {
                *dirty = false;
                changes.push((index, self.items[index].clone()));
            }
        }
        changes
    }

    pub fn apply(&mut self, index: usize, value: T) -> bool {
        match self.items.get_mut(index) {
            Some(item) if *item != value => {
                *item = value;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_authority_writes() {
        let mut health = Replicated::new(100.0f32, WritePermission::Server);
        assert!(!health.set(Role::owner(), 50.0));
        assert!(!health.set(Role::observer(), 50.0));
        assert!(health.set(Role::server(), 50.0));
        assert_eq!(*health.get(), 50.0);
    }

    #[test]
    fn test_take_changed_drains_once() {
        let mut selected = Replicated::new(0usize, WritePermission::Owner);
        assert!(selected.set(Role::owner(), 2));
        assert_eq!(selected.take_changed(), Some(2));
        assert_eq!(selected.take_changed(), None);

        assert!(!selected.set(Role::owner(), 2));
        assert!(!selected.is_dirty());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut selected = Replicated::new(0usize, WritePermission::Owner);
        assert!(selected.apply(1));
        assert!(!selected.apply(1));
        assert!(!selected.is_dirty());
    }

    #[test]
    fn test_list_changes_per_entry() {
        let mut list = ReplicatedList::new(vec![0, 0, 0], WritePermission::Owner);
        assert!(list.set(Role::owner(), 1, 5));
        assert!(!list.set(Role::owner(), 1, 5));
        assert!(!list.set(Role::owner(), 7, 5));
        assert_eq!(list.take_changes(), vec![(1, 5)]);
        assert!(list.take_changes().is_empty());

        assert!(list.apply(2, 9));
        assert!(!list.apply(2, 9));
        assert_eq!(list.get(2), Some(&9));
    }
}
