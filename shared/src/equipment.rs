//! Equipment items, the content library and per-hotbar-slot loadouts.

use crate::action::{Action, PlayerAction};
use crate::entity::EntityId;
use crate::health::DamageType;
use crate::melee::{MeleeAttackType, MeleeSpec};
use crate::protocol::NetworkLoadout;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

pub type ItemId = i32;
pub const EMPTY_ITEM: ItemId = -1;
pub const DEFAULT_SWAP_COOLDOWN: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemSlot {
    Main,
    Offhand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemWeight {
    OneHanded,
    TwoHanded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemBehavior {
    /// Performing does nothing beyond the action's own notifications.
    Basic,
    Melee(MeleeSpec),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemActionSpec {
    pub action: PlayerAction,
    pub cooldown: f32,
    pub stamina_cost: f32,
    pub swap_cooldown: f32,
    pub perform_while_held: bool,
    pub behavior: ItemBehavior,
}

impl ItemActionSpec {
    pub fn basic(action: PlayerAction) -> Self {
        Self {
            action,
            cooldown: 0.0,
            stamina_cost: 0.0,
            swap_cooldown: DEFAULT_SWAP_COOLDOWN,
            perform_while_held: false,
            behavior: ItemBehavior::Basic,
        }
    }

    pub fn melee(spec: MeleeSpec) -> Self {
        Self {
            action: PlayerAction::MeleeAttack,
            cooldown: spec.cooldown,
            stamina_cost: spec.stamina_cost,
            swap_cooldown: DEFAULT_SWAP_COOLDOWN,
            perform_while_held: true,
            behavior: ItemBehavior::Melee(spec),
        }
    }

    pub fn build_action(&self) -> Action<PlayerAction> {
        let action = Action::instant(self.action, self.cooldown, self.stamina_cost)
            .with_activation_delay(self.swap_cooldown);
        if self.perform_while_held {
            action.performed_while_held()
        } else {
            action
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentDef {
    pub id: ItemId,
    pub name: String,
    pub held_prefab: String,
    pub icon: String,
    pub slot: ItemSlot,
    pub weight: ItemWeight,
    pub primary: Option<ItemActionSpec>,
    pub secondary: Option<ItemActionSpec>,
}

impl EquipmentDef {
    pub fn new(id: ItemId, name: &str, slot: ItemSlot, weight: ItemWeight) -> Self {
        Self {
            id,
            name: name.to_string(),
            held_prefab: format!("{}_held", name.to_lowercase()),
            icon: format!("{}_icon", name.to_lowercase()),
            slot,
            weight,
            primary: None,
            secondary: None,
        }
    }

    pub fn with_primary(mut self, spec: ItemActionSpec) -> Self {
        self.primary = Some(spec);
        self
    }

    pub fn with_secondary(mut self, spec: ItemActionSpec) -> Self {
        self.secondary = Some(spec);
        self
    }
}

/// Owned lookup-by-id content catalogue.
#[derive(Debug, Clone, Default)]
pub struct EquipmentLibrary {
    items: HashMap<ItemId, EquipmentDef>,
}

pub const SWORD: ItemId = 1;
pub const SPEAR: ItemId = 2;
pub const SHIELD: ItemId = 3;
pub const TORCH: ItemId = 4;
pub const GREATAXE: ItemId = 5;

impl EquipmentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut library = Self::new();
        library.register(
            EquipmentDef::new(SWORD, "Sword", ItemSlot::Main, ItemWeight::OneHanded)
                .with_primary(ItemActionSpec::melee(MeleeSpec::default())),
        );
        library.register(
            EquipmentDef::new(SPEAR, "Spear", ItemSlot::Main, ItemWeight::TwoHanded)
                .with_primary(ItemActionSpec::melee(MeleeSpec {
                    attack_type: MeleeAttackType::Stab,
                    damage_type: DamageType::Piercing,
                    horizontal_range: 5.0,
                    vertical_range: 10.0,
                    attack_range: 2.0,
                    damage: 25.0,
                    cooldown: 1.2,
                    stamina_cost: 15.0,
                }))
                .with_secondary(ItemActionSpec::basic(PlayerAction::SecondaryItem)),
        );
        library.register(
            EquipmentDef::new(SHIELD, "Shield", ItemSlot::Offhand, ItemWeight::OneHanded)
                .with_primary(ItemActionSpec::basic(PlayerAction::SecondaryItem)),
        );
        library.register(
            EquipmentDef::new(TORCH, "Torch", ItemSlot::Offhand, ItemWeight::OneHanded)
                .with_primary(ItemActionSpec::basic(PlayerAction::SecondaryItem)),
        );
        library.register(
            EquipmentDef::new(GREATAXE, "Greataxe", ItemSlot::Main, ItemWeight::TwoHanded)
                .with_primary(ItemActionSpec::melee(MeleeSpec {
                    attack_type: MeleeAttackType::Cleave,
                    horizontal_range: 60.0,
                    vertical_range: 15.0,
                    attack_range: 1.8,
                    damage: 30.0,
                    cooldown: 1.5,
                    stamina_cost: 20.0,
                    ..Default::default()
                }))
                .with_secondary(ItemActionSpec::melee(MeleeSpec {
                    attack_range: 1.8,
                    damage: 35.0,
                    cooldown: 2.0,
                    stamina_cost: 25.0,
                    ..Default::default()
                })),
        );
        library
    }

    pub fn register(&mut self, item: EquipmentDef) {
        self.items.insert(item.id, item);
    }

    pub fn has(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&EquipmentDef> {
        self.items.get(&id)
    }

    pub fn ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.items.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

pub type InstanceId = u64;

/// Creates and destroys the held representation of an item.
pub trait ItemSpawner {
    fn instantiate(&mut self, item: &EquipmentDef, wielder: EntityId) -> InstanceId;

    fn destroy(&mut self, instance: InstanceId);

    fn set_visible(&mut self, instance: InstanceId, visible: bool);
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeldInstance {
    pub item: ItemId,
    pub wielder: EntityId,
    pub visible: bool,
}

/// In-process spawner that tracks live instances and counts calls.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    next_id: InstanceId,
    live: HashMap<InstanceId, HeldInstance>,
    pub instantiated: usize,
    pub destroyed: usize,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instance: InstanceId) -> Option<&HeldInstance> {
        self.live.get(&instance)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl ItemSpawner for InstanceRegistry {
    fn instantiate(&mut self, item: &EquipmentDef, wielder: EntityId) -> InstanceId {
        self.next_id += 1;
        self.instantiated += 1;
        self.live.insert(
            self.next_id,
            HeldInstance {
                item: item.id,
                wielder,
                visible: false,
            },
        );
        self.next_id
    }

    fn destroy(&mut self, instance: InstanceId) {
        if self.live.remove(&instance).is_some() {
            self.destroyed += 1;
        }
    }

    fn set_visible(&mut self, instance: InstanceId, visible: bool) {
        if let Some(held) = self.live.get_mut(&instance) {
            held.visible = visible;
        }
    }
}

/// An instantiated item plus, on the owner, its bound actions.
#[derive(Debug, Clone)]
pub struct HeldItem {
    pub id: ItemId,
    pub instance: InstanceId,
    pub primary: Option<Action<PlayerAction>>,
    pub secondary: Option<Action<PlayerAction>>,
}

impl HeldItem {
    fn set_active(&mut self, active: bool) {
        for action in [&mut self.primary, &mut self.secondary].into_iter().flatten() {
            action.set_active(active);
        }
    }
}

/// One hotbar slot: a main-hand and an offhand item.
#[derive(Debug, Clone)]
pub struct EquipmentLoadout {
    library: Arc<EquipmentLibrary>,
    wielder: EntityId,
    is_owner: bool,
    active: bool,
    main: Option<HeldItem>,
    offhand: Option<HeldItem>,
}

impl EquipmentLoadout {
    pub fn new(library: Arc<EquipmentLibrary>, wielder: EntityId, is_owner: bool) -> Self {
        Self {
            library,
            wielder,
            is_owner,
            active: false,
            main: None,
            offhand: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn main(&self) -> Option<&HeldItem> {
        self.main.as_ref()
    }

    pub fn offhand(&self) -> Option<&HeldItem> {
        self.offhand.as_ref()
    }

    pub fn main_mut(&mut self) -> Option<&mut HeldItem> {
        self.main.as_mut()
    }

    pub fn offhand_mut(&mut self) -> Option<&mut HeldItem> {
        self.offhand.as_mut()
    }

    pub fn main_item_id(&self) -> ItemId {
        self.main.as_ref().map_or(EMPTY_ITEM, |held| held.id)
    }

    pub fn offhand_item_id(&self) -> ItemId {
        self.offhand.as_ref().map_or(EMPTY_ITEM, |held| held.id)
    }

    pub fn main_def(&self) -> Option<&EquipmentDef> {
        self.main.as_ref().and_then(|held| self.library.get(held.id))
    }

    pub fn offhand_def(&self) -> Option<&EquipmentDef> {
        self.offhand.as_ref().and_then(|held| self.library.get(held.id))
    }

    fn main_weight(&self) -> Option<ItemWeight> {
        self.main_def().map(|def| def.weight)
    }

    pub fn can_equip_offhand(&self) -> bool {
        self.offhand.is_none() && self.main_weight() != Some(ItemWeight::TwoHanded)
    }

    pub fn can_equip(&self, item: &EquipmentDef) -> bool {
        match item.slot {
            ItemSlot::Offhand => self.can_equip_offhand(),
            ItemSlot::Main => {
                self.main.is_none()
                    && (self.offhand.is_none() || item.weight == ItemWeight::OneHanded)
            }
        }
    }

    /// Slots that must be emptied before `id` can be equipped.
    pub fn required_to_swap(&self, id: ItemId) -> Vec<ItemSlot> {
        let Some(item) = self.library.get(id) else {
            return Vec::new();
        };

        let mut required = Vec::new();
        match item.slot {
            ItemSlot::Main => {
                if self.main.is_some() {
                    required.push(ItemSlot::Main);
                }
                if item.weight == ItemWeight::TwoHanded && self.offhand.is_some() {
                    required.push(ItemSlot::Offhand);
                }
            }
            ItemSlot::Offhand => {
                if self.main_weight() == Some(ItemWeight::TwoHanded) {
                    required.push(ItemSlot::Main);
                }
                if self.offhand.is_some() {
                    required.push(ItemSlot::Offhand);
                }
            }
        }
        required
    }

    /// Equip into the item's slot. Declined without mutation when the slot rules forbid it.
    pub fn equip(&mut self, id: ItemId, spawner: &mut dyn ItemSpawner) -> bool {
        let Some(item) = self.library.get(id) else {
            debug!("{} cannot equip unknown item {}", self.wielder, id);
            return false;
        };
        if !self.can_equip(item) {
            debug!("{} has no room for {}", self.wielder, item.name);
            return false;
        }

        let slot = item.slot;
        match slot {
            ItemSlot::Main => self.update_main_item(id, spawner),
            ItemSlot::Offhand => self.update_offhand_item(id, spawner),
        }
        true
    }

    /// Vacate whatever blocks `id`, then equip it.
    pub fn swap_item(&mut self, id: ItemId, spawner: &mut dyn ItemSpawner) -> bool {
        if !self.library.has(id) {
            return false;
        }
        for slot in self.required_to_swap(id) {
            self.remove_item(slot, spawner);
        }
        self.equip(id, spawner)
    }

    /// Returns whether the slot held anything.
    pub fn remove_item(&mut self, slot: ItemSlot, spawner: &mut dyn ItemSpawner) -> bool {
        match slot {
            ItemSlot::Main => {
                let had = self.main.is_some();
                self.update_main_item(EMPTY_ITEM, spawner);
                had
            }
            ItemSlot::Offhand => {
                let had = self.offhand.is_some();
                self.update_offhand_item(EMPTY_ITEM, spawner);
                had
            }
        }
    }

    fn instantiate(&self, id: ItemId, spawner: &mut dyn ItemSpawner) -> Option<HeldItem> {
        if id == EMPTY_ITEM {
            return None;
        }
        let item = self.library.get(id)?;
        let instance = spawner.instantiate(item, self.wielder);
        spawner.set_visible(instance, self.active);

        let mut held = HeldItem {
            id,
            instance,
            primary: None,
            secondary: None,
        };
        if self.is_owner {
            held.primary = item.primary.map(|spec| spec.build_action());
            held.secondary = item.secondary.map(|spec| spec.build_action());
            held.set_active(self.active);
        }
        Some(held)
    }

    /// Replace the main item only when the id differs.
    pub fn update_main_item(&mut self, id: ItemId, spawner: &mut dyn ItemSpawner) {
        if self.main_item_id() == id {
            return;
        }
        if let Some(previous) = self.main.take() {
            spawner.destroy(previous.instance);
        }
        self.main = self.instantiate(id, spawner);
    }

    pub fn update_offhand_item(&mut self, id: ItemId, spawner: &mut dyn ItemSpawner) {
        if self.offhand_item_id() == id {
            return;
        }
        if let Some(previous) = self.offhand.take() {
            spawner.destroy(previous.instance);
        }
        self.offhand = self.instantiate(id, spawner);
    }

    /// Idempotent apply of a replicated loadout entry.
    pub fn apply_network(&mut self, loadout: &NetworkLoadout, spawner: &mut dyn ItemSpawner) {
        self.update_main_item(loadout.main_item_id, spawner);
        self.update_offhand_item(loadout.offhand_item_id, spawner);
    }

    pub fn to_network(&self) -> NetworkLoadout {
        NetworkLoadout::new(self.main_item_id(), self.offhand_item_id())
    }

    pub fn set_active(&mut self, active: bool, spawner: &mut dyn ItemSpawner) {
        self.active = active;
        for held in [&mut self.main, &mut self.offhand].into_iter().flatten() {
            spawner.set_visible(held.instance, active);
            held.set_active(active);
        }
        info!(
            "{} loadout {} -> {}",
            self.wielder,
            if active { "activated" } else { "deactivated" },
            self.describe()
        );
    }

    pub fn describe(&self) -> String {
        let name =
            |def: Option<&EquipmentDef>| def.map_or("-".to_string(), |def| def.name.clone());
        format!("[{} | {}]", name(self.main_def()), name(self.offhand_def()))
    }

    /// Destroy every instantiated item.
    pub fn clear(&mut self, spawner: &mut dyn ItemSpawner) {
        self.update_main_item(EMPTY_ITEM, spawner);
        self.update_offhand_item(EMPTY_ITEM, spawner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loadout(is_owner: bool) -> (EquipmentLoadout, InstanceRegistry) {
        let library = Arc::new(EquipmentLibrary::with_defaults());
        (
            EquipmentLoadout::new(library, EntityId(1), is_owner),
            InstanceRegistry::new(),
        )
    }

    #[test]
    fn test_default_library() {
        let library = EquipmentLibrary::with_defaults();
        assert_eq!(library.ids(), vec![SWORD, SPEAR, SHIELD, TORCH, GREATAXE]);
        assert!(!library.has(EMPTY_ITEM));
        assert_eq!(library.get(SPEAR).unwrap().weight, ItemWeight::TwoHanded);
    }

    #[test]
    fn test_equip_one_handed_pair() {
        let (mut loadout, mut spawner) = loadout(true);
        assert!(loadout.equip(SWORD, &mut spawner));
        assert!(loadout.equip(SHIELD, &mut spawner));
        assert_eq!(loadout.to_network(), NetworkLoadout::new(SWORD, SHIELD));
        assert_eq!(spawner.instantiated, 2);
        assert!(loadout.main().unwrap().primary.is_some());
    }

    #[test]
    fn test_two_handed_blocked_by_offhand() {
        let (mut loadout, mut spawner) = loadout(true);
        assert!(loadout.equip(SHIELD, &mut spawner));

        assert!(!loadout.equip(SPEAR, &mut spawner));
        assert_eq!(loadout.to_network(), NetworkLoadout::new(EMPTY_ITEM, SHIELD));

        assert!(loadout.remove_item(ItemSlot::Offhand, &mut spawner));
        assert!(loadout.equip(SPEAR, &mut spawner));
        assert_eq!(loadout.main_item_id(), SPEAR);
    }

    #[test]
    fn test_offhand_blocked_by_two_handed() {
        let (mut loadout, mut spawner) = loadout(true);
        assert!(loadout.equip(GREATAXE, &mut spawner));
        assert!(!loadout.equip(TORCH, &mut spawner));
        assert_eq!(loadout.offhand_item_id(), EMPTY_ITEM);
    }

    #[test]
    fn test_occupied_slot_declines() {
        let (mut loadout, mut spawner) = loadout(true);
        assert!(loadout.equip(SWORD, &mut spawner));
        assert!(!loadout.equip(SWORD, &mut spawner));
        assert!(!loadout.equip(99, &mut spawner));
        assert_eq!(spawner.instantiated, 1);
    }

    #[test]
    fn test_required_to_swap() {
        let (mut loadout, mut spawner) = loadout(true);
        assert!(loadout.required_to_swap(SPEAR).is_empty());

        loadout.equip(SWORD, &mut spawner);
        loadout.equip(SHIELD, &mut spawner);
        assert_eq!(
            loadout.required_to_swap(SPEAR),
            vec![ItemSlot::Main, ItemSlot::Offhand]
        );
        assert_eq!(loadout.required_to_swap(TORCH), vec![ItemSlot::Offhand]);

        assert!(loadout.swap_item(SPEAR, &mut spawner));
        assert_eq!(loadout.to_network(), NetworkLoadout::new(SPEAR, EMPTY_ITEM));
        assert_eq!(loadout.required_to_swap(TORCH), vec![ItemSlot::Main]);
    }

    #[test]
    fn test_remove_empty_slot() {
        let (mut loadout, mut spawner) = loadout(true);
        assert!(!loadout.remove_item(ItemSlot::Main, &mut spawner));
        assert_eq!(spawner.destroyed, 0);
    }

    #[test]
    fn test_apply_network_is_idempotent() {
        let (mut loadout, mut spawner) = loadout(false);
        let state = NetworkLoadout::new(SWORD, TORCH);

        loadout.apply_network(&state, &mut spawner);
        loadout.apply_network(&state, &mut spawner);
        assert_eq!(spawner.instantiated, 2);
        assert_eq!(spawner.destroyed, 0);
        assert!(loadout.main().unwrap().primary.is_none());

        loadout.apply_network(&NetworkLoadout::new(SWORD, EMPTY_ITEM), &mut spawner);
        assert_eq!(spawner.instantiated, 2);
        assert_eq!(spawner.destroyed, 1);
    }

    #[test]
    fn test_set_active_toggles_visibility() {
        let (mut loadout, mut spawner) = loadout(true);
        loadout.equip(SWORD, &mut spawner);
        let instance = loadout.main().unwrap().instance;
        assert!(!spawner.get(instance).unwrap().visible);

        loadout.set_active(true, &mut spawner);
        assert!(spawner.get(instance).unwrap().visible);
        assert!(loadout.main().unwrap().primary.as_ref().unwrap().is_enabled());

        loadout.set_active(false, &mut spawner);
        assert!(!spawner.get(instance).unwrap().visible);
        assert!(!loadout.main().unwrap().primary.as_ref().unwrap().is_enabled());
    }

    #[test]
    fn test_two_handed_never_coexists_with_offhand() {
        let (mut loadout, mut spawner) = loadout(true);
        let sequence = [SHIELD, SPEAR, SWORD, GREATAXE, TORCH, SPEAR, SHIELD];
        for id in sequence {
            loadout.equip(id, &mut spawner);
            loadout.swap_item(id, &mut spawner);
            let two_handed =
                loadout.main_def().map(|def| def.weight) == Some(ItemWeight::TwoHanded);
            assert!(!(two_handed && loadout.offhand().is_some()));
        }
    }
}
