//! Read-only presentation of the local player and recent deaths.

use shared::equipment::{ItemId, EMPTY_ITEM};
use shared::health::{DamageListener, HealthChange};
use shared::loadout::LoadoutView;
use std::collections::VecDeque;
use std::fmt;

const FEED_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct HudView {
    pub health_percent: f32,
    pub stamina_percent: f32,
    pub state: &'static str,
    pub alive: bool,
    pub loadout: LoadoutView,
}

impl fmt::Display for HudView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HP {:>3.0}% | ST {:>3.0}% | {}",
            self.health_percent * 100.0,
            self.stamina_percent * 100.0,
            self.state
        )?;
        for (index, loadout) in self.loadout.loadouts.iter().enumerate() {
            let marker = if index == self.loadout.selected { '*' } else { ' ' };
            write!(
                f,
                " | {}{}: {}/{}",
                marker,
                index + 1,
                item_label(loadout.main_item_id),
                item_label(loadout.offhand_item_id)
            )?;
        }
        Ok(())
    }
}

fn item_label(id: ItemId) -> String {
    if id == EMPTY_ITEM {
        "-".to_string()
    } else {
        id.to_string()
    }
}

/// Last few deaths and revives, newest last.
#[derive(Debug, Default)]
pub struct DeathFeed {
    entries: VecDeque<String>,
}

impl DeathFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: String) {
        if self.entries.len() == FEED_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

impl DamageListener for DeathFeed {
    fn on_damage(&mut self, change: &HealthChange) {
        if !change.died() {
            return;
        }
        match change.source.entity() {
            Some(killer) => self.push(format!("{} killed {}", killer, change.target)),
            None => self.push(format!("{} died", change.target)),
        }
    }

    fn on_heal(&mut self, change: &HealthChange) {
        if change.revived() {
            self.push(format!("{} is back", change.target));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::entity::EntityId;
    use shared::equipment::{SHIELD, SWORD};
    use shared::health::{DamageSource, EventKind};
    use shared::protocol::NetworkLoadout;

    fn change(kind: EventKind, previous: f32, current: f32, source: DamageSource) -> HealthChange {
        HealthChange {
            target: EntityId(4),
            source,
            kind,
            previous,
            current,
            amount: (previous - current).abs(),
        }
    }

    #[test]
    fn test_feed_records_deaths_and_revives() {
        let mut feed = DeathFeed::new();
        feed.on_damage(&change(EventKind::Damage, 50.0, 40.0, DamageSource::Empty));
        assert!(feed.is_empty());

        feed.on_damage(&change(
            EventKind::Damage,
            10.0,
            0.0,
            DamageSource::Entity(EntityId(2)),
        ));
        feed.on_heal(&change(EventKind::Heal, 0.0, 100.0, DamageSource::Empty));

        let entries: Vec<_> = feed.entries().cloned().collect();
        assert_eq!(entries, vec!["#2 killed #4".to_string(), "#4 is back".to_string()]);
    }

    #[test]
    fn test_feed_is_bounded() {
        let mut feed = DeathFeed::new();
        for _ in 0..20 {
            feed.on_damage(&change(EventKind::Damage, 1.0, 0.0, DamageSource::Empty));
        }
        assert_eq!(feed.len(), FEED_CAPACITY);
    }

    #[test]
    fn test_hud_display_marks_selection() {
        let view = HudView {
            health_percent: 0.5,
            stamina_percent: 1.0,
            state: "Idle",
            alive: true,
            loadout: LoadoutView {
                selected: 1,
                loadouts: vec![
                    NetworkLoadout::EMPTY,
                    NetworkLoadout::new(SWORD, SHIELD),
                    NetworkLoadout::EMPTY,
                ],
            },
        };
        let text = view.to_string();
        assert!(text.starts_with("HP  50% | ST 100% | Idle"));
        assert!(text.contains("*2: 1/3"));
        assert!(text.contains(" 1: -/-"));
    }
}
