//! Transition tables for each entity type.

use crate::action::PlayerAction;
use crate::hasm::{EventType, MachineDef, SpeedClass, StateId};
use std::sync::Arc;

macro_rules! state_ids {
    ($name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl StateId for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }
    };
}

state_ids!(PlayerState {
    Idle => "Idle",
    Jump => "Jump",
    Landing => "Landing",
    Walking => "Walking",
    Sprinting => "Sprinting",
    Sliding => "Sliding",
    Falling => "Falling",
    LongFalling => "Long Falling",
    Dodge => "Dodge",
    Rolling => "Rolling",
    Guard => "Guard",
    Punching => "Punching",
    Attacking => "Attacking",
    Dying => "Dying",
    Dead => "Dead",
    Reviving => "Reviving",
});

state_ids!(ZombieState {
    Idle => "Idle",
    Roaming => "Roaming",
    Chase => "Chase",
    Attack => "Attack",
    HitStun => "Hit Stun",
    Dying => "Dying",
    Dead => "Dead",
});

state_ids!(DummyState {
    Idle => "Idle",
    HitReaction => "Hit Reaction",
    HitReset => "Hit Reset",
    Dying => "Dying",
    Dead => "Dead",
    Reviving => "Reviving",
});

state_ids!(ArcherState {
    Idle => "Idle",
    EquipBow => "Equip Bow",
    DrawArrow => "Draw Arrow",
    Aim => "Aim",
    Fire => "Fire",
});

state_ids!(BreakableState {
    Intact => "Intact",
    Broken => "Broken",
});

impl PlayerState {
    pub fn is_dead(&self) -> bool {
        matches!(self, PlayerState::Dying | PlayerState::Dead)
    }
}

impl ZombieState {
    pub fn is_dead(&self) -> bool {
        matches!(self, ZombieState::Dying | ZombieState::Dead)
    }
}

pub fn player_machine() -> Arc<MachineDef<PlayerState>> {
    use PlayerState::*;
    let dead = [Dying, Dead];

    MachineDef::builder(Idle)
        .state(Idle, |s| {
            s.clip("Idle", 1.0)
                .on(EventType::StartMoveInput, Walking)
                .on(EventType::SteepSlope, Sliding)
                .on(EventType::LeaveGround, Falling)
                .on(EventType::BlockStart, Guard)
        })
        .state(Jump, |s| {
            s.clip("Jump", 0.4)
                .on_animation_complete(Falling)
                .on(EventType::Grounded, Landing)
                .on(EventType::SteepSlope, Sliding)
        })
        .state(Landing, |s| {
            s.clip("Landing", 0.3)
                .on_animation_complete(Idle)
                .on(EventType::LeaveGround, Falling)
                .on(EventType::SteepSlope, Sliding)
                .block_all_actions()
        })
        .state(Walking, |s| {
            s.clip("Walking", 1.0)
                .on(EventType::StopMoveInput, Idle)
                .on(EventType::SteepSlope, Sliding)
                .on(EventType::LeaveGround, Falling)
                .on(EventType::StartSprint, Sprinting)
                .on(EventType::BlockStart, Guard)
        })
        .state(Sprinting, |s| {
            s.clip("Sprinting", 1.0)
                .on(EventType::StopMoveInput, Idle)
                .on(EventType::SteepSlope, Sliding)
                .on(EventType::LeaveGround, Falling)
                .on(EventType::StopSprint, Walking)
                .on(EventType::BlockStart, Guard)
                .speed(SpeedClass::Sprinting)
        })
        .state(Sliding, |s| {
            s.clip("Sliding", 1.0)
                .on(EventType::LeaveGround, Falling)
                .on(EventType::Grounded, Landing)
        })
        .state(Falling, |s| {
            s.clip("Falling", 1.0)
                .on(EventType::SteepSlope, Sliding)
                .on(EventType::Grounded, Landing)
                .after(2.0, LongFalling)
        })
        .state(LongFalling, |s| {
            s.clip("Long Falling", 1.0)
                .on(EventType::SteepSlope, Sliding)
                .on(EventType::Grounded, Landing)
        })
        .state(Dodge, |s| {
            s.clip("Dodge", 1.0)
                .on(EventType::DodgeStop, Idle)
                .passthrough()
                .lock_movement_animation()
                .block_all_actions()
        })
        .state(Rolling, |s| {
            s.clip("Rolling", 1.0)
                .on(EventType::RollStop, Idle)
                .lock_movement_animation()
                .block_all_actions()
        })
        .state(Guard, |s| {
            s.clip("Block", 1.0)
                .on(EventType::BlockStop, Idle)
                .block_enabled()
                .allow_only(&[PlayerAction::Block])
        })
        .state(Punching, |s| {
            s.clip("Punching", 0.6)
                .on_animation_complete(Idle)
                .speed(SpeedClass::Attacking)
                .block_all_actions()
        })
        .state(Attacking, |s| {
            s.clip("Attacking", 0.8)
                .on_animation_complete(Idle)
                .speed(SpeedClass::Attacking)
                .block_all_actions()
        })
        .state(Dying, |s| {
            s.clip("Dying", 1.5)
                .on_animation_complete(Dead)
                .on(EventType::Revive, Reviving)
                .block_movement()
                .block_all_actions()
        })
        .state(Dead, |s| {
            s.clip("Dead", 1.0)
                .on(EventType::Revive, Reviving)
                .block_movement()
                .block_all_actions()
        })
        .state(Reviving, |s| {
            s.clip("Reviving", 1.0)
                .on_animation_complete(Idle)
                .invulnerable()
                .block_movement()
                .block_all_actions()
        })
        .from_any(EventType::Death, Dying, &dead)
        .from_any(EventType::Jump, Jump, &[Dying, Dead, Reviving])
        .from_any(EventType::DodgeStart, Dodge, &dead)
        .from_any(EventType::RollStart, Rolling, &dead)
        .from_any(EventType::Punch, Punching, &dead)
        .from_any(EventType::MeleeAttack, Attacking, &dead)
        .build()
}

pub fn zombie_machine() -> Arc<MachineDef<ZombieState>> {
    use ZombieState::*;

    MachineDef::builder(Idle)
        .state(Idle, |s| {
            s.clip("Zombie Idle", 2.0)
                .on(EventType::StartRoam, Roaming)
                .on(EventType::TargetIdentified, Chase)
        })
        .state(Roaming, |s| {
            s.clip("Zombie Walking", 1.0)
                .on(EventType::StopRoam, Idle)
                .on(EventType::TargetIdentified, Chase)
        })
        .state(Chase, |s| {
            s.clip("Zombie Running", 1.0)
                .on(EventType::TargetIdentified, Chase)
                .on(EventType::TargetLost, Idle)
                .on(EventType::Attack, Attack)
        })
        .state(Attack, |s| {
            s.clip("Zombie Attack", 1.0)
                .on_animation_complete(Idle)
                .block_movement()
        })
        .state(HitStun, |s| {
            s.clip("Zombie Reaction Hit", 0.5)
                .on_animation_complete(Idle)
                .block_movement()
        })
        .state(Dying, |s| {
            s.clip("Zombie Dying", 2.0)
                .on_animation_complete(Dead)
                .block_movement()
        })
        .state(Dead, |s| s.clip("Zombie Dead", 1.0).block_movement().passthrough())
        .from_any(EventType::Death, Dying, &[Dying, Dead])
        .from_any(EventType::Hit, HitStun, &[Dying, Dead])
        .build()
}

pub fn dummy_machine() -> Arc<MachineDef<DummyState>> {
    use DummyState::*;

    MachineDef::builder(Idle)
        .state(Idle, |s| s.clip("Idle", 1.0).on(EventType::Hit, HitReaction))
        .state(HitReaction, |s| {
            s.clip("Hit Reaction", 0.6)
                .on(EventType::Hit, HitReset)
                .on_animation_complete(Idle)
        })
        .state(HitReset, |s| s.after(0.05, HitReaction))
        .state(Dying, |s| {
            s.clip("Dying", 1.5)
                .on_animation_complete(Dead)
                .on(EventType::Revive, Reviving)
        })
        .state(Dead, |s| s.clip("Dead", 1.0).on(EventType::Revive, Reviving))
        .state(Reviving, |s| {
            s.clip("Reviving", 1.0)
                .on_animation_complete(Idle)
                .invulnerable()
        })
        .from_any(EventType::Death, Dying, &[Dying, Dead])
        .build()
}

pub fn archer_machine() -> Arc<MachineDef<ArcherState>> {
    use ArcherState::*;

    MachineDef::builder(Idle)
        .state(Idle, |s| {
            s.clip("Idle", 2.0)
                .on(EventType::DrawArrow, DrawArrow)
                .on_animation_complete(DrawArrow)
                .arrow_aim(false, false)
        })
        .state(EquipBow, |s| {
            s.clip("Equip Bow", 0.5)
                .on_animation_complete(DrawArrow)
                .arrow_aim(true, false)
        })
        .state(DrawArrow, |s| {
            s.clip("Draw Arrow", 1.0)
                .on_animation_complete(Aim)
                .arrow_aim(true, true)
        })
        .state(Aim, |s| s.after(0.1, Fire).arrow_aim(true, true))
        .state(Fire, |s| {
            s.clip("Fire Arrow", 0.5)
                .on_animation_complete(Idle)
                .arrow_aim(false, false)
        })
        .build()
}

pub fn breakable_machine() -> Arc<MachineDef<BreakableState>> {
    use BreakableState::*;

    MachineDef::builder(Intact)
        .state(Intact, |s| s.on(EventType::Death, Broken))
        .state(Broken, |s| s.invulnerable().passthrough())
        .build()
}

/// Shared, immutable transition tables handed to every spawned entity.
#[derive(Debug, Clone)]
pub struct MachineRegistry {
    pub player: Arc<MachineDef<PlayerState>>,
    pub zombie: Arc<MachineDef<ZombieState>>,
    pub dummy: Arc<MachineDef<DummyState>>,
    pub archer: Arc<MachineDef<ArcherState>>,
    pub breakable: Arc<MachineDef<BreakableState>>,
}

impl Default for MachineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self {
            player: player_machine(),
            zombie: zombie_machine(),
            dummy: dummy_machine(),
            archer: archer_machine(),
            breakable: breakable_machine(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasm::{Event, StateMachine, Trigger};

    fn run<S: StateId>(machine: &mut StateMachine<S>, seconds: f32) {
        let mut elapsed = 0.0;
        while elapsed < seconds {
            machine.update(0.02);
            elapsed += 0.02;
        }
    }

    #[test]
    fn test_player_movement_flow() {
        let mut player = StateMachine::new(player_machine());
        player.raise(Event::StartMoveInput);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Walking);

        player.raise(Event::StartSprint);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Sprinting);
        assert_eq!(player.attributes().speed, SpeedClass::Sprinting);

        player.raise(Event::StopMoveInput);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Idle);
    }

    #[test]
    fn test_player_falling_becomes_long_falling() {
        let mut player = StateMachine::new(player_machine());
        player.raise(Event::LeaveGround);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Falling);

        run(&mut player, 2.1);
        assert_eq!(player.current(), PlayerState::LongFalling);
        assert_eq!(player.display_name(), "Long Falling");

        player.raise(Event::Grounded);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Landing);
        assert!(!player.attributes().actions.permits(PlayerAction::Jump));
    }

    #[test]
    fn test_player_punch_returns_to_idle() {
        let mut player = StateMachine::new(player_machine());
        player.raise(Event::Punch);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Punching);
        assert!(!player.attributes().actions.permits(PlayerAction::Punch));

        run(&mut player, 0.7);
        assert_eq!(player.current(), PlayerState::Idle);
    }

    #[test]
    fn test_player_dodge_is_passthrough() {
        let mut player = StateMachine::new(player_machine());
        player.raise(Event::StartMoveInput);
        player.raise(Event::DodgeStart);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Dodge);
        assert!(player.attributes().passthrough);
        assert!(player.attributes().lock_movement_animation);

        player.raise(Event::DodgeStop);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Idle);
    }

    #[test]
    fn test_player_guard_only_allows_block() {
        let mut player = StateMachine::new(player_machine());
        player.raise(Event::BlockStart);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Guard);
        assert!(player.attributes().block_enabled);
        assert!(player.attributes().actions.permits(PlayerAction::Block));
        assert!(!player.attributes().actions.permits(PlayerAction::Punch));
    }

    #[test]
    fn test_player_death_and_revive() {
        let mut player = StateMachine::new(player_machine());
        player.raise(Event::StartMoveInput);
        player.update(0.02);

        player.raise(Event::Death);
        let transitions = player.update(0.02);
        assert_eq!(player.current(), PlayerState::Dying);
        assert_eq!(transitions[0].trigger, Trigger::AnyState(Event::Death));

        player.raise(Event::Death);
        player.raise(Event::Punch);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Dying);

        run(&mut player, 1.6);
        assert_eq!(player.current(), PlayerState::Dead);

        player.raise(Event::Revive);
        player.update(0.02);
        assert_eq!(player.current(), PlayerState::Reviving);
        assert!(player.attributes().invulnerable);

        run(&mut player, 1.1);
        assert_eq!(player.current(), PlayerState::Idle);
    }

    #[test]
    fn test_zombie_hit_stun_not_while_dying() {
        let mut zombie = StateMachine::new(zombie_machine());
        zombie.raise(Event::Hit);
        zombie.update(0.02);
        assert_eq!(zombie.current(), ZombieState::HitStun);

        run(&mut zombie, 0.6);
        assert_eq!(zombie.current(), ZombieState::Idle);

        zombie.raise(Event::Death);
        zombie.raise(Event::Hit);
        zombie.update(0.02);
        assert_eq!(zombie.current(), ZombieState::Dying);

        run(&mut zombie, 2.1);
        assert_eq!(zombie.current(), ZombieState::Dead);
    }

    #[test]
    fn test_zombie_chase_and_attack() {
        let mut zombie = StateMachine::new(zombie_machine());
        zombie.raise(Event::TargetIdentified {
            target: crate::entity::EntityId(4),
        });
        zombie.update(0.02);
        assert_eq!(zombie.current(), ZombieState::Chase);

        zombie.raise(Event::Attack);
        zombie.update(0.02);
        assert_eq!(zombie.current(), ZombieState::Attack);

        run(&mut zombie, 1.1);
        assert_eq!(zombie.current(), ZombieState::Idle);
    }

    #[test]
    fn test_dummy_hit_reset_replays_reaction() {
        let mut dummy = StateMachine::new(dummy_machine());
        dummy.raise(Event::Hit);
        dummy.update(0.02);
        assert_eq!(dummy.current(), DummyState::HitReaction);

        dummy.raise(Event::Hit);
        dummy.update(0.02);
        assert_eq!(dummy.current(), DummyState::HitReset);

        run(&mut dummy, 0.06);
        assert_eq!(dummy.current(), DummyState::HitReaction);
    }

    #[test]
    fn test_archer_cycle() {
        let mut archer = StateMachine::new(archer_machine());
        assert!(!archer.attributes().arrow_aim.show_arrow);

        archer.raise(Event::DrawArrow);
        archer.update(0.02);
        assert_eq!(archer.current(), ArcherState::DrawArrow);
        assert!(archer.attributes().arrow_aim.drawing_arrow);

        run(&mut archer, 1.02);
        assert_eq!(archer.current(), ArcherState::Aim);

        let mut fired = false;
        for _ in 0..10 {
            if archer
                .update(0.02)
                .iter()
                .any(|transition| transition.to == ArcherState::Fire)
            {
                fired = true;
                break;
            }
        }
        assert!(fired);
    }

    #[test]
    fn test_breakable_breaks_once() {
        let mut prop = StateMachine::new(breakable_machine());
        prop.raise(Event::Death);
        assert_eq!(prop.update(0.02).len(), 1);
        assert_eq!(prop.current(), BreakableState::Broken);
        prop.raise(Event::Death);
        assert!(prop.update(0.02).is_empty());
    }

    #[test]
    fn test_state_wire_indices() {
        assert_eq!(PlayerState::Idle.to_wire(), 0);
        assert_eq!(
            PlayerState::from_wire(PlayerState::Reviving.to_wire()),
            Some(PlayerState::Reviving)
        );
        assert_eq!(ZombieState::ALL.len(), 7);
    }
}
