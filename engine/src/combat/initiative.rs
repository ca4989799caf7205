use serde::{Deserialize, Serialize};

use crate::Dice;
use crate::combatant::CombatantKind;

/// Stable handle to an actor for the life of one session.
///
/// Allies are addressed by their index in the party, enemies by the key the
/// session assigned at engage time, so removals never shift a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRef {
    Player,
    Ally(usize),
    Enemy(u32),
}

impl TurnRef {
    pub fn kind(self) -> CombatantKind {
        match self {
            TurnRef::Player => CombatantKind::Player,
            TurnRef::Ally(_) => CombatantKind::Ally,
            TurnRef::Enemy(_) => CombatantKind::Enemy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrderEntry {
    pub kind: CombatantKind,
    pub actor: TurnRef,
    pub initiative: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    entries: Vec<TurnOrderEntry>,
    cursor: usize,
}

impl TurnOrder {
    /// `candidates` pairs each actor with `dexterity + insight`, in construction order.
    /// A 0..=2 jitter is added per actor; ties keep construction order.
    pub fn build(candidates: impl IntoIterator<Item = (TurnRef, i32)>, dice: &mut Dice) -> Self {
        let mut entries: Vec<TurnOrderEntry> = candidates
            .into_iter()
            .map(|(actor, base)| TurnOrderEntry {
                kind: actor.kind(),
                actor,
                initiative: base + dice.range(0, 2),
            })
            .collect();
        entries.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        Self { entries, cursor: 0 }
    }

    pub fn entries(&self) -> &[TurnOrderEntry] {
        &self.entries
    }

    pub fn current(&self) -> Option<TurnRef> {
        self.entries.get(self.cursor).map(|e| e.actor)
    }

    pub fn contains(&self, actor: TurnRef) -> bool {
        self.entries.iter().any(|e| e.actor == actor)
    }

    /// Drops entries whose actor is gone. The cursor follows the current actor when it
    /// survives; otherwise it lands on whoever followed it. Returns whether it survived.
    pub fn prune(&mut self, is_alive: impl Fn(TurnRef) -> bool) -> bool {
        let current = self.current();
        let removed_before = self
            .entries
            .iter()
            .take(self.cursor)
            .filter(|e| !is_alive(e.actor))
            .count();
        let old_cursor = self.cursor;
        self.entries.retain(|e| is_alive(e.actor));
        if self.entries.is_empty() {
            self.cursor = 0;
            return false;
        }
        match current.and_then(|c| self.entries.iter().position(|e| e.actor == c)) {
            Some(pos) => {
                self.cursor = pos;
                true
            }
            None => {
                self.cursor = (old_cursor - removed_before) % self.entries.len();
                false
            }
        }
    }

    /// Prunes, then moves to the next living entry (wrapping). Returns the new current actor.
    pub fn advance(&mut self, is_alive: impl Fn(TurnRef) -> bool) -> Option<TurnRef> {
        let survived = self.prune(is_alive);
        if self.entries.is_empty() {
            return None;
        }
        if survived {
            self.cursor = (self.cursor + 1) % self.entries.len();
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> TurnOrder {
        let mut dice = Dice::from_scripted(vec![0.0]);
        TurnOrder::build(
            [(TurnRef::Player, 10), (TurnRef::Enemy(0), 12), (TurnRef::Enemy(1), 10), (TurnRef::Ally(0), 4)],
            &mut dice,
        )
    }

    #[test]
    fn ties_keep_construction_order() {
        let o = order();
        let actors: Vec<TurnRef> = o.entries().iter().map(|e| e.actor).collect();
        assert_eq!(actors, [TurnRef::Enemy(0), TurnRef::Player, TurnRef::Enemy(1), TurnRef::Ally(0)]);
    }

    #[test]
    fn advance_skips_removed_actor_after_current() {
        let mut o = order();
        // cursor on Enemy(0); Player is next, but Enemy(1) dies meanwhile
        let next = o.advance(|r| r != TurnRef::Enemy(1));
        assert_eq!(next, Some(TurnRef::Player));
        let next = o.advance(|r| r != TurnRef::Enemy(1));
        assert_eq!(next, Some(TurnRef::Ally(0)));
    }

    #[test]
    fn removed_current_hands_turn_to_its_successor() {
        let mut o = order();
        o.advance(|_| true);
        o.advance(|_| true);
        assert_eq!(o.current(), Some(TurnRef::Enemy(1)));
        let next = o.advance(|r| r != TurnRef::Enemy(1));
        assert_eq!(next, Some(TurnRef::Ally(0)));
    }

    #[test]
    fn removing_last_entry_wraps() {
        let mut o = order();
        for _ in 0..3 {
            o.advance(|_| true);
        }
        assert_eq!(o.current(), Some(TurnRef::Ally(0)));
        let next = o.advance(|r| r != TurnRef::Ally(0));
        assert_eq!(next, Some(TurnRef::Enemy(0)));
    }
}
