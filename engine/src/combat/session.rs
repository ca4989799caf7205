use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::actions::{self, PlayerAction, attack_roll, land_hit};
use super::initiative::{TurnOrder, TurnRef};
use crate::Dice;
use crate::combatant::{Combatant, Party};
use crate::config::EngineConfig;
use crate::error::ActionError;
use crate::progression::award_xp;
use crate::status::{inferred_pool, maybe_apply_status, status_pool};

/// How an encounter ended, as reported to the world layer.
///
/// `SnuckPast` and `Bypassed` are settled before any session is engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Victory,
    Fled,
    TalkedDown,
    Bribed,
    Defeat,
    SnuckPast,
    Bypassed,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Victory => "victory",
            Outcome::Fled => "fled",
            Outcome::TalkedDown => "talked_down",
            Outcome::Bribed => "bribed",
            Outcome::Defeat => "defeat",
            Outcome::SnuckPast => "snuck_past",
            Outcome::Bypassed => "bypassed",
        }
    }

    /// Outcomes that leave the enemies standing but no longer hostile.
    pub fn is_peaceful(self) -> bool {
        matches!(
            self,
            Outcome::Fled | Outcome::TalkedDown | Outcome::Bribed | Outcome::SnuckPast | Outcome::Bypassed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingPlayerInput,
    Resolving(TurnRef),
    Ended(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionReport {
    Resolved(Phase),
    Rejected(ActionError),
}

/// Living state of one encounter.
///
/// Enemy HP is tracked in arrays parallel to `enemies`; the combatants' own HP is
/// only brought up to date by [`CombatSession::into_enemies`].
#[derive(Debug, Clone)]
pub struct CombatSession {
    enemies: Vec<Combatant>,
    enemy_hp: Vec<i32>,
    enemy_max_hp: Vec<i32>,
    enemy_keys: Vec<u32>,
    order: TurnOrder,
    target: Option<usize>,
    can_bribe: bool,
    phase: Phase,
    log: Vec<String>,
}

fn initiative_base(c: &Combatant) -> i32 {
    c.stat("dexterity") + c.stat("insight")
}

impl CombatSession {
    /// Rolls initiative and plays any non-player turns that come before the player's.
    pub fn engage(enemies: Vec<Combatant>, party: &mut Party, dice: &mut Dice, cfg: &EngineConfig) -> Self {
        let enemies: Vec<Combatant> = enemies.into_iter().filter(|e| e.is_alive()).collect();
        let enemy_keys: Vec<u32> = (0..enemies.len() as u32).collect();

        let mut candidates = vec![(TurnRef::Player, initiative_base(&party.player))];
        candidates.extend(party.living_allies().map(|(i, a)| (TurnRef::Ally(i), initiative_base(a))));
        candidates.extend(
            enemies
                .iter()
                .zip(&enemy_keys)
                .map(|(e, k)| (TurnRef::Enemy(*k), initiative_base(e))),
        );
        let order = TurnOrder::build(candidates, dice);

        let mut session = Self {
            enemy_hp: enemies.iter().map(Combatant::hp).collect(),
            enemy_max_hp: enemies.iter().map(Combatant::max_hp).collect(),
            target: if enemies.is_empty() { None } else { Some(0) },
            enemies,
            enemy_keys,
            order,
            can_bribe: false,
            phase: Phase::AwaitingPlayerInput,
            log: Vec::new(),
        };

        let listing: Vec<String> = session
            .order
            .entries()
            .iter()
            .map(|e| format!("{} ({})", session.name_of(e.actor, party), e.initiative))
            .collect();
        session.log.push(format!("[TURN] order: {}", listing.join(", ")));
        debug!(enemies = session.enemies.len(), allies = party.allies.len(), "combat engaged");

        if !party.player.is_alive() {
            session.finish(Outcome::Defeat);
        } else if session.enemies.is_empty() {
            session.finish(Outcome::Victory);
        } else {
            session.run_autoplay(party, dice, cfg);
        }
        session
    }

    pub fn enemies(&self) -> &[Combatant] {
        &self.enemies
    }

    pub fn enemy_hp(&self) -> &[i32] {
        &self.enemy_hp
    }

    pub fn enemy_max_hp(&self) -> &[i32] {
        &self.enemy_max_hp
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    pub fn target_enemy(&self) -> Option<&Combatant> {
        self.target.and_then(|i| self.enemies.get(i))
    }

    pub fn can_bribe(&self) -> bool {
        self.can_bribe
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Ended(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn turn_order(&self) -> &TurnOrder {
        &self.order
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn take_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }

    /// Every actor still able to take a turn.
    pub fn living_refs(&self, party: &Party) -> Vec<TurnRef> {
        let mut refs = Vec::new();
        if party.player.is_alive() {
            refs.push(TurnRef::Player);
        }
        refs.extend(party.living_allies().map(|(i, _)| TurnRef::Ally(i)));
        refs.extend(self.enemy_keys.iter().map(|k| TurnRef::Enemy(*k)));
        refs
    }

    /// Retargets without spending a turn.
    pub fn select_target(&mut self, index: usize) -> Result<(), ActionError> {
        if self.is_over() {
            return Err(ActionError::SessionEnded);
        }
        if index >= self.enemies.len() {
            return Err(ActionError::NoTarget);
        }
        self.target = Some(index);
        Ok(())
    }

    /// Resolves the player's action, then auto-plays until the player is up again or
    /// the encounter ends. Refused requests change nothing but the log.
    pub fn act(&mut self, action: PlayerAction, party: &mut Party, dice: &mut Dice, cfg: &EngineConfig) -> ActionReport {
        if let Err(err) = self.validate(action, party) {
            self.log.push(format!("[REJECT][{}] {:?}: {}", party.player.name, action, err));
            debug!(?action, %err, "action rejected");
            return ActionReport::Rejected(err);
        }

        self.phase = Phase::Resolving(TurnRef::Player);
        match action {
            PlayerAction::Attack => self.player_attack(party, dice, cfg),
            PlayerAction::Cast => self.player_cast(party, dice, cfg),
            PlayerAction::Flee => self.player_flee(party, dice),
            PlayerAction::Talk => self.player_talk(party, dice),
            PlayerAction::Bribe => self.player_bribe(party, dice),
        }

        if !self.is_over() {
            self.end_turn(party);
            self.run_autoplay(party, dice, cfg);
        }
        ActionReport::Resolved(self.phase)
    }

    /// Surviving enemies with their tracked HP written back.
    pub fn into_enemies(self) -> Vec<Combatant> {
        self.enemies
            .into_iter()
            .zip(self.enemy_hp)
            .zip(self.enemy_max_hp)
            .map(|((mut enemy, hp), max_hp)| {
                enemy.set_max_hp(max_hp);
                enemy.set_hp(hp);
                enemy
            })
            .collect()
    }

    fn validate(&self, action: PlayerAction, party: &Party) -> Result<(), ActionError> {
        match self.phase {
            Phase::Ended(_) => return Err(ActionError::SessionEnded),
            Phase::Resolving(_) => return Err(ActionError::NotPlayersTurn),
            Phase::AwaitingPlayerInput => {}
        }
        if self.target_enemy().is_none() {
            return Err(ActionError::NoTarget);
        }
        match action {
            PlayerAction::Cast if party.player.focus().is_none() => Err(ActionError::NoFocus),
            PlayerAction::Bribe if !self.can_bribe => Err(ActionError::NoBribeOpportunity),
            _ => Ok(()),
        }
    }

    fn player_attack(&mut self, party: &mut Party, dice: &mut Dice, cfg: &EngineConfig) {
        let Some(i) = self.target else { return };
        let player = &party.player;
        let chance = player
            .weapon
            .as_ref()
            .and_then(|w| w.status_chance())
            .unwrap_or(cfg.status_chance);
        let pool = status_pool(player);
        let raw = attack_roll(player, dice);
        let hit = land_hit(
            &player.name,
            raw,
            player.attack_element(),
            &self.enemies[i],
            &mut self.enemy_hp[i],
            self.enemy_max_hp[i],
            |l| self.log.push(l),
        );
        if hit.killed {
            self.defeat_enemy(i, party, cfg);
        } else {
            maybe_apply_status(dice, chance, &pool, &mut self.enemies[i], |l| self.log.push(l));
        }
    }

    fn player_cast(&mut self, party: &mut Party, dice: &mut Dice, cfg: &EngineConfig) {
        let Some(i) = self.target else { return };
        let player = &party.player;
        let Some(focus) = player.focus() else { return };
        let spell = match party.known_spells.len() {
            0 => "a spell".to_string(),
            n => party.known_spells[dice.index(n)].clone(),
        };
        let chance = focus.status_chance().unwrap_or(cfg.status_chance);
        let mut pool = focus.status_pool();
        if pool.is_empty() {
            pool = inferred_pool(&focus.item_type);
        }
        let element = focus.dominant_element();
        self.log.push(format!("[CAST][{}] casts {} through {}", player.name, spell, focus.name));

        let raw = actions::spell_roll(cfg, dice);
        let hit = land_hit(
            &player.name,
            raw,
            element,
            &self.enemies[i],
            &mut self.enemy_hp[i],
            self.enemy_max_hp[i],
            |l| self.log.push(l),
        );
        if hit.killed {
            self.defeat_enemy(i, party, cfg);
        } else {
            maybe_apply_status(dice, chance, &pool, &mut self.enemies[i], |l| self.log.push(l));
        }
    }

    fn player_flee(&mut self, party: &Party, dice: &mut Dice) {
        let Some(i) = self.target else { return };
        if actions::attempt_flee(&party.player, &self.enemies[i], dice, |l| self.log.push(l)) {
            self.finish(Outcome::Fled);
        }
    }

    fn player_talk(&mut self, party: &Party, dice: &mut Dice) {
        let Some(i) = self.target else { return };
        let romance = party.romance_progress;
        if actions::attempt_talk(&party.player, &self.enemies[i], romance, dice, |l| self.log.push(l)) {
            self.finish(Outcome::TalkedDown);
        } else {
            self.can_bribe = true;
        }
    }

    fn player_bribe(&mut self, party: &mut Party, dice: &mut Dice) {
        let Some(i) = self.target else { return };
        let accepted = actions::attempt_bribe(party, &self.enemies[i], dice, |l| self.log.push(l));
        self.can_bribe = false;
        if accepted {
            self.finish(Outcome::Bribed);
        }
    }

    fn run_autoplay(&mut self, party: &mut Party, dice: &mut Dice, cfg: &EngineConfig) {
        for _ in 0..cfg.autoplay_cap {
            if self.is_over() {
                return;
            }
            let Some(actor) = self.order.current() else {
                return;
            };
            self.phase = Phase::Resolving(actor);
            match actor {
                TurnRef::Player => {
                    self.phase = Phase::AwaitingPlayerInput;
                    return;
                }
                TurnRef::Ally(idx) => self.ally_turn(idx, party, dice, cfg),
                TurnRef::Enemy(key) => self.enemy_turn(key, party, dice, cfg),
            }
            if self.is_over() {
                return;
            }
            self.end_turn(party);
        }

        if self.order.current() == Some(TurnRef::Player) {
            self.phase = Phase::AwaitingPlayerInput;
            return;
        }
        if let Phase::Resolving(actor) = self.phase {
            warn!(cap = cfg.autoplay_cap, ?actor, "auto-play cap reached; session left mid-resolution");
            self.log.push(format!("[TURN] auto-play stopped after {} turns", cfg.autoplay_cap));
        }
    }

    fn end_turn(&mut self, party: &Party) {
        let alive = self.living_refs(party);
        self.order.advance(|r| alive.contains(&r));
    }

    fn ally_turn(&mut self, idx: usize, party: &mut Party, dice: &mut Dice, cfg: &EngineConfig) {
        let Some(i) = self.target else { return };
        let Some(ally) = party.allies.get(idx).filter(|a| a.is_alive()) else {
            return;
        };
        let raw = attack_roll(ally, dice);
        let hit = land_hit(
            &ally.name,
            raw,
            ally.attack_element(),
            &self.enemies[i],
            &mut self.enemy_hp[i],
            self.enemy_max_hp[i],
            |l| self.log.push(l),
        );
        if hit.killed {
            self.defeat_enemy(i, party, cfg);
        }
    }

    /// Picks the player or a living ally at random and hits them.
    fn enemy_turn(&mut self, key: u32, party: &mut Party, dice: &mut Dice, cfg: &EngineConfig) {
        let Some(i) = self.enemy_keys.iter().position(|k| *k == key) else {
            return;
        };
        let mut targets: Vec<Option<usize>> = vec![None];
        targets.extend(party.living_allies().map(|(idx, _)| Some(idx)));
        let pick = targets[dice.index(targets.len())];

        let enemy = &self.enemies[i];
        let [lo, hi] = cfg.enemy_damage;
        let raw = dice.range(lo, hi);
        let defender = match pick {
            None => &mut party.player,
            Some(idx) => &mut party.allies[idx],
        };
        let mut hp = defender.hp();
        let max_hp = defender.max_hp();
        let hit = land_hit(
            &enemy.name,
            raw,
            enemy.attack_element(),
            defender,
            &mut hp,
            max_hp,
            |l| self.log.push(l),
        );
        defender.set_hp(hp);
        if hit.killed {
            let name = defender.name.clone();
            self.log.push(format!("[DOWN][{}] falls", name));
            if pick.is_none() {
                self.finish(Outcome::Defeat);
            }
        }
    }

    fn defeat_enemy(&mut self, i: usize, party: &mut Party, cfg: &EngineConfig) {
        let enemy = self.enemies.remove(i);
        self.enemy_hp.remove(i);
        self.enemy_max_hp.remove(i);
        self.enemy_keys.remove(i);
        self.log.push(format!("[DOWN][{}] is defeated", enemy.name));
        award_xp(party, enemy.xp_reward, cfg, |l| self.log.push(l));

        if self.enemies.is_empty() {
            self.target = None;
            self.finish(Outcome::Victory);
            return;
        }
        self.target = match self.target {
            Some(t) if t > i => Some(t - 1),
            Some(t) if t == i => Some(if i < self.enemies.len() { i } else { 0 }),
            other => other,
        };
        if let Some(next) = self.target_enemy() {
            let line = format!("[TARGET] now facing {}", next.name);
            self.log.push(line);
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.phase = Phase::Ended(outcome);
        if outcome.is_peaceful() {
            for enemy in &mut self.enemies {
                enemy.hostile = false;
            }
        }
        self.log.push(format!("[END] {}", outcome.label()));
        debug!(outcome = outcome.label(), "combat ended");
    }

    fn name_of(&self, actor: TurnRef, party: &Party) -> String {
        match actor {
            TurnRef::Player => party.player.name.clone(),
            TurnRef::Ally(i) => party.allies.get(i).map(|a| a.name.clone()).unwrap_or_default(),
            TurnRef::Enemy(k) => self
                .enemy_keys
                .iter()
                .position(|key| *key == k)
                .map(|i| self.enemies[i].name.clone())
                .unwrap_or_default(),
        }
    }
}
