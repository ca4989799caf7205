use crate::{ChanceResult, Dice};

/// Flee: 35% base, +8% per point of dexterity over the enemy, clamped to 10..=95.
pub fn flee_percent(player_dex: i32, enemy_dex: i32) -> u32 {
    let gap = i64::from(player_dex) - i64::from(enemy_dex);
    clamp_percent(35 + 8 * gap, 10, 95)
}

/// Talk-down: 50% base, -5% per point of enemy will over 4, +5% per romance step, clamped to 10..=80.
pub fn talk_percent(enemy_will: i32, romance_progress: u32) -> u32 {
    let romance = i64::from(romance_progress.min(100));
    clamp_percent(50 - 5 * (i64::from(enemy_will) - 4) + 5 * romance, 10, 80)
}

/// Bribe: 60% base, +5% per point of enemy greed over 4, clamped to 20..=90.
pub fn bribe_percent(enemy_greed: i32) -> u32 {
    clamp_percent(60 + 5 * (i64::from(enemy_greed) - 4), 20, 90)
}

fn clamp_percent(raw: i64, lo: i64, hi: i64) -> u32 {
    raw.clamp(lo, hi) as u32
}

/// Roll a percentage check and log the draw against the threshold.
pub fn roll_check(
    dice: &mut Dice,
    percent: u32,
    label: &str,
    mut log: impl FnMut(String),
) -> ChanceResult {
    let res = dice.chance(percent);
    log(format!(
        "[CHECK] {} draw={:.3} vs {}% → {}",
        label,
        res.draw,
        res.percent,
        if res.passed { "SUCCESS" } else { "FAIL" }
    ));
    res
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SneakResult {
    pub roll: i32,
    pub dc: i32,
    pub passed: bool,
}

/// Sneak past an unaware enemy: `4 + d10` against DC `8 + 0..=4`, ties pass.
pub fn sneak_check(dice: &mut Dice, label: &str, mut log: impl FnMut(String)) -> SneakResult {
    let dc = 8 + dice.range(0, 4);
    let roll = 4 + dice.range(1, 10);
    let passed = roll >= dc;
    log(format!(
        "[CHECK] {} roll={} vs DC {} → {}",
        label,
        roll,
        dc,
        if passed { "SUCCESS" } else { "FAIL" }
    ));
    SneakResult { roll, dc, passed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flee_scales_with_dex_gap() {
        assert_eq!(flee_percent(10, 4), 83);
        assert_eq!(flee_percent(4, 4), 35);
        assert_eq!(flee_percent(0, 20), 10);
        assert_eq!(flee_percent(30, 0), 95);
    }

    #[test]
    fn talk_and_bribe_are_clamped() {
        assert_eq!(talk_percent(4, 0), 50);
        assert_eq!(talk_percent(20, 0), 10);
        assert_eq!(talk_percent(4, 10), 80);
        assert_eq!(bribe_percent(4), 60);
        assert_eq!(bribe_percent(-10), 20);
        assert_eq!(bribe_percent(30), 90);
    }

    #[test]
    fn extreme_attributes_saturate() {
        assert_eq!(flee_percent(i32::MAX, i32::MIN), 95);
        assert_eq!(flee_percent(i32::MIN, i32::MAX), 10);
        assert_eq!(talk_percent(i32::MIN, u32::MAX), 80);
        assert_eq!(talk_percent(i32::MAX, 0), 10);
        assert_eq!(bribe_percent(i32::MAX), 90);
        assert_eq!(bribe_percent(i32::MIN), 20);
    }

    #[test]
    fn sneak_ties_pass() {
        // DC 8 + 2 = 10; roll 4 + 6 = 10
        let mut dice = Dice::from_scripted(vec![0.5, 0.5]);
        let mut line = String::new();
        let res = sneak_check(&mut dice, "Hero sneaks past Bandit Toll", |l| line = l);
        assert_eq!(res, SneakResult { roll: 10, dc: 10, passed: true });
        assert_eq!(line, "[CHECK] Hero sneaks past Bandit Toll roll=10 vs DC 10 → SUCCESS");
    }

    #[test]
    fn clumsy_sneak_is_spotted() {
        let mut dice = Dice::from_scripted(vec![0.99, 0.0]);
        let res = sneak_check(&mut dice, "Hero sneaks", |_| {});
        assert_eq!(res, SneakResult { roll: 5, dc: 12, passed: false });
    }
}
