pub mod actions;
pub mod initiative;
pub mod session;

pub use actions::PlayerAction;
pub use initiative::{TurnOrder, TurnOrderEntry, TurnRef};
pub use session::{ActionReport, CombatSession, Outcome, Phase};
