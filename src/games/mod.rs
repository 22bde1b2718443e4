//! Built-in [`GameRules`] implementations for the supported game types.
//!
//! These are intentionally small: the orchestration core only needs a
//! per-round judge behind the [`GameRules`] seam, and custom games can be
//! registered on the executor alongside or instead of these.

mod blotto;
mod dilemma;
mod rpsls;

pub use blotto::ColonelBlottoRules;
pub use dilemma::PrisonersDilemmaRules;
pub use rpsls::RpslsRules;

use std::sync::Arc;

use crate::game_interface::GameRules;

/// One instance of every built-in rule set.
pub fn builtin_rules() -> Vec<Arc<dyn GameRules>> {
    vec![
        Arc::new(RpslsRules),
        Arc::new(ColonelBlottoRules),
        Arc::new(PrisonersDilemmaRules),
    ]
}
