use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::game_interface::BotStrategy;

/// A competitor in the series.
///
/// Identity is the team name, which must be unique within a tournament; the
/// roster is immutable for the lifetime of a series and shared by every
/// event. The strategy handle is cheap to clone and thread-safe.
#[derive(Clone)]
pub struct Bot {
    /// Unique team name.
    pub team_name: String,
    strategy: Arc<dyn BotStrategy>,
}

impl Bot {
    /// Creates a bot from a name and its move-producing strategy.
    pub fn new(team_name: impl Into<String>, strategy: Arc<dyn BotStrategy>) -> Self {
        Self {
            team_name: team_name.into(),
            strategy,
        }
    }

    /// Shared handle to the strategy, for executor sessions.
    pub fn strategy(&self) -> Arc<dyn BotStrategy> {
        self.strategy.clone()
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("team_name", &self.team_name)
            .finish()
    }
}

impl PartialEq for Bot {
    fn eq(&self, other: &Self) -> bool {
        self.team_name == other.team_name
    }
}

impl Eq for Bot {}

impl Hash for Bot {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.team_name.hash(state);
    }
}
