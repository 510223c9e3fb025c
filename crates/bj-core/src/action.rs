//! Table actions and the fixed texts of the table UI

use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::registry::PlayerStatus;

/// Reply to `/blackjack` before anything else happens
pub const COMMAND_ACK: &str = ":white_check_mark:";

/// Prompt posted with the action buttons in a player's thread
pub const MOVE_PROMPT: &str = "Your move...";

/// Message shown after a player has picked an action
pub const WAITING_PROMPT: &str = "Waiting on the table...";

/// Buttons a seated player can press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableAction {
    Hit,
    Stand,
}

impl TableAction {
    /// All actions, in the order they are rendered
    pub const ALL: [TableAction; 2] = [TableAction::Hit, TableAction::Stand];

    /// Component id carried by the button
    pub fn custom_id(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Stand => "stand",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Hit => "Hit",
            Self::Stand => "Stand",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Hit => "💥",
            Self::Stand => "🤌🏻",
        }
    }

    /// Status recorded for a player who pressed this button
    pub fn player_status(self) -> PlayerStatus {
        match self {
            Self::Hit => PlayerStatus::Hit,
            Self::Stand => PlayerStatus::Stand,
        }
    }
}

impl FromStr for TableAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hit" => Ok(Self::Hit),
            "stand" => Ok(Self::Stand),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header message content: a mention for every player at the table
pub fn header_content<I, S>(player_ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    player_ids
        .into_iter()
        .map(|id| format!("<@{}>", id.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
