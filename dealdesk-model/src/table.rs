//! Entity tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A table name that does not match any known entity type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown table: {0}")]
pub struct UnknownTable(pub String);

/// Entity type, one table per type both locally and remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Deals,
    Debts,
    Jobs,
    Calls,
    Tasks,
    Events,
    Files,
    DailyMoves,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Deals,
        Table::Debts,
        Table::Jobs,
        Table::Calls,
        Table::Tasks,
        Table::Events,
        Table::Files,
        Table::DailyMoves,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Deals => "deals",
            Table::Debts => "debts",
            Table::Jobs => "jobs",
            Table::Calls => "calls",
            Table::Tasks => "tasks",
            Table::Events => "events",
            Table::Files => "files",
            Table::DailyMoves => "daily_moves",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}
