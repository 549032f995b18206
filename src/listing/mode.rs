use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a list view presents its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    /// The list grows by appending pages as the viewport nears the bottom.
    #[default]
    #[serde(rename = "infinite")]
    Infinite,
    /// Exactly one page's worth of items, navigated explicitly.
    #[serde(rename = "pagination", alias = "paginated")]
    Paginated,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Infinite => "infinite",
            ViewMode::Paginated => "pagination",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "infinite" => Ok(ViewMode::Infinite),
            "pagination" | "paginated" => Ok(ViewMode::Paginated),
            other => Err(format!("unknown view mode: {}", other)),
        }
    }
}
