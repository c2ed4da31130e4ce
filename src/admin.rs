//! Administrative area records and the timezone lookup used by diagnostics
//!
//! The admin and timezone datasets themselves are external; tiles only store
//! per-tile admin entries and nodes only store indices into them.

use serde::{Deserialize, Serialize};

/// Country/state attribution stored once per tile and referenced by index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminInfo {
    pub country_iso: String,
    pub country_text: String,
    pub state_iso: String,
    pub state_text: String,
}

impl AdminInfo {
    pub fn new(
        country_iso: impl Into<String>,
        country_text: impl Into<String>,
        state_iso: impl Into<String>,
        state_text: impl Into<String>,
    ) -> Self {
        Self {
            country_iso: country_iso.into(),
            country_text: country_text.into(),
            state_iso: state_iso.into(),
            state_text: state_text.into(),
        }
    }
}

/// Resolves a stored timezone index to its name
pub trait TimezoneDb {
    fn name(&self, index: u32) -> Option<&str>;
}

/// Timezone database backed by a list of names; index 0 means "unset"
#[derive(Debug, Clone, Default)]
pub struct StaticTimezones {
    names: Vec<String>,
}

impl StaticTimezones {
    /// `names[0]` becomes index 1
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl TimezoneDb for StaticTimezones {
    fn name(&self, index: u32) -> Option<&str> {
        if index == 0 {
            return None;
        }
        self.names.get(index as usize - 1).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_timezones() {
        let db = StaticTimezones::new(["Europe/Brussels", "America/New_York"]);
        assert_eq!(db.name(0), None);
        assert_eq!(db.name(1), Some("Europe/Brussels"));
        assert_eq!(db.name(2), Some("America/New_York"));
        assert_eq!(db.name(3), None);
    }
}
