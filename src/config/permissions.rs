use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{ReportError, Result};

/// What a session may do with a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Action {
    Read,
    Export,
}

impl Action {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" | "view" => Some(Action::Read),
            "export" | "download" => Some(Action::Export),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Export => write!(f, "export"),
        }
    }
}

/// Permissions granted to the current session.
///
/// Built once from config at startup and handed to whatever needs to
/// check access; nothing reads permissions from ambient storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    Unrestricted,
    Granted(BTreeMap<String, BTreeSet<Action>>),
}

impl PermissionSet {
    /// Build from the `[permissions]` config table. Unknown action names
    /// are ignored with a warning.
    pub fn from_config(table: Option<&BTreeMap<String, Vec<String>>>) -> Self {
        let Some(table) = table else {
            return PermissionSet::Unrestricted;
        };

        let mut granted = BTreeMap::new();
        for (module, actions) in table {
            let set: BTreeSet<Action> = actions
                .iter()
                .filter_map(|a| {
                    let parsed = Action::parse(a);
                    if parsed.is_none() {
                        tracing::warn!(module = %module, action = %a, "ignoring unknown permission action");
                    }
                    parsed
                })
                .collect();
            granted.insert(module.to_ascii_lowercase(), set);
        }
        PermissionSet::Granted(granted)
    }

    pub fn allows(&self, module: &str, action: Action) -> bool {
        match self {
            PermissionSet::Unrestricted => true,
            PermissionSet::Granted(map) => map
                .get(&module.to_ascii_lowercase())
                .is_some_and(|set| set.contains(&action)),
        }
    }

    pub fn require(&self, module: &str, action: Action) -> Result<()> {
        if self.allows(module, action) {
            Ok(())
        } else {
            Err(ReportError::PermissionDenied {
                module: module.to_string(),
                action: action.to_string(),
            })
        }
    }

    /// (module, actions) pairs for display. Empty when unrestricted.
    pub fn entries(&self) -> Vec<(String, String)> {
        match self {
            PermissionSet::Unrestricted => Vec::new(),
            PermissionSet::Granted(map) => map
                .iter()
                .map(|(module, actions)| {
                    let list: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
                    (module.clone(), list.join(", "))
                })
                .collect(),
        }
    }
}
