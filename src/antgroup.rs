//! Antenna lists and the named antenna groups (XPOL, YPOL, PRIMARY).

use crate::state::lock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, OnceLock};

pub const ANTGROUP_TOKEN: &str = "ANTGROUP";
pub const ALL_TOKEN: &str = "ALL";

/// Antenna list the AUTOSELECT stub assigns to every group.
pub const AUTOSELECT_ANTS_TEST_LIST: &str = "1a,1b,1c";

const ANT_PREFIX: &str = "ant";

fn ant_name_regex() -> &'static Regex {
    static ANT_NAME: OnceLock<Regex> = OnceLock::new();
    ANT_NAME.get_or_init(|| Regex::new(r"^(ant)?\d\D$").expect("antenna name regex is valid"))
}

/// Comma-separated items of an antenna list. Trailing empty items are
/// dropped; an empty list has no items.
fn split_ant_list(list: &str) -> Vec<&str> {
    let mut items: Vec<&str> = list.trim().split(',').collect();
    while items.last().is_some_and(|item| item.is_empty()) {
        items.pop();
    }
    items
}

/// True if every item of `list` looks like `[ant]<digit><non-digit>`,
/// ignoring case.
pub fn is_valid_ant_list(list: &str) -> bool {
    let lowered = list.to_lowercase();
    let items = split_ant_list(&lowered);
    !items.is_empty() && items.iter().all(|item| ant_name_regex().is_match(item))
}

/// Lower-cased antenna names, each carrying the `ant` prefix.
pub fn parse_ant_names(list: &str) -> Vec<String> {
    split_ant_list(list)
        .into_iter()
        .map(|item| {
            let name = item.to_lowercase();
            if name.starts_with(ANT_PREFIX) {
                name
            } else {
                format!("{ANT_PREFIX}{name}")
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AntGroup {
    Xpol,
    Ypol,
    Primary,
}

impl AntGroup {
    pub const ALL: [AntGroup; 3] = [AntGroup::Xpol, AntGroup::Ypol, AntGroup::Primary];

    pub fn name(self) -> &'static str {
        match self {
            AntGroup::Xpol => "XPOL",
            AntGroup::Ypol => "YPOL",
            AntGroup::Primary => "PRIMARY",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Target of an ANTGROUP command: one group, or ALL as a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTarget {
    One(AntGroup),
    All,
}

impl GroupTarget {
    pub fn parse(word: &str) -> Option<Self> {
        if word == ALL_TOKEN {
            return Some(GroupTarget::All);
        }
        AntGroup::ALL
            .into_iter()
            .find(|group| group.name() == word)
            .map(GroupTarget::One)
    }

    fn groups(self) -> &'static [AntGroup] {
        match self {
            GroupTarget::One(AntGroup::Xpol) => &[AntGroup::Xpol],
            GroupTarget::One(AntGroup::Ypol) => &[AntGroup::Ypol],
            GroupTarget::One(AntGroup::Primary) => &[AntGroup::Primary],
            GroupTarget::All => &AntGroup::ALL,
        }
    }
}

/// Raw antenna list per group, stored lower-cased. Every group starts
/// empty.
#[derive(Debug, Default)]
pub struct AntGroupRegistry {
    lists: Mutex<[String; 3]>,
}

impl AntGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, target: GroupTarget, ant_list: &str) {
        let lowered = ant_list.to_lowercase();
        let mut lists = lock(&self.lists);
        for group in target.groups() {
            lists[group.index()].clone_from(&lowered);
        }
    }

    pub fn clear(&self, target: GroupTarget) {
        self.set(target, "");
    }

    pub fn raw_list(&self, group: AntGroup) -> String {
        lock(&self.lists)[group.index()].clone()
    }

    /// `<GROUP>: <list>`, one line per group for ALL.
    pub fn formatted(&self, target: GroupTarget) -> String {
        let lists = lock(&self.lists);
        target
            .groups()
            .iter()
            .map(|group| format!("{}: {}", group.name(), lists[group.index()]))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
