//! Channel mode string parsing and application.
//!
//! A mode string like `+ob-l alice *!*@spam` is split into per-letter
//! [`ModeChange`]s, consuming positional arguments according to the
//! category each letter belongs to in the server's [`Supported`] table.
//! Letters the table does not know are skipped.

use crate::isupport::{ModeCategory, Supported};
use crate::state::Channel;

/// One classified letter of a mode string.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeChange {
    /// `true` for `+`, `false` for `-`.
    pub adding: bool,
    /// The mode letter.
    pub letter: char,
    /// How the letter treats its parameter.
    pub category: ModeCategory,
    /// The consumed parameter, if any.
    pub arg: Option<String>,
}

/// Parse `modes` against `supported`, drawing parameters from `args`.
///
/// Prefix, list and always-param letters consume a parameter in both
/// directions; param-when-set letters consume one only when adding; boolean
/// letters never do. A string without a leading sign is treated as adding.
pub fn parse_mode_changes(supported: &Supported, modes: &str, args: &[String]) -> Vec<ModeChange> {
    let mut params = args.iter();
    let mut adding = true;
    let mut changes = Vec::new();

    for letter in modes.chars() {
        match letter {
            '+' => adding = true,
            '-' => adding = false,
            _ => {
                let Some(category) = supported.category(letter) else {
                    continue;
                };
                let consumes = match category {
                    ModeCategory::Prefix | ModeCategory::List | ModeCategory::Always => true,
                    ModeCategory::WhenSet => adding,
                    ModeCategory::Boolean => false,
                };
                let arg = if consumes { params.next().cloned() } else { None };
                changes.push(ModeChange {
                    adding,
                    letter,
                    category,
                    arg,
                });
            }
        }
    }

    changes
}

impl Channel {
    /// Apply one mode change to this channel record.
    pub fn apply_mode(&mut self, change: &ModeChange) {
        let letter = change.letter;

        match change.category {
            ModeCategory::Prefix => {
                let Some(nick) = change.arg.as_deref() else {
                    return;
                };
                if let Some(status) = self.users.get_mut(nick) {
                    if change.adding {
                        if !status.contains(letter) {
                            status.push(letter);
                        }
                    } else {
                        status.retain(|c| c != letter);
                    }
                }
            }
            ModeCategory::List => {
                let Some(value) = change.arg.as_deref() else {
                    return;
                };
                if change.adding {
                    self.set_mode_letter(letter);
                    self.mode_params
                        .entry(letter)
                        .or_default()
                        .push(value.to_string());
                } else if let Some(list) = self.mode_params.get_mut(&letter) {
                    list.retain(|v| v != value);
                    if list.is_empty() {
                        self.clear_mode_letter(letter);
                    }
                }
            }
            ModeCategory::Always | ModeCategory::WhenSet => {
                if change.adding {
                    self.set_mode_letter(letter);
                    let params = change.arg.iter().cloned().collect();
                    self.mode_params.insert(letter, params);
                } else {
                    self.clear_mode_letter(letter);
                }
            }
            ModeCategory::Boolean => {
                if change.adding {
                    self.set_mode_letter(letter);
                } else {
                    self.clear_mode_letter(letter);
                }
            }
        }
    }

    fn set_mode_letter(&mut self, letter: char) {
        if !self.mode.contains(letter) {
            self.mode.push(letter);
        }
    }

    fn clear_mode_letter(&mut self, letter: char) {
        self.mode.retain(|c| c != letter);
        self.mode_params.remove(&letter);
    }

    /// Replace the non-list modes with a full mode snapshot (`RPL_CHANNELMODEIS`).
    pub fn reset_modes(&mut self, supported: &Supported, modes: &str, args: &[String]) {
        let lists = &supported.chan_modes.list;
        self.mode.retain(|c| lists.contains(c));
        self.mode_params.retain(|letter, _| lists.contains(*letter));

        for change in parse_mode_changes(supported, modes, args) {
            self.apply_mode(&change);
        }
    }
}
