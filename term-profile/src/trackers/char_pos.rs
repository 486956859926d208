//! Character distribution per string position.

use std::collections::{BTreeMap, HashMap};

use crate::config::DEFAULT_CHARACTER_LIST;
use crate::error::{ProfileError, ProfileResult};
use crate::proto::{CharPosMessage, PositionMessage};
use crate::summary::CharPosSummary;

/// Summary key of the bucket for characters outside the list.
pub const OTHER_KEY: &str = "other";

/// Counts which character of a fixed list occupies each of the first
/// `max_positions` positions of tracked strings.
///
/// Matching is case-insensitive. Characters outside the list are counted in
/// a per-position "other" bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct CharPosTracker {
    character_list: String,
    index: HashMap<char, usize>,
    max_positions: usize,
    /// One row per position: a count per listed character, then "other"
    positions: Vec<Vec<u64>>,
}

impl CharPosTracker {
    /// Creates a tracker over `character_list`. Duplicate characters keep
    /// their first slot.
    pub fn new(character_list: &str, max_positions: u32) -> Self {
        let mut index = HashMap::new();
        for (slot, c) in character_list.chars().enumerate() {
            index.entry(c).or_insert(slot);
        }
        Self {
            character_list: character_list.to_string(),
            index,
            max_positions: max_positions as usize,
            positions: Vec::new(),
        }
    }

    pub fn character_list(&self) -> &str {
        &self.character_list
    }

    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    fn row_len(&self) -> usize {
        self.character_list.chars().count() + 1
    }

    fn slot_of(&self, c: char) -> usize {
        let mut lower = c.to_lowercase();
        let folded = match (lower.next(), lower.next()) {
            (Some(single), None) => single,
            _ => c,
        };
        self.index
            .get(&folded)
            .copied()
            .unwrap_or(self.row_len() - 1)
    }

    pub fn track(&mut self, value: &str) {
        let row_len = self.row_len();
        for (position, c) in value.chars().take(self.max_positions).enumerate() {
            if self.positions.len() <= position {
                self.positions.push(vec![0; row_len]);
            }
            let slot = self.slot_of(c);
            self.positions[position][slot] += 1;
        }
    }

    /// Count of `c` (case-insensitive) at `position`.
    pub fn count_at(&self, position: usize, c: char) -> u64 {
        let slot = self.slot_of(c);
        self.positions
            .get(position)
            .map_or(0, |row| row[slot])
    }

    pub fn merge(&mut self, other: &Self) -> ProfileResult<()> {
        if self.character_list != other.character_list {
            return Err(ProfileError::merge(format!(
                "Cannot merge character position trackers with different character lists: {:?} vs {:?}",
                self.character_list, other.character_list
            )));
        }
        if self.max_positions != other.max_positions {
            return Err(ProfileError::merge(format!(
                "Cannot merge character position trackers with different position limits: {} vs {}",
                self.max_positions, other.max_positions
            )));
        }

        let row_len = self.row_len();
        for (position, row) in other.positions.iter().enumerate() {
            if self.positions.len() <= position {
                self.positions.push(vec![0; row_len]);
            }
            for (mine, theirs) in self.positions[position].iter_mut().zip(row) {
                *mine += theirs;
            }
        }
        Ok(())
    }

    pub fn to_summary(&self) -> CharPosSummary {
        let width = self.positions.len();
        let labels: Vec<String> = self
            .character_list
            .chars()
            .map(String::from)
            .chain(std::iter::once(OTHER_KEY.to_string()))
            .collect();

        let mut char_pos_map = BTreeMap::new();
        for (slot, label) in labels.iter().enumerate() {
            let counts: Vec<u64> = self.positions.iter().map(|row| row[slot]).collect();
            if counts.iter().any(|&c| c > 0) {
                char_pos_map.insert(label.clone(), counts);
            }
        }

        let mut categories: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        let slot_categories: Vec<&str> = self
            .character_list
            .chars()
            .map(category_of)
            .chain(std::iter::once("other"))
            .collect();
        for (slot, category) in slot_categories.iter().enumerate() {
            for (position, row) in self.positions.iter().enumerate() {
                if row[slot] > 0 {
                    categories
                        .entry((*category).to_string())
                        .or_insert_with(|| vec![0; width])[position] += row[slot];
                }
            }
        }

        CharPosSummary {
            character_list: self.character_list.clone(),
            char_pos_map,
            categories,
        }
    }

    pub(crate) fn to_message(&self) -> CharPosMessage {
        CharPosMessage {
            character_list: self.character_list.clone(),
            max_positions: self.max_positions as u32,
            positions: self
                .positions
                .iter()
                .map(|row| PositionMessage {
                    counts: row.clone(),
                })
                .collect(),
        }
    }

    pub(crate) fn from_message(message: &CharPosMessage) -> ProfileResult<Self> {
        let mut tracker = Self::new(&message.character_list, message.max_positions);
        if message.positions.len() > tracker.max_positions {
            return Err(ProfileError::deserialization(format!(
                "character positions: {} rows exceed the limit of {}",
                message.positions.len(),
                tracker.max_positions
            )));
        }
        let row_len = tracker.row_len();
        for (position, row) in message.positions.iter().enumerate() {
            if row.counts.len() != row_len {
                return Err(ProfileError::deserialization(format!(
                    "character positions: row {position} has {} counts, expected {row_len}",
                    row.counts.len()
                )));
            }
            tracker.positions.push(row.counts.clone());
        }
        Ok(tracker)
    }
}

impl Default for CharPosTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CHARACTER_LIST, 128)
    }
}

/// Coarse category of a listed character: digit, letter, punctuation,
/// whitespace or other.
fn category_of(c: char) -> &'static str {
    if c.is_ascii_digit() {
        "digit"
    } else if c.is_alphabetic() {
        "letter"
    } else if c.is_ascii_punctuation() {
        "punctuation"
    } else if c.is_whitespace() {
        "whitespace"
    } else {
        "other"
    }
}
