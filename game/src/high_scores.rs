use serde::{Deserialize, Serialize};

pub const HIGH_SCORE_SLOTS: usize = 5;
pub const INITIALS_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub initials: String,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
}

impl HighScoreEntry {
    pub fn new(initials: &str, score: u32, level: u32, lines: u32) -> Self {
        Self {
            initials: normalize_initials(initials),
            score,
            level,
            lines,
        }
    }
}

/// Upper-cased ASCII letters and digits, cut or padded with `_` to four.
pub fn normalize_initials(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(INITIALS_LEN)
        .collect();
    while out.len() < INITIALS_LEN {
        out.push('_');
    }
    out
}

/// Best scores first. A new score must beat an existing one to displace it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreTable {
    entries: Vec<HighScoreEntry>,
}

impl HighScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HighScoreEntry] {
        &self.entries
    }

    pub fn qualifies(&self, score: u32) -> bool {
        self.entries.len() < HIGH_SCORE_SLOTS
            || self.entries.last().is_some_and(|lowest| score > lowest.score)
    }

    /// Inserts `entry` and returns its zero-based rank, or `None` if it
    /// didn't make the table.
    pub fn insert(&mut self, entry: HighScoreEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }
        let rank = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(rank, entry);
        self.entries.truncate(HIGH_SCORE_SLOTS);
        Some(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_are_normalized() {
        assert_eq!(normalize_initials("ab"), "AB__");
        assert_eq!(normalize_initials("j.o-shua"), "JOSH");
    }

    #[test]
    fn ranks_and_eviction() {
        let mut table = HighScoreTable::new();
        for (i, score) in [500, 300, 900, 100, 700].into_iter().enumerate() {
            assert!(table.insert(HighScoreEntry::new("AAAA", score, i as u32, 0)).is_some());
        }
        let scores: Vec<u32> = table.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![900, 700, 500, 300, 100]);

        assert!(!table.qualifies(100));
        assert_eq!(table.insert(HighScoreEntry::new("LATE", 100, 0, 0)), None);

        assert_eq!(table.insert(HighScoreEntry::new("NEW", 600, 0, 0)), Some(2));
        assert_eq!(table.entries().len(), HIGH_SCORE_SLOTS);
        assert_eq!(table.entries()[2].initials, "NEW_");
        assert_eq!(table.entries().last().map(|e| e.score), Some(300));
    }

    #[test]
    fn ties_rank_below_existing_scores() {
        let mut table = HighScoreTable::new();
        table.insert(HighScoreEntry::new("OLD", 400, 0, 0));
        assert_eq!(table.insert(HighScoreEntry::new("TIE", 400, 0, 0)), Some(1));
    }
}
