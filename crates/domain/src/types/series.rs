//! Ordered, date-keyed collection of snapshots

use chrono::NaiveDate;

use super::snapshot::Snapshot;

/// What an upsert did to the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEffect {
    Inserted,
    Replaced,
    Unchanged,
}

/// Snapshots sorted ascending by date, at most one per date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoricalSeries {
    entries: Vec<Snapshot>,
}

impl HistoricalSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from entries in any order.
    ///
    /// Duplicate dates collapse to the entry that appears last.
    pub fn from_entries(entries: impl IntoIterator<Item = Snapshot>) -> Self {
        let mut series = Self::new();
        for entry in entries {
            series.upsert(entry);
        }
        series
    }

    /// Insert or replace the entry for `snapshot.date()`.
    pub fn merge(mut self, snapshot: Snapshot) -> Self {
        self.upsert(snapshot);
        self
    }

    /// In-place variant of [`HistoricalSeries::merge`].
    pub fn upsert(&mut self, snapshot: Snapshot) -> MergeEffect {
        match self.entries.binary_search_by_key(&snapshot.date(), Snapshot::date) {
            Ok(index) if self.entries[index] == snapshot => MergeEffect::Unchanged,
            Ok(index) => {
                self.entries[index] = snapshot;
                MergeEffect::Replaced
            }
            Err(index) => {
                self.entries.insert(index, snapshot);
                MergeEffect::Inserted
            }
        }
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Snapshot> {
        self.entries
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.entries
            .binary_search_by_key(&date, Snapshot::date)
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Most recent snapshot by date.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a HistoricalSeries {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
