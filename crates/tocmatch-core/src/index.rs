use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::text_utils::normalize_for_matching;
use crate::{BibliographicRecord, MatchResult};

/// Position of a record in its [`RecordIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub usize);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The record set being linked, in table order.
///
/// Normalized titles are computed once up front so that each lookup only
/// has to normalize the candidate.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    records: Vec<BibliographicRecord>,
    normalized: Vec<String>,
}

impl RecordIndex {
    pub fn new(records: Vec<BibliographicRecord>) -> Self {
        let normalized = records
            .iter()
            .map(|r| normalize_for_matching(&r.title))
            .collect();
        Self {
            records,
            normalized,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&BibliographicRecord> {
        self.records.get(id.0)
    }

    pub fn records(&self) -> &[BibliographicRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<BibliographicRecord> {
        self.records
    }

    /// All ids in table order.
    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        (0..self.records.len()).map(RecordId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &BibliographicRecord)> {
        self.records.iter().enumerate().map(|(i, r)| (RecordId(i), r))
    }

    /// Records not present in `claims`, in table order.
    pub fn unclaimed<'a>(
        &'a self,
        claims: &'a ClaimSet,
    ) -> impl Iterator<Item = (RecordId, &'a BibliographicRecord)> + 'a {
        self.iter().filter(move |(id, _)| !claims.is_claimed(*id))
    }

    /// Title as seen by the matcher. Empty for out-of-range ids.
    pub fn normalized_title(&self, id: RecordId) -> &str {
        self.normalized.get(id.0).map(String::as_str).unwrap_or("")
    }

    /// Claims for records that already carry a filename, e.g. when a
    /// previously linked table is linked again.
    pub fn initial_claims(&self) -> ClaimSet {
        let mut claims = ClaimSet::new();
        for (id, record) in self.iter() {
            if let Some(filename) = &record.matched_filename {
                claims.claim(id, filename.clone());
            }
        }
        claims
    }

    /// Groups of two or more records whose normalized titles are identical.
    ///
    /// Groups are ordered by their first member; members keep table order.
    pub fn duplicate_titles(&self) -> Vec<Vec<RecordId>> {
        let mut groups: HashMap<&str, Vec<RecordId>> = HashMap::new();
        for id in self.ids() {
            let title = self.normalized_title(id);
            if !title.is_empty() {
                groups.entry(title).or_default().push(id);
            }
        }
        let mut dups: Vec<Vec<RecordId>> = groups.into_values().filter(|g| g.len() > 1).collect();
        dups.sort_by_key(|g| g[0]);
        dups
    }

    /// The record's year, falling back to the closest earlier row that has one.
    ///
    /// TOC tables only print the year on the first row of each year group.
    pub fn effective_year(&self, id: RecordId) -> Option<u32> {
        let end = id.0.checked_add(1)?.min(self.records.len());
        self.records[..end].iter().rev().find_map(|r| r.year)
    }

    /// Write an accepted match into its record.
    pub fn apply(&mut self, result: &MatchResult) {
        if let Some(record) = self.records.get_mut(result.record.0) {
            record.matched_filename = Some(result.filename.clone());
            record.match_confidence = Some(result.score);
        }
    }
}

/// The claimed side of the record partition: record → claiming filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    claimed: BTreeMap<RecordId, String>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id` for `filename`. Returns `false` if it was already claimed.
    pub fn claim(&mut self, id: RecordId, filename: impl Into<String>) -> bool {
        if self.claimed.contains_key(&id) {
            return false;
        }
        self.claimed.insert(id, filename.into());
        true
    }

    pub fn is_claimed(&self, id: RecordId) -> bool {
        self.claimed.contains_key(&id)
    }

    pub fn claimant(&self, id: RecordId) -> Option<&str> {
        self.claimed.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
