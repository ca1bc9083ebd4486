//! Fuzzy title matching.
//!
//! Scores are fuzzywuzzy-compatible percentages built on top of
//! `rapidfuzz::fuzz::ratio` (normalized Indel similarity). Three views of
//! the same pair are computed and combined:
//!
//! - token sort: word order does not matter
//! - partial: one title may be a truncation of the other
//! - token set: duplicated or extra words do not matter
//!
//! All functions in this module take titles that already went through
//! [`normalize_for_matching`], i.e. lowercase ASCII words separated by
//! single spaces.

use serde::{Deserialize, Serialize};

use crate::index::{ClaimSet, RecordId, RecordIndex};
use crate::text_utils::normalize_for_matching;
use crate::{CoreError, DEFAULT_THRESHOLD};

/// Which similarity metric produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    TokenSort,
    Partial,
    TokenSet,
}

impl Scorer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scorer::TokenSort => "token_sort",
            Scorer::Partial => "partial",
            Scorer::TokenSet => "token_set",
        }
    }
}

/// How the three per-metric scores are folded into one.
///
/// `Max` favors recall and is the default; `Mean` and `Min` exist to
/// calibrate against false positives on short or generic titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    #[default]
    Max,
    Mean,
    Min,
}

impl std::str::FromStr for ScorePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(ScorePolicy::Max),
            "mean" => Ok(ScorePolicy::Mean),
            "min" => Ok(ScorePolicy::Min),
            other => Err(CoreError::Config(format!("unknown score policy: {other}"))),
        }
    }
}

/// Per-metric scores for one (candidate, record) pair, 0–100 each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub token_sort: u8,
    pub partial: u8,
    pub token_set: u8,
}

impl ScoreBreakdown {
    /// Fold the three scores according to `policy`.
    pub fn combined(&self, policy: ScorePolicy) -> u8 {
        let scores = [self.token_sort, self.partial, self.token_set];
        match policy {
            ScorePolicy::Max => scores.into_iter().max().unwrap_or(0),
            ScorePolicy::Min => scores.into_iter().min().unwrap_or(0),
            ScorePolicy::Mean => {
                let sum: u32 = scores.iter().map(|&s| u32::from(s)).sum();
                (f64::from(sum) / 3.0).round() as u8
            }
        }
    }

    /// The metric with the highest score; earlier metrics win ties.
    pub fn strongest(&self) -> Scorer {
        let mut best = (Scorer::TokenSort, self.token_sort);
        for (scorer, score) in [
            (Scorer::Partial, self.partial),
            (Scorer::TokenSet, self.token_set),
        ] {
            if score > best.1 {
                best = (scorer, score);
            }
        }
        best.0
    }
}

fn to_percent(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Plain Indel similarity as a percentage. Empty input scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_percent(rapidfuzz::fuzz::ratio(a.chars(), b.chars()))
}

/// Similarity after sorting the words of both titles.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let sort = |s: &str| {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    };
    ratio(&sort(a), &sort(b))
}

/// Similarity over word sets: shared words plus each side's leftovers.
///
/// Returns the best of intersection vs. each side, and side vs. side,
/// so a title that is a word-subset of the other scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    use std::collections::BTreeSet;

    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0;
    }

    let join = |words: Vec<&str>| words.join(" ");
    let common = join(set_a.intersection(&set_b).copied().collect());
    let only_a = join(set_a.difference(&set_b).copied().collect());
    let only_b = join(set_b.difference(&set_a).copied().collect());

    let combine = |rest: &str| {
        if common.is_empty() {
            rest.to_string()
        } else if rest.is_empty() {
            common.clone()
        } else {
            format!("{common} {rest}")
        }
    };
    let with_a = combine(&only_a);
    let with_b = combine(&only_b);

    ratio(&common, &with_a)
        .max(ratio(&common, &with_b))
        .max(ratio(&with_a, &with_b))
}

/// Best similarity of the shorter title against any equally long window
/// of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let width = shorter.len();

    // Normalized titles are ASCII, so byte windows are char windows.
    let mut best = 0.0_f64;
    for start in 0..=(longer.len() - width) {
        let window = &longer[start..start + width];
        let similarity = rapidfuzz::fuzz::ratio(shorter.chars(), window.chars());
        if similarity > 0.995 {
            return 100;
        }
        best = best.max(similarity);
    }
    to_percent(best)
}

/// Score two normalized titles with every metric.
pub fn score_normalized(candidate: &str, record_title: &str) -> ScoreBreakdown {
    ScoreBreakdown {
        token_sort: token_sort_ratio(candidate, record_title),
        partial: partial_ratio(candidate, record_title),
        token_set: token_set_ratio(candidate, record_title),
    }
}

/// Score two raw titles, normalizing both first.
pub fn score_titles(candidate: &str, record_title: &str) -> ScoreBreakdown {
    score_normalized(
        &normalize_for_matching(candidate),
        &normalize_for_matching(record_title),
    )
}

/// Matcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum combined score (0–100) for a match to be accepted.
    pub threshold: u8,
    pub policy: ScorePolicy,
    /// A runner-up within this many points of the winner is reported as a tie.
    pub ambiguity_margin: u8,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            policy: ScorePolicy::Max,
            ambiguity_margin: 0,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.threshold > 100 {
            return Err(CoreError::Config(format!(
                "threshold must be within 0-100, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// A scored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub record: RecordId,
    pub score: u8,
    pub breakdown: ScoreBreakdown,
}

impl Candidate {
    pub fn scorer(&self) -> Scorer {
        self.breakdown.strongest()
    }
}

/// Outcome of one lookup against the unclaimed records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDecision {
    Matched {
        winner: Candidate,
        runner_up: Option<Candidate>,
    },
    /// Nothing cleared the threshold. `best` is the closest record, if any.
    NoMatch { best: Option<Candidate> },
}

impl MatchDecision {
    pub fn winner(&self) -> Option<&Candidate> {
        match self {
            MatchDecision::Matched { winner, .. } => Some(winner),
            MatchDecision::NoMatch { .. } => None,
        }
    }
}

/// Picks the best record for a title. Never mutates the index.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn threshold(&self) -> u8 {
        self.config.threshold
    }

    /// Match `candidate_title` against the records not yet in `claims`.
    ///
    /// The highest combined score wins; on equal scores the record that
    /// comes first in the index wins. A winner below the threshold is
    /// reported as [`MatchDecision::NoMatch`].
    pub fn best_match(
        &self,
        candidate_title: &str,
        index: &RecordIndex,
        claims: &ClaimSet,
    ) -> MatchDecision {
        let candidate = normalize_for_matching(candidate_title);
        let (best, runner_up) = self.rank(&candidate, index, |id| !claims.is_claimed(id));

        match best {
            Some(winner) if winner.score >= self.config.threshold => {
                MatchDecision::Matched { winner, runner_up }
            }
            best => MatchDecision::NoMatch { best },
        }
    }

    /// Best-scoring record among those already claimed.
    ///
    /// Used to detect a title that would have matched a record an earlier
    /// PDF already took.
    pub fn best_claimed(
        &self,
        candidate_title: &str,
        index: &RecordIndex,
        claims: &ClaimSet,
    ) -> Option<Candidate> {
        if claims.is_empty() {
            return None;
        }
        let candidate = normalize_for_matching(candidate_title);
        self.rank(&candidate, index, |id| claims.is_claimed(id)).0
    }

    /// Score one pair under this matcher's policy.
    pub fn score(&self, candidate_title: &str, record_title: &str) -> (u8, ScoreBreakdown) {
        let breakdown = score_titles(candidate_title, record_title);
        (breakdown.combined(self.config.policy), breakdown)
    }

    fn rank(
        &self,
        candidate: &str,
        index: &RecordIndex,
        include: impl Fn(RecordId) -> bool,
    ) -> (Option<Candidate>, Option<Candidate>) {
        let mut best: Option<Candidate> = None;
        let mut runner_up: Option<Candidate> = None;

        if candidate.is_empty() {
            return (None, None);
        }

        for id in index.ids().filter(|&id| include(id)) {
            let record_title = index.normalized_title(id);
            if record_title.is_empty() {
                continue;
            }
            let breakdown = score_normalized(candidate, record_title);
            let scored = Candidate {
                record: id,
                score: breakdown.combined(self.config.policy),
                breakdown,
            };

            match best {
                Some(current) if scored.score > current.score => {
                    runner_up = Some(current);
                    best = Some(scored);
                }
                Some(_) => {
                    if runner_up.is_none_or(|r| scored.score > r.score) {
                        runner_up = Some(scored);
                    }
                }
                None => best = Some(scored),
            }
        }

        (best, runner_up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BibliographicRecord;

    fn index_of(titles: &[&str]) -> RecordIndex {
        RecordIndex::new(
            titles
                .iter()
                .map(|t| BibliographicRecord::new(1, 1, Some(2010), *t))
                .collect(),
        )
    }

    // =========================================================================
    // Individual metrics
    // =========================================================================

    #[test]
    fn test_ratio_identical_and_empty() {
        assert_eq!(ratio("energy saving trends", "energy saving trends"), 100);
        assert_eq!(ratio("", "anything"), 0);
        assert_eq!(ratio("anything", ""), 0);
    }

    #[test]
    fn test_token_sort_ignores_order() {
        assert_eq!(
            token_sort_ratio("smart technology applications", "applications smart technology"),
            100
        );
    }

    #[test]
    fn test_token_sort_extra_word() {
        // "applications smart technology" vs "applications of smart technology"
        let score = token_sort_ratio(
            "smart technology applications",
            "applications of smart technology",
        );
        assert_eq!(score, 95);
    }

    #[test]
    fn test_token_set_subset_scores_full() {
        assert_eq!(
            token_set_ratio(
                "smart technology applications",
                "applications of smart technology"
            ),
            100
        );
    }

    #[test]
    fn test_token_set_duplicates_ignored() {
        assert_eq!(
            token_set_ratio("robot robot control", "robot control"),
            100
        );
    }

    #[test]
    fn test_token_set_disjoint() {
        let score = token_set_ratio("energy saving", "optical switch");
        assert!(score < 50, "got {score}");
    }

    #[test]
    fn test_partial_truncated_title() {
        assert_eq!(
            partial_ratio(
                "characterization of an 2x2 scb optical",
                "characterization of an 2x2 scb optical switch integrated with voa"
            ),
            100
        );
    }

    #[test]
    fn test_partial_symmetric_in_argument_order() {
        let a = "optical switch";
        let b = "a compact optical switch design";
        assert_eq!(partial_ratio(a, b), partial_ratio(b, a));
    }

    #[test]
    fn test_partial_empty() {
        assert_eq!(partial_ratio("", "abc"), 0);
    }

    // =========================================================================
    // Breakdown / policy
    // =========================================================================

    #[test]
    fn test_combined_policies() {
        let b = ScoreBreakdown {
            token_sort: 70,
            partial: 90,
            token_set: 80,
        };
        assert_eq!(b.combined(ScorePolicy::Max), 90);
        assert_eq!(b.combined(ScorePolicy::Min), 70);
        assert_eq!(b.combined(ScorePolicy::Mean), 80);
        assert_eq!(b.strongest(), Scorer::Partial);
    }

    #[test]
    fn test_strongest_prefers_earlier_metric_on_tie() {
        let b = ScoreBreakdown {
            token_sort: 100,
            partial: 100,
            token_set: 100,
        };
        assert_eq!(b.strongest(), Scorer::TokenSort);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("MAX".parse::<ScorePolicy>().unwrap(), ScorePolicy::Max);
        assert_eq!("mean".parse::<ScorePolicy>().unwrap(), ScorePolicy::Mean);
        assert!("avg".parse::<ScorePolicy>().is_err());
    }

    #[test]
    fn test_reordered_title_scores_high() {
        let b = score_titles(
            "Smart Technology Applications",
            "Applications of Smart Technology",
        );
        assert!(b.token_sort >= 90, "token sort {}", b.token_sort);
        assert!(b.combined(ScorePolicy::Max) >= 90);
    }

    // =========================================================================
    // Matcher
    // =========================================================================

    #[test]
    fn test_best_match_accepts_reordered_title() {
        let index = index_of(&["Optical Switch Design", "Applications of Smart Technology"]);
        let matcher = Matcher::default();
        let decision = matcher.best_match("Smart Technology Applications", &index, &ClaimSet::new());
        let winner = decision.winner().expect("should match");
        assert_eq!(winner.record, RecordId(1));
        assert!(winner.score >= 90);
    }

    #[test]
    fn test_best_match_below_threshold_is_no_match() {
        let index = index_of(&["Optical Switch Design"]);
        let matcher = Matcher::new(MatcherConfig {
            threshold: 95,
            ..Default::default()
        });
        match matcher.best_match("Robust Control of Mobile Robots", &index, &ClaimSet::new()) {
            MatchDecision::NoMatch { best } => {
                let best = best.expect("one record was scored");
                assert!(best.score < 95);
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_best_match_skips_claimed_records() {
        let index = index_of(&["Energy Saving Trends", "Energy Saving Trends in Buildings"]);
        let mut claims = ClaimSet::new();
        claims.claim(RecordId(0), "first.pdf");
        let decision = Matcher::default().best_match("Energy Saving Trends", &index, &claims);
        assert_eq!(decision.winner().map(|w| w.record), Some(RecordId(1)));
    }

    #[test]
    fn test_tie_resolves_to_first_record() {
        let index = index_of(&["Energy Saving Trends", "Energy Saving Trends"]);
        let decision = Matcher::default().best_match("Energy Saving Trends", &index, &ClaimSet::new());
        match decision {
            MatchDecision::Matched { winner, runner_up } => {
                assert_eq!(winner.record, RecordId(0));
                assert_eq!(runner_up.map(|r| (r.record, r.score)), Some((RecordId(1), 100)));
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_candidate_never_matches() {
        let index = index_of(&["Energy Saving Trends"]);
        let decision = Matcher::default().best_match("  ", &index, &ClaimSet::new());
        assert_eq!(decision, MatchDecision::NoMatch { best: None });
    }

    #[test]
    fn test_never_returns_below_threshold() {
        let index = index_of(&[
            "Energy Saving Trends",
            "Optical Switch Integrated with VOA",
            "Applications of Smart Technology",
            "Robust Control of Mobile Robots",
        ]);
        let candidates = [
            "Energy Trends",
            "Switch",
            "Mobile Robots Control",
            "Completely Unrelated Heading",
            "Smart",
        ];
        for threshold in [0u8, 30, 60, 75, 90, 100] {
            let matcher = Matcher::new(MatcherConfig {
                threshold,
                ..Default::default()
            });
            for c in candidates {
                if let Some(w) = matcher.best_match(c, &index, &ClaimSet::new()).winner() {
                    assert!(w.score >= threshold, "{c} scored {} < {threshold}", w.score);
                }
            }
        }
    }

    #[test]
    fn test_best_claimed_only_looks_at_claims() {
        let index = index_of(&["Energy Saving Trends", "Optical Switch Design"]);
        let matcher = Matcher::default();
        assert!(matcher
            .best_claimed("Energy Saving Trends", &index, &ClaimSet::new())
            .is_none());

        let mut claims = ClaimSet::new();
        claims.claim(RecordId(0), "a.pdf");
        let found = matcher
            .best_claimed("Energy Saving Trends", &index, &claims)
            .unwrap();
        assert_eq!((found.record, found.score), (RecordId(0), 100));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(MatcherConfig::default().validate().is_ok());
        let bad = MatcherConfig {
            threshold: 101,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
