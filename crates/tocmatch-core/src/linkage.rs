//! PDF → record linkage.
//!
//! Documents are processed strictly in the order they are yielded. A record
//! is claimed by the first PDF whose title clears the threshold against it;
//! later PDFs only ever see the remaining unclaimed records.

use serde::Serialize;

use crate::backend::TitleSource;
use crate::index::{ClaimSet, RecordId, RecordIndex};
use crate::matching::{MatchDecision, Matcher, ScoreBreakdown, Scorer};
use crate::{DocumentError, ExtractedTitle, ExtractionError, MatchResult, PdfDocument};

/// What happened to one PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfOutcome {
    pub filename: String,
    #[serde(flatten)]
    pub kind: PdfOutcomeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PdfOutcomeKind {
    Claimed {
        title: String,
        record: RecordId,
        score: u8,
        scorer: Scorer,
        breakdown: ScoreBreakdown,
    },
    NoMatch {
        title: String,
        /// Closest unclaimed record and its score, if any record was scored.
        best: Option<(RecordId, u8)>,
    },
    ExtractionFailed {
        error: ExtractionError,
    },
}

impl PdfOutcome {
    /// Confidence for the audit list: the claim score, or the best rejected score.
    pub fn confidence(&self) -> Option<u8> {
        match &self.kind {
            PdfOutcomeKind::Claimed { score, .. } => Some(*score),
            PdfOutcomeKind::NoMatch { best, .. } => best.map(|(_, s)| s),
            PdfOutcomeKind::ExtractionFailed { .. } => None,
        }
    }

    pub fn extracted_title(&self) -> Option<&str> {
        match &self.kind {
            PdfOutcomeKind::Claimed { title, .. } | PdfOutcomeKind::NoMatch { title, .. } => {
                Some(title)
            }
            PdfOutcomeKind::ExtractionFailed { .. } => None,
        }
    }
}

/// Situations where processing order decided the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ambiguity {
    /// Several unclaimed records scored (nearly) the same for this PDF; the
    /// first one in table order won.
    Tie {
        filename: String,
        records: Vec<RecordId>,
        score: u8,
    },
    /// A record an earlier PDF already claimed scores at least as well for
    /// this PDF as whatever it ended up with.
    Contested {
        filename: String,
        record: RecordId,
        claimed_by: String,
        score: u8,
    },
    /// Records whose titles are identical after normalization.
    DuplicateTitles { records: Vec<RecordId> },
}

/// Run totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkageStats {
    pub pdfs_total: usize,
    pub pdfs_claimed: usize,
    pub pdfs_extraction_failed: usize,
    pub pdfs_unmatched: usize,
    pub records_total: usize,
    /// Includes records that were already linked before the run.
    pub records_claimed: usize,
    pub records_unclaimed: usize,
}

/// Everything a run produced besides the updated records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkageReport {
    pub threshold: u8,
    /// One entry per input PDF, in processing order.
    pub outcomes: Vec<PdfOutcome>,
    pub matches: Vec<MatchResult>,
    pub ambiguities: Vec<Ambiguity>,
    pub stats: LinkageStats,
}

impl LinkageReport {
    pub fn extraction_failures(&self) -> impl Iterator<Item = &PdfOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.kind, PdfOutcomeKind::ExtractionFailed { .. }))
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &PdfOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.kind, PdfOutcomeKind::NoMatch { .. }))
    }

    /// `(filename, confidence)` for every PDF, in processing order.
    pub fn confidences(&self) -> Vec<(&str, Option<u8>)> {
        self.outcomes
            .iter()
            .map(|o| (o.filename.as_str(), o.confidence()))
            .collect()
    }
}

/// Progress notifications emitted while linking.
#[derive(Debug, Clone, Copy)]
pub enum LinkEvent<'a> {
    Processing { index: usize, filename: &'a str },
    Finished { index: usize, outcome: &'a PdfOutcome },
}

/// Drives title extraction and matching over a batch of PDFs.
pub struct Linker<T> {
    titles: T,
    matcher: Matcher,
}

impl<T: TitleSource> Linker<T> {
    pub fn new(titles: T, matcher: Matcher) -> Self {
        Self { titles, matcher }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Link every document against `index`, then write the claims into it.
    pub fn run<I>(&self, documents: I, index: &mut RecordIndex) -> LinkageReport
    where
        I: IntoIterator<Item = Result<PdfDocument, DocumentError>>,
    {
        self.run_with_progress(documents, index, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_event` before and after each PDF.
    pub fn run_with_progress<I, F>(
        &self,
        documents: I,
        index: &mut RecordIndex,
        mut on_event: F,
    ) -> LinkageReport
    where
        I: IntoIterator<Item = Result<PdfDocument, DocumentError>>,
        F: FnMut(LinkEvent<'_>),
    {
        let mut claims = index.initial_claims();
        let mut report = LinkageReport {
            threshold: self.matcher.threshold(),
            ..Default::default()
        };

        for (i, document) in documents.into_iter().enumerate() {
            let filename = match &document {
                Ok(doc) => doc.filename.clone(),
                Err(err) => err.filename.clone(),
            };
            on_event(LinkEvent::Processing {
                index: i,
                filename: &filename,
            });

            let kind = self.link_one(document, index, &mut claims, &mut report);
            let outcome = PdfOutcome { filename, kind };
            on_event(LinkEvent::Finished {
                index: i,
                outcome: &outcome,
            });
            report.outcomes.push(outcome);
        }

        for group in index.duplicate_titles() {
            report
                .ambiguities
                .push(Ambiguity::DuplicateTitles { records: group });
        }

        for m in &report.matches {
            index.apply(m);
        }

        report.stats = LinkageStats {
            pdfs_total: report.outcomes.len(),
            pdfs_claimed: report.matches.len(),
            pdfs_extraction_failed: report.extraction_failures().count(),
            pdfs_unmatched: report.unmatched().count(),
            records_total: index.len(),
            records_claimed: claims.len(),
            records_unclaimed: index.len() - claims.len(),
        };

        tracing::info!(
            pdfs = report.stats.pdfs_total,
            claimed = report.stats.pdfs_claimed,
            extraction_failed = report.stats.pdfs_extraction_failed,
            unmatched = report.stats.pdfs_unmatched,
            "linkage complete"
        );

        report
    }

    fn link_one(
        &self,
        document: Result<PdfDocument, DocumentError>,
        index: &RecordIndex,
        claims: &mut ClaimSet,
        report: &mut LinkageReport,
    ) -> PdfOutcomeKind {
        let extracted = document
            .map_err(|err| ExtractionError::Unreadable {
                reason: err.source.to_string(),
            })
            .and_then(|doc| self.titles.extract_title(&doc));

        let ExtractedTitle {
            source_filename: filename,
            text: title,
        } = match extracted {
            Ok(t) => t,
            Err(error) => {
                tracing::warn!(error = %error, "title extraction failed");
                return PdfOutcomeKind::ExtractionFailed { error };
            }
        };

        let decision = self.matcher.best_match(&title, index, claims);
        let own_score = match &decision {
            MatchDecision::Matched { winner, .. } => Some(winner.score),
            MatchDecision::NoMatch { best } => best.map(|b| b.score),
        };

        // An earlier claim that fits this PDF at least as well.
        if let Some(taken) = self.matcher.best_claimed(&title, index, claims)
            && taken.score >= self.matcher.threshold()
            && own_score.is_none_or(|s| taken.score >= s)
        {
            let claimed_by = claims.claimant(taken.record).unwrap_or_default().to_string();
            tracing::debug!(
                file = %filename,
                record = %taken.record,
                claimed_by = %claimed_by,
                score = taken.score,
                "best record already claimed"
            );
            report.ambiguities.push(Ambiguity::Contested {
                filename: filename.clone(),
                record: taken.record,
                claimed_by,
                score: taken.score,
            });
        }

        match decision {
            MatchDecision::Matched { winner, runner_up } => {
                if let Some(r) = runner_up
                    && r.score.saturating_add(self.matcher.config().ambiguity_margin)
                        >= winner.score
                {
                    report.ambiguities.push(Ambiguity::Tie {
                        filename: filename.clone(),
                        records: vec![winner.record, r.record],
                        score: winner.score,
                    });
                }

                claims.claim(winner.record, filename.clone());
                let scorer = winner.scorer();
                tracing::debug!(
                    file = %filename,
                    record = %winner.record,
                    score = winner.score,
                    scorer = scorer.as_str(),
                    "claimed"
                );
                report.matches.push(MatchResult {
                    record: winner.record,
                    filename,
                    score: winner.score,
                    scorer,
                    breakdown: winner.breakdown,
                });
                PdfOutcomeKind::Claimed {
                    title,
                    record: winner.record,
                    score: winner.score,
                    scorer,
                    breakdown: winner.breakdown,
                }
            }
            MatchDecision::NoMatch { best } => {
                tracing::info!(
                    file = %filename,
                    title = %title,
                    best_score = best.map(|b| b.score),
                    "no confident match"
                );
                PdfOutcomeKind::NoMatch {
                    title,
                    best: best.map(|b| (b.record, b.score)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BibliographicRecord;
    use crate::matching::MatcherConfig;

    /// Title source that treats the first page as the title verbatim.
    fn first_page(doc: &PdfDocument) -> Result<ExtractedTitle, ExtractionError> {
        let text = doc.pages.first().map(|p| p.trim()).unwrap_or("");
        if text.is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        Ok(ExtractedTitle {
            source_filename: doc.filename.clone(),
            text: text.to_string(),
        })
    }

    fn doc(name: &str, title: &str) -> Result<PdfDocument, DocumentError> {
        Ok(PdfDocument::new(name, vec![title.to_string()]))
    }

    fn index_of(titles: &[&str]) -> RecordIndex {
        RecordIndex::new(
            titles
                .iter()
                .map(|t| BibliographicRecord::new(1, 1, None, *t))
                .collect(),
        )
    }

    #[test]
    fn test_claim_written_into_record() {
        let mut index = index_of(&["Applications of Smart Technology"]);
        let linker = Linker::new(first_page, Matcher::default());
        let report = linker.run(vec![doc("x.pdf", "Smart Technology Applications")], &mut index);

        let record = index.get(RecordId(0)).unwrap();
        assert_eq!(record.matched_filename.as_deref(), Some("x.pdf"));
        assert!(record.match_confidence.unwrap() >= 90);
        assert_eq!(report.stats.pdfs_claimed, 1);
        assert_eq!(report.stats.records_unclaimed, 0);
    }

    #[test]
    fn test_empty_text_goes_to_failure_bucket() {
        let mut index = index_of(&["Energy Saving Trends"]);
        let before = index.records().to_vec();
        let linker = Linker::new(first_page, Matcher::default());
        let report = linker.run(vec![doc("blank.pdf", "")], &mut index);

        assert_eq!(index.records(), &before[..]);
        assert_eq!(report.stats.pdfs_extraction_failed, 1);
        let failed: Vec<_> = report.extraction_failures().collect();
        assert_eq!(failed[0].filename, "blank.pdf");
    }

    #[test]
    fn test_unreadable_document_reported() {
        let mut index = index_of(&["Energy Saving Trends"]);
        let linker = Linker::new(first_page, Matcher::default());
        let broken = Err(DocumentError {
            filename: "broken.pdf".into(),
            source: crate::BackendError::Encrypted,
        });
        let report = linker.run(vec![broken, doc("ok.pdf", "Energy Saving Trends")], &mut index);

        assert_eq!(report.outcomes.len(), 2);
        match &report.outcomes[0].kind {
            PdfOutcomeKind::ExtractionFailed {
                error: ExtractionError::Unreadable { reason },
            } => assert!(reason.contains("encrypted")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(report.stats.pdfs_claimed, 1);
    }

    #[test]
    fn test_second_identical_pdf_is_contested() {
        let mut index = index_of(&["Energy Saving Trends"]);
        let linker = Linker::new(first_page, Matcher::default());
        let report = linker.run(
            vec![
                doc("first.pdf", "Energy Saving Trends"),
                doc("second.pdf", "Energy Saving Trends"),
            ],
            &mut index,
        );

        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].filename, "first.pdf");
        assert_eq!(report.matches[0].score, 100);
        assert!(matches!(
            report.outcomes[1].kind,
            PdfOutcomeKind::NoMatch { best: None, .. }
        ));
        assert!(report.ambiguities.contains(&Ambiguity::Contested {
            filename: "second.pdf".into(),
            record: RecordId(0),
            claimed_by: "first.pdf".into(),
            score: 100,
        }));
    }

    #[test]
    fn test_tie_is_reported() {
        let mut index = index_of(&["Energy Saving Trends", "Energy Saving Trends"]);
        let linker = Linker::new(first_page, Matcher::default());
        let report = linker.run(vec![doc("a.pdf", "Energy Saving Trends")], &mut index);

        assert_eq!(report.matches[0].record, RecordId(0));
        assert!(report.ambiguities.iter().any(|a| matches!(a, Ambiguity::Tie { .. })));
        assert!(report.ambiguities.contains(&Ambiguity::DuplicateTitles {
            records: vec![RecordId(0), RecordId(1)]
        }));
    }

    #[test]
    fn test_prelinked_records_stay_claimed() {
        let mut linked = BibliographicRecord::new(1, 1, None, "Energy Saving Trends");
        linked.matched_filename = Some("old.pdf".into());
        linked.match_confidence = Some(100);
        let mut index = RecordIndex::new(vec![linked]);
        let linker = Linker::new(first_page, Matcher::default());
        let report = linker.run(vec![doc("new.pdf", "Energy Saving Trends")], &mut index);

        assert!(report.matches.is_empty());
        assert_eq!(
            index.get(RecordId(0)).unwrap().matched_filename.as_deref(),
            Some("old.pdf")
        );
        assert_eq!(report.stats.records_claimed, 1);
    }

    #[test]
    fn test_progress_events_bracket_each_pdf() {
        let mut index = index_of(&["Energy Saving Trends"]);
        let linker = Linker::new(first_page, Matcher::default());
        let mut seen = Vec::new();
        linker.run_with_progress(
            vec![doc("a.pdf", "Energy Saving Trends"), doc("b.pdf", "")],
            &mut index,
            |event| match event {
                LinkEvent::Processing { index, filename } => {
                    seen.push(format!("start {index} {filename}"))
                }
                LinkEvent::Finished { index, outcome } => {
                    seen.push(format!("end {index} {:?}", outcome.confidence()))
                }
            },
        );
        assert_eq!(
            seen,
            vec![
                "start 0 a.pdf",
                "end 0 Some(100)",
                "start 1 b.pdf",
                "end 1 None"
            ]
        );
    }

    #[test]
    fn test_threshold_recorded_in_report() {
        let mut index = index_of(&["Energy Saving Trends"]);
        let matcher = Matcher::new(MatcherConfig {
            threshold: 85,
            ..Default::default()
        });
        let none: Vec<Result<PdfDocument, DocumentError>> = Vec::new();
        let report = Linker::new(first_page, matcher).run(none, &mut index);
        assert_eq!(report.threshold, 85);
        assert_eq!(report.stats.pdfs_total, 0);
        assert_eq!(report.stats.records_unclaimed, 1);
    }
}
