//! Case matching.
//!
//! Decides whether an incoming report belongs to an existing disease episode
//! or must open a new one. Pure date arithmetic over pre-filtered candidates;
//! no I/O, no side effects.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::case::CaseRecord;
use crate::report::ReportFact;

/// Result of matching a report against the existing cases in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The report belongs to this existing case.
    Matched(Uuid),
    /// No case lies within the window; the caller must create one.
    NoMatch,
}

/// Finds the best matching case for a report fact.
///
/// `candidates` must already be filtered to the same patient and pathogen as
/// the fact; this function does not scan unrelated cases.
///
/// A candidate matches when the absolute difference between its anchor date
/// and the fact's event date is at most `window_days` whole calendar days.
/// The comparison is deliberately calendar-based: time-of-day was truncated
/// during normalisation, and the window is symmetric in time, so a report
/// dated before an existing case's anchor still matches within the window.
///
/// Among matching candidates the one with the smallest day difference wins;
/// equal differences are broken by the earliest anchor date, which keeps the
/// selection deterministic regardless of candidate order.
pub fn find_matching_case(
    fact: &ReportFact,
    candidates: &[CaseRecord],
    window_days: i64,
) -> MatchOutcome {
    let best = candidates
        .iter()
        .map(|case| (abs_day_diff(case.case_date, fact.event_date), case))
        .filter(|(diff, _)| *diff <= window_days)
        .min_by_key(|(diff, case)| (*diff, case.case_date));

    match best {
        Some((_, case)) => MatchOutcome::Matched(case.case_id),
        None => MatchOutcome::NoMatch,
    }
}

fn abs_day_diff(a: NaiveDate, b: NaiveDate) -> i64 {
    a.signed_duration_since(b).num_days().abs()
}
