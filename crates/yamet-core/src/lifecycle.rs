//! Rules that run as side effects of writing a child record: the leave
//! policy and the default assessment/program every child must have.

use chrono::{DateTime, Datelike as _, Duration, Utc};

use crate::{
  child::ChildStatus,
  clinical::{AssessmentInput, ProgramInput, ProgramStatus},
};

/// Default program length.
pub const DEFAULT_PROGRAM_DAYS: i64 = 90;

/// Leave longer than this many calendar months ends the therapy.
pub const MAX_LEAVE_MONTHS: i32 = 3;

/// Leave of at least this many days also ends the therapy, so short months
/// never stretch the limit.
pub const MAX_LEAVE_DAYS: i64 = 90;

// ─── Leave policy ────────────────────────────────────────────────────────────

/// Result of [`resolve_leave`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveResolution {
  pub status:      ChildStatus,
  /// The leave start to store.
  pub leave_start: Option<DateTime<Utc>>,
}

/// Calendar months from `from` to `to`, ignoring the day of month.
pub fn months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i32 {
  (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

/// Apply the leave policy to an update.
///
/// The effective status is the requested one or, when the update does not
/// mention status, the stored one. A child on leave without a leave start
/// gets one stamped at `now`. A child whose leave started three calendar
/// months (or 90 days) ago is stopped regardless of the requested status.
///
/// A leave start only carries over while the child stays on leave. Moving
/// off CUTI drops it, and a new leave never counts from an earlier one.
pub fn resolve_leave(
  requested_status: Option<ChildStatus>,
  stored_status:    ChildStatus,
  requested_leave:  Option<DateTime<Utc>>,
  stored_leave:     Option<DateTime<Utc>>,
  now:              DateTime<Utc>,
) -> LeaveResolution {
  let status   = requested_status.unwrap_or(stored_status);
  let was_away = stored_status == ChildStatus::OnLeave;
  if status != ChildStatus::OnLeave {
    let leave_start = if was_away { requested_leave } else { requested_leave.or(stored_leave) };
    return LeaveResolution { status, leave_start };
  }

  let carried = stored_leave.filter(|_| was_away);
  let started = requested_leave.or(carried).unwrap_or(now);
  let expired = months_between(started, now) >= MAX_LEAVE_MONTHS
    || now - started >= Duration::days(MAX_LEAVE_DAYS);
  LeaveResolution {
    status:      if expired { ChildStatus::Stopped } else { status },
    leave_start: Some(started),
  }
}

// ─── Defaults ────────────────────────────────────────────────────────────────

/// Which write path is synthesizing the defaults; only the notes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakePath {
  Registration,
  Update,
}

impl IntakePath {
  fn phrase(self) -> &'static str {
    match self {
      IntakePath::Registration => "pendaftaran anak",
      IntakePath::Update => "update data anak",
    }
  }
}

/// The assessment created for a child that has none yet.
pub fn default_assessment(
  child_name: &str,
  exam_date:  Option<DateTime<Utc>>,
  now:        DateTime<Utc>,
  path:       IntakePath,
) -> AssessmentInput {
  AssessmentInput {
    assessment_date:   exam_date.unwrap_or(now),
    assessment_type:   "Assessment Awal".to_owned(),
    assessment_result: Some("Menunggu Penilaian".to_owned()),
    notes:             Some(format!(
      "Assessment otomatis dibuat saat {} {child_name}",
      path.phrase()
    )),
  }
}

/// The therapy program created for a child that has none yet.
pub fn default_program(
  child_name: &str,
  exam_date:  Option<DateTime<Utc>>,
  now:        DateTime<Utc>,
  path:       IntakePath,
) -> ProgramInput {
  let start = exam_date.unwrap_or(now);
  ProgramInput {
    program_name: format!("Program Terapi - {child_name}"),
    description:  Some(format!(
      "Program terapi otomatis dibuat saat {} {child_name}",
      path.phrase()
    )),
    start_date:   Some(start),
    end_date:     Some(start + Duration::days(DEFAULT_PROGRAM_DAYS)),
    status:       ProgramStatus::Active,
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap() }

  #[test]
  fn leave_without_start_is_stamped() {
    let now = at(2025, 6, 10);
    let r = resolve_leave(Some(ChildStatus::OnLeave), ChildStatus::Active, None, None, now);
    assert_eq!(r.status, ChildStatus::OnLeave);
    assert_eq!(r.leave_start, Some(now));
  }

  #[test]
  fn leave_three_months_old_becomes_stopped() {
    let now = at(2025, 6, 10);
    let r = resolve_leave(
      Some(ChildStatus::OnLeave),
      ChildStatus::OnLeave,
      None,
      Some(at(2025, 3, 28)),
      now,
    );
    assert_eq!(r.status, ChildStatus::Stopped);
    assert_eq!(r.leave_start, Some(at(2025, 3, 28)));
  }

  #[test]
  fn stored_leave_applies_when_update_omits_status() {
    let now = at(2025, 6, 10);
    let r = resolve_leave(None, ChildStatus::OnLeave, None, Some(at(2025, 1, 2)), now);
    assert_eq!(r.status, ChildStatus::Stopped);
  }

  #[test]
  fn ninety_days_stops_even_across_short_months() {
    // Mar 1 to May 30 is 90 days but only two calendar months.
    let started = at(2025, 3, 1);
    let now     = started + Duration::days(90);
    assert_eq!(months_between(started, now), 2);
    let r = resolve_leave(None, ChildStatus::OnLeave, None, Some(started), now);
    assert_eq!(r.status, ChildStatus::Stopped);
  }

  #[test]
  fn recent_leave_is_kept() {
    let now = at(2025, 6, 10);
    let r = resolve_leave(None, ChildStatus::OnLeave, Some(at(2025, 5, 1)), None, now);
    assert_eq!(r.status, ChildStatus::OnLeave);
  }

  #[test]
  fn non_leave_status_is_untouched() {
    let now = at(2025, 6, 10);
    let r = resolve_leave(Some(ChildStatus::Graduated), ChildStatus::OnLeave, None, Some(at(2024, 1, 1)), now);
    assert_eq!(r.status, ChildStatus::Graduated);
    assert_eq!(r.leave_start, None);
  }

  #[test]
  fn stale_leave_start_does_not_count_toward_a_new_leave() {
    let now = at(2025, 6, 10);
    let r = resolve_leave(Some(ChildStatus::OnLeave), ChildStatus::Active, None, Some(at(2024, 11, 20)), now);
    assert_eq!(r.status, ChildStatus::OnLeave);
    assert_eq!(r.leave_start, Some(now));
  }

  #[test]
  fn unrelated_update_keeps_stored_start() {
    let stopped_at = at(2025, 1, 2);
    let r = resolve_leave(None, ChildStatus::Stopped, None, Some(stopped_at), at(2025, 6, 10));
    assert_eq!(r.status, ChildStatus::Stopped);
    assert_eq!(r.leave_start, Some(stopped_at));
  }

  #[test]
  fn default_program_runs_ninety_days_from_exam() {
    let exam = at(2025, 2, 1);
    let p = default_program("Andi", Some(exam), at(2025, 6, 1), IntakePath::Registration);
    assert_eq!(p.program_name, "Program Terapi - Andi");
    assert_eq!(p.start_date, Some(exam));
    assert_eq!(p.end_date, Some(exam + Duration::days(90)));
    assert_eq!(p.status, ProgramStatus::Active);
  }

  #[test]
  fn default_assessment_falls_back_to_now() {
    let now = at(2025, 6, 1);
    let a = default_assessment("Andi", None, now, IntakePath::Update);
    assert_eq!(a.assessment_date, now);
    assert_eq!(a.assessment_type, "Assessment Awal");
    assert_eq!(a.notes.as_deref(), Some("Assessment otomatis dibuat saat update data anak Andi"));
  }
}
