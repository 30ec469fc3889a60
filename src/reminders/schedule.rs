//! Reminder computation over medications and appointments.
//!
//! Everything here is a pure function of the records and the reference
//! time: no reminder state is persisted, so asking twice gives the same
//! answer.

use serde::Serialize;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    appointments::repo_types::Appointment,
    config::ReminderConfig,
    medications::repo_types::{Medication, TimeOfDay},
};

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("window start must not be after its end")]
    InvertedWindow,
    #[error("hours must be between 1 and {}", MAX_HORIZON_HOURS)]
    HorizonOutOfRange,
}

/// Longest look-ahead accepted for an upcoming-reminder query.
pub const MAX_HORIZON_HOURS: i64 = 24 * 366;

/// Look-ahead span of `hours`, bounded to `1..=MAX_HORIZON_HOURS`.
pub fn horizon(hours: i64) -> Result<Duration, ScheduleError> {
    if !(1..=MAX_HORIZON_HOURS).contains(&hours) {
        return Err(ScheduleError::HorizonOutOfRange);
    }
    Ok(Duration::hours(hours))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReminderPolicy {
    /// How long before an appointment to remind when it has no reminder time.
    pub appointment_lead: Duration,
}

impl From<&ReminderConfig> for ReminderPolicy {
    fn from(cfg: &ReminderConfig) -> Self {
        Self {
            appointment_lead: Duration::seconds(cfg.appointment_lead_minutes.saturating_mul(60)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Dose,
    Refill,
    Appointment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub kind: ReminderKind,
    pub record_id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub due_at: OffsetDateTime,
}

/// Half-open time range `[from, until)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    from: OffsetDateTime,
    until: OffsetDateTime,
}

impl Window {
    pub fn new(from: OffsetDateTime, until: OffsetDateTime) -> Result<Self, ScheduleError> {
        if from > until {
            return Err(ScheduleError::InvertedWindow);
        }
        Ok(Self { from, until })
    }

    /// `[from, from + span)`, or an empty window for a negative span.
    pub fn starting_at(from: OffsetDateTime, span: Duration) -> Self {
        let until = from.checked_add(span.max(Duration::ZERO)).unwrap_or(from);
        Self { from, until }
    }

    pub fn start(&self) -> OffsetDateTime {
        self.from
    }

    pub fn end(&self) -> OffsetDateTime {
        self.until
    }

    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.from <= at && at < self.until
    }
}

fn dose_interval(med: &Medication) -> Option<Duration> {
    if med.frequency <= 0 {
        return None;
    }
    med.frequency.checked_mul(3600).map(Duration::seconds)
}

/// Whether the course of `med` was over before `at`.
pub fn ended_before(med: &Medication, at: OffsetDateTime) -> bool {
    med.end_date.is_some_and(|end| end < at)
}

/// Earliest slot on the day of `at` or the day after that is not before `at`.
fn first_slot_at_or_after(at: OffsetDateTime, slots: &[TimeOfDay]) -> Option<OffsetDateTime> {
    let day = at.date();
    let days = [Some(day), day.next_day()];
    days.into_iter()
        .flatten()
        .flat_map(|d| {
            slots
                .iter()
                .map(move |slot| d.with_time(slot.0).assume_offset(at.offset()))
        })
        .filter(|candidate| *candidate >= at)
        .min()
}

/// When the next dose of `med` is due, seen from `now`.
pub fn next_dose(med: &Medication, now: OffsetDateTime) -> Option<OffsetDateTime> {
    if ended_before(med, now) {
        return None;
    }
    let interval = dose_interval(med)?;
    let due = match med.last_taken {
        Some(taken) => taken.checked_add(interval)?,
        None if !med.times_of_day.is_empty() => {
            first_slot_at_or_after(med.start_date, &med.times_of_day)?
        }
        None => med.start_date.checked_add(interval)?,
    };
    if ended_before(med, due) {
        return None;
    }
    Some(due)
}

/// When the doses on hand run out: the first dose the supply no longer covers.
pub fn refill_due(med: &Medication, now: OffsetDateTime) -> Option<OffsetDateTime> {
    let on_hand = i64::from(med.refill_quantity?);
    let next = next_dose(med, now)?;
    let interval = dose_interval(med)?;
    let due = next.checked_add(interval.checked_mul(i32::try_from(on_hand).ok()?)?)?;
    if ended_before(med, due) {
        return None;
    }
    Some(due)
}

/// When to remind about `appt`, seen from `now`.
pub fn appointment_reminder(
    appt: &Appointment,
    now: OffsetDateTime,
    policy: &ReminderPolicy,
) -> Option<OffsetDateTime> {
    if appt.reminded_at.is_some() || appt.appointment_date < now {
        return None;
    }
    match appt.reminder_time {
        Some(at) => Some(at),
        None => appt.appointment_date.checked_sub(policy.appointment_lead),
    }
}

/// Every reminder due inside `window`, computed as of the window start and
/// ordered by due time, kind, then record id.
pub fn due_within(
    medications: &[Medication],
    appointments: &[Appointment],
    window: Window,
    policy: &ReminderPolicy,
) -> Vec<Reminder> {
    let now = window.from;
    let mut reminders = Vec::new();

    for med in medications {
        if let Some(due_at) = next_dose(med, now) {
            reminders.push(Reminder {
                kind: ReminderKind::Dose,
                record_id: med.id,
                title: format!("{} {}", med.name, med.dosage),
                due_at,
            });
        }
        if let Some(due_at) = refill_due(med, now) {
            reminders.push(Reminder {
                kind: ReminderKind::Refill,
                record_id: med.id,
                title: format!("Refill {}", med.name),
                due_at,
            });
        }
    }
    for appt in appointments {
        if let Some(due_at) = appointment_reminder(appt, now, policy) {
            reminders.push(Reminder {
                kind: ReminderKind::Appointment,
                record_id: appt.id,
                title: appt.title.clone(),
                due_at,
            });
        }
    }

    reminders.retain(|r| window.contains(r.due_at));
    reminders.sort_by(|a, b| {
        (a.due_at, a.kind, a.record_id).cmp(&(b.due_at, b.kind, b.record_id))
    });
    reminders.dedup_by(|a, b| a.kind == b.kind && a.record_id == b.record_id);
    reminders
}
