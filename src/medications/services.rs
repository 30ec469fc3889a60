use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    dto::{CreateMedicationRequest, MedicationView, UpdateMedicationRequest},
    repo_types::{normalize_slots, Medication},
};
use crate::{
    error::{ApiError, ApiResult},
    reminders::schedule::{next_dose, refill_due},
};

pub fn view(medication: Medication, now: OffsetDateTime) -> MedicationView {
    MedicationView {
        next_dose: next_dose(&medication, now),
        refill_due: refill_due(&medication, now),
        medication,
    }
}

/// Longest dosing interval accepted, one dose a year.
pub const MAX_FREQUENCY_HOURS: i64 = 24 * 365;

pub fn validate(med: &Medication) -> ApiResult<()> {
    if med.name.trim().is_empty() {
        return Err(ApiError::validation("name must not be empty"));
    }
    if med.dosage.trim().is_empty() {
        return Err(ApiError::validation("dosage must not be empty"));
    }
    if !(1..=MAX_FREQUENCY_HOURS).contains(&med.frequency) {
        return Err(ApiError::validation(format!(
            "frequency must be between 1 and {MAX_FREQUENCY_HOURS} hours"
        )));
    }
    if med.end_date.is_some_and(|end| end < med.start_date) {
        return Err(ApiError::validation("end_date must not be before start_date"));
    }
    Ok(())
}

pub fn new_medication(user_id: Uuid, req: CreateMedicationRequest, now: OffsetDateTime) -> ApiResult<Medication> {
    let mut slots = req.times_of_day;
    slots.extend(req.preferred_time);
    let med = Medication {
        id: Uuid::new_v4(),
        user_id,
        name: req.name.trim().to_string(),
        dosage: req.dosage.trim().to_string(),
        frequency: req.frequency,
        times_of_day: normalize_slots(slots),
        start_date: req.start_date,
        end_date: req.end_date,
        instructions: req.instructions,
        notes: req.notes,
        refill_quantity: req.refill_quantity,
        last_taken: None,
        created_at: now,
        updated_at: now,
    };
    validate(&med)?;
    Ok(med)
}

pub fn apply_update(med: &mut Medication, req: UpdateMedicationRequest, now: OffsetDateTime) -> ApiResult<()> {
    if let Some(name) = req.name {
        med.name = name.trim().to_string();
    }
    if let Some(dosage) = req.dosage {
        med.dosage = dosage.trim().to_string();
    }
    if let Some(frequency) = req.frequency {
        med.frequency = frequency;
    }
    if let Some(slots) = req.times_of_day {
        med.times_of_day = normalize_slots(slots);
    }
    if let Some(start) = req.start_date {
        med.start_date = start;
    }
    if let Some(end_date) = req.end_date {
        med.end_date = end_date;
    }
    if let Some(instructions) = req.instructions {
        med.instructions = instructions;
    }
    if let Some(notes) = req.notes {
        med.notes = notes;
    }
    if let Some(refill_quantity) = req.refill_quantity {
        med.refill_quantity = refill_quantity;
    }
    if let Some(last_taken) = req.last_taken {
        med.last_taken = last_taken;
    }
    validate(med)?;
    med.updated_at = now;
    Ok(())
}

/// Records a dose taken at `now`, using up one dose of the supply.
pub fn take_dose(med: &mut Medication, now: OffsetDateTime) {
    med.last_taken = Some(now);
    med.refill_quantity = med.refill_quantity.map(|q| q.saturating_sub(1));
    med.updated_at = now;
}

pub fn refill(med: &mut Medication, quantity: u32, now: OffsetDateTime) -> ApiResult<()> {
    if quantity == 0 {
        return Err(ApiError::validation("quantity must be positive"));
    }
    med.refill_quantity = Some(med.refill_quantity.unwrap_or(0).saturating_add(quantity));
    med.updated_at = now;
    Ok(())
}
