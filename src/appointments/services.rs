use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    dto::{CreateAppointmentRequest, UpdateAppointmentRequest},
    repo_types::Appointment,
};
use crate::error::{ApiError, ApiResult};

pub fn validate(appt: &Appointment) -> ApiResult<()> {
    if appt.title.trim().is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    if appt.reminder_time.is_some_and(|at| at > appt.appointment_date) {
        return Err(ApiError::validation("reminder_time must not be after appointment_date"));
    }
    Ok(())
}

pub fn new_appointment(user_id: Uuid, req: CreateAppointmentRequest, now: OffsetDateTime) -> ApiResult<Appointment> {
    let appt = Appointment {
        id: Uuid::new_v4(),
        user_id,
        title: req.title.trim().to_string(),
        description: req.description,
        location: req.location,
        doctor_name: req.doctor_name,
        appointment_date: req.appointment_date,
        reminder_time: req.reminder_time,
        reminded_at: None,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    validate(&appt)?;
    Ok(appt)
}

pub fn apply_update(appt: &mut Appointment, req: UpdateAppointmentRequest, now: OffsetDateTime) -> ApiResult<()> {
    if let Some(title) = req.title {
        appt.title = title.trim().to_string();
    }
    if let Some(description) = req.description {
        appt.description = description;
    }
    if let Some(location) = req.location {
        appt.location = location;
    }
    if let Some(doctor_name) = req.doctor_name {
        appt.doctor_name = doctor_name;
    }
    // moving the appointment or its reminder re-arms the reminder
    if let Some(date) = req.appointment_date {
        appt.appointment_date = date;
        appt.reminded_at = None;
    }
    if let Some(reminder_time) = req.reminder_time {
        appt.reminder_time = reminder_time;
        appt.reminded_at = None;
    }
    if let Some(notes) = req.notes {
        appt.notes = notes;
    }
    validate(appt)?;
    appt.updated_at = now;
    Ok(())
}

pub fn mark_reminded(appt: &mut Appointment, now: OffsetDateTime) {
    appt.reminded_at = Some(now);
    appt.updated_at = now;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn request() -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            title: "Dentist".into(),
            description: None,
            location: Some("Main St".into()),
            doctor_name: Some("Dr. Oduya".into()),
            appointment_date: datetime!(2024-04-01 10:00 UTC),
            reminder_time: Some(datetime!(2024-04-01 09:00 UTC)),
            notes: None,
        }
    }

    #[test]
    fn reminder_after_appointment_is_rejected() {
        let mut req = request();
        req.reminder_time = Some(datetime!(2024-04-01 11:00 UTC));
        assert!(matches!(
            new_appointment(Uuid::new_v4(), req, datetime!(2024-03-01 00:00 UTC)),
            Err(ApiError::Validation(_))
        ));

        let mut req = request();
        req.title = "   ".into();
        assert!(new_appointment(Uuid::new_v4(), req, datetime!(2024-03-01 00:00 UTC)).is_err());
    }

    #[test]
    fn rescheduling_rearms_the_reminder() {
        let now = datetime!(2024-03-01 00:00 UTC);
        let mut appt = new_appointment(Uuid::new_v4(), request(), now).unwrap();
        mark_reminded(&mut appt, now);
        assert_eq!(appt.reminded_at, Some(now));

        apply_update(
            &mut appt,
            UpdateAppointmentRequest {
                appointment_date: Some(datetime!(2024-04-02 10:00 UTC)),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(appt.reminded_at, None);
        assert_eq!(appt.location.as_deref(), Some("Main St"));
    }

    #[test]
    fn null_clears_reminder_time_and_location() {
        let now = datetime!(2024-03-01 00:00 UTC);
        let mut appt = new_appointment(Uuid::new_v4(), request(), now).unwrap();
        let req: UpdateAppointmentRequest =
            serde_json::from_value(serde_json::json!({"reminder_time": null, "location": null})).unwrap();
        apply_update(&mut appt, req, now).unwrap();
        assert_eq!(appt.reminder_time, None);
        assert_eq!(appt.location, None);
        assert_eq!(appt.doctor_name.as_deref(), Some("Dr. Oduya"));

        // an absent key leaves the field alone
        let req: UpdateAppointmentRequest = serde_json::from_value(serde_json::json!({"notes": "fasting"})).unwrap();
        apply_update(&mut appt, req, now).unwrap();
        assert_eq!(appt.notes.as_deref(), Some("fasting"));
        assert_eq!(appt.doctor_name.as_deref(), Some("Dr. Oduya"));
    }
}
