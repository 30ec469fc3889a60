use time::{macros::format_description, Date, OffsetDateTime};

use super::{
    dto::UserUpdate,
    repo_types::{Dependent, EmergencyContact, UserRecord},
};
use crate::{
    auth::password::{is_valid_email, normalize_email},
    error::{ApiError, ApiResult},
};

fn check_date(field: &str, raw: &str) -> ApiResult<()> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|_| ())
        .map_err(|_| ApiError::validation(format!("{field} must be YYYY-MM-DD")))
}

fn check_positive(field: &str, value: Option<f64>) -> ApiResult<()> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(ApiError::validation(format!("{field} must be positive"))),
        _ => Ok(()),
    }
}

pub fn validate_contact(contact: &EmergencyContact) -> ApiResult<()> {
    if contact.name.trim().is_empty() || contact.phone.trim().is_empty() {
        return Err(ApiError::validation("emergency contact needs a name and a phone"));
    }
    Ok(())
}

pub fn validate_dependents(dependents: &[Dependent]) -> ApiResult<()> {
    for d in dependents {
        if d.name.trim().is_empty() {
            return Err(ApiError::validation("dependent name must not be empty"));
        }
        if let Some(dob) = d.date_of_birth.as_deref() {
            check_date("dependent date_of_birth", dob)?;
        }
    }
    Ok(())
}

/// Applies a partial profile update. A changed email comes back normalised
/// so the caller can check it is still free.
pub fn apply_update(user: &mut UserRecord, req: UserUpdate, now: OffsetDateTime) -> ApiResult<Option<String>> {
    let mut new_email = None;
    if let Some(email) = req.email {
        let email = normalize_email(&email);
        if !is_valid_email(&email) {
            return Err(ApiError::validation("Invalid email"));
        }
        if email != user.email {
            user.email = email.clone();
            new_email = Some(email);
        }
    }
    if let Some(name) = req.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        user.name = name.to_string();
    }
    if let Some(dob) = req.date_of_birth.as_deref() {
        check_date("date_of_birth", dob)?;
    }
    check_positive("height", req.height)?;
    check_positive("weight", req.weight)?;
    if let Some(contact) = &req.emergency_contact {
        validate_contact(contact)?;
    }

    if req.phone.is_some() {
        user.phone = req.phone;
    }
    if req.gender.is_some() {
        user.gender = req.gender;
    }
    if req.date_of_birth.is_some() {
        user.date_of_birth = req.date_of_birth;
    }
    if req.blood_type.is_some() {
        user.blood_type = req.blood_type;
    }
    if req.height.is_some() {
        user.height = req.height;
    }
    if req.weight.is_some() {
        user.weight = req.weight;
    }
    if req.emergency_contact.is_some() {
        user.emergency_contact = req.emergency_contact;
    }
    user.updated_at = now;
    Ok(new_email)
}
