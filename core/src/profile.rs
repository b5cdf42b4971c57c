//! Student personal and contact details.

use crate::error::{HostelError, Result};
use crate::phone::PhoneNumber;
use crate::types::{AccountId, Gender, StudentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional demographic and next-of-kin details collected with a booking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    /// County of origin
    pub home_county: Option<String>,
    /// Current location
    pub location: Option<String>,
    /// Former high school
    pub former_high_school: Option<String>,
    /// Mother's name
    pub mothers_name: Option<String>,
    /// Mother's phone
    pub mothers_number: Option<String>,
    /// Father's name
    pub fathers_name: Option<String>,
    /// Father's phone
    pub fathers_number: Option<String>,
    /// Guardian's name
    pub guardian_name: Option<String>,
    /// Guardian's phone
    pub guardian_number: Option<String>,
    /// School or university
    pub school: Option<String>,
    /// Course of study
    pub course: Option<String>,
}

/// A student's profile, one per account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    /// Profile ID
    pub id: StudentId,
    /// Owning account (one-to-one)
    pub account_id: AccountId,
    /// Full name
    pub full_name: String,
    /// Canonical phone number, unique across profiles
    pub phone_number: PhoneNumber,
    /// Gender
    pub gender: Gender,
    /// Optional extra fields
    #[serde(flatten)]
    pub details: ProfileDetails,
    /// Created
    pub created_at: DateTime<Utc>,
    /// Last modified
    pub updated_at: DateTime<Utc>,
}

/// Profile fields submitted with a booking or a profile edit.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    /// Full name (required)
    pub full_name: Option<String>,
    /// Phone in any accepted local form (required)
    pub phone_number: Option<String>,
    /// Gender (required)
    pub gender: Option<Gender>,
    /// Optional extra fields
    #[serde(flatten)]
    pub details: ProfileDetails,
}

/// Validated profile fields, ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidProfile {
    /// Full name
    pub full_name: String,
    /// Canonical phone
    pub phone_number: PhoneNumber,
    /// Gender
    pub gender: Gender,
    /// Optional extra fields
    pub details: ProfileDetails,
}

impl ProfileInput {
    /// Check required fields and normalize the phone number.
    ///
    /// # Errors
    ///
    /// Returns [`HostelError::Validation`] naming the missing fields, or the
    /// phone normalization error.
    pub fn validate(self) -> Result<ValidProfile> {
        let full_name = self
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let phone = self
            .phone_number
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let mut missing = Vec::new();
        if full_name.is_none() {
            missing.push("fullName");
        }
        if phone.is_none() {
            missing.push("phoneNumber");
        }
        if self.gender.is_none() {
            missing.push("gender");
        }

        match (full_name, phone, self.gender) {
            (Some(full_name), Some(phone), Some(gender)) => Ok(ValidProfile {
                full_name,
                phone_number: PhoneNumber::parse(&phone)?,
                gender,
                details: self.details,
            }),
            _ => Err(HostelError::validation(format!(
                "Missing required profile fields: {}",
                missing.join(", ")
            ))),
        }
    }
}
