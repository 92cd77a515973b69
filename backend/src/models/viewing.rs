use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::viewing_requests;
use crate::validation::ValidationErrors;

pub const BUYING_STATUSES: &[&str] = &[
    "First time buyer",
    "Chain free",
    "Current home under offer",
    "Current home on the market",
    "Current home not yet on the market",
    "Investor",
    "Buying second home",
];

pub const FUNDING_OPTIONS: &[&str] = &["Cash", "Mortgage agreed", "Need mortgage", "Other"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = viewing_requests, check_for_backend(diesel::pg::Pg))]
pub struct ViewingRequest {
    pub id: Uuid,
    pub property_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub current_address: String,
    pub postcode: String,
    pub buying_status: String,
    pub funding_option: String,
    pub heard_about: String,
    pub subscribe_newsletter: bool,
    pub created_at: DateTime<Utc>,
}

/// Body of the "request a viewing" form on a property page.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewingForm {
    pub property_id: Uuid,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub current_address: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub buying_status: String,
    #[serde(default)]
    pub funding_option: String,
    #[serde(default)]
    pub heard_about: String,
    #[serde(default)]
    pub subscribe_newsletter: bool,
    #[serde(default)]
    pub accepted_terms: bool,
}

impl ViewingForm {
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewViewingRequest, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_len("first_name", &self.first_name, 1, "First name is required");
        errors.require_len("last_name", &self.last_name, 1, "Last name is required");
        errors.require_email("email", &self.email);
        errors.require_len("phone", &self.phone, 1, "Phone number is required");
        errors.require_len("current_address", &self.current_address, 1, "Current address is required");
        errors.require_len("postcode", &self.postcode, 1, "Postcode is required");
        errors.require_one_of("buying_status", &self.buying_status, BUYING_STATUSES);
        errors.require_one_of("funding_option", &self.funding_option, FUNDING_OPTIONS);
        errors.require_len("heard_about", &self.heard_about, 1, "Please select an option");
        if !self.accepted_terms {
            errors.add("accepted_terms", "You must accept the terms.");
        }

        errors.into_result(NewViewingRequest {
            id: Uuid::new_v4(),
            property_id: self.property_id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            current_address: self.current_address.trim().to_string(),
            postcode: self.postcode.trim().to_uppercase(),
            buying_status: self.buying_status.trim().to_string(),
            funding_option: self.funding_option.trim().to_string(),
            heard_about: self.heard_about.trim().to_string(),
            subscribe_newsletter: self.subscribe_newsletter,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = viewing_requests)]
pub struct NewViewingRequest {
    pub id: Uuid,
    pub property_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub current_address: String,
    pub postcode: String,
    pub buying_status: String,
    pub funding_option: String,
    pub heard_about: String,
    pub subscribe_newsletter: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NewViewingRequest> for ViewingRequest {
    fn from(n: NewViewingRequest) -> Self {
        Self {
            id: n.id,
            property_id: n.property_id,
            first_name: n.first_name,
            last_name: n.last_name,
            email: n.email,
            phone: n.phone,
            current_address: n.current_address,
            postcode: n.postcode,
            buying_status: n.buying_status,
            funding_option: n.funding_option,
            heard_about: n.heard_about,
            subscribe_newsletter: n.subscribe_newsletter,
            created_at: n.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ViewingForm {
        ViewingForm {
            property_id: Uuid::new_v4(),
            first_name: "Tom".into(),
            last_name: "Birk".into(),
            email: "tom@example.com".into(),
            phone: "07700 900123".into(),
            current_address: "1 High St, Kendal".into(),
            postcode: "la9 4aa".into(),
            buying_status: "Chain free".into(),
            funding_option: "Cash".into(),
            heard_about: "Recommendation".into(),
            subscribe_newsletter: false,
            accepted_terms: true,
        }
    }

    #[test]
    fn accepts_complete_form() {
        let request = form().validate(Utc::now()).unwrap();
        assert_eq!(request.postcode, "LA9 4AA");
    }

    #[test]
    fn terms_and_options_are_enforced() {
        let mut f = form();
        f.accepted_terms = false;
        f.funding_option = "Bitcoin".into();
        let errors = f.validate(Utc::now()).unwrap_err();
        assert_eq!(errors.get("accepted_terms"), Some("You must accept the terms."));
        assert!(errors.get("funding_option").is_some());
        assert!(errors.get("buying_status").is_none());
    }
}
