use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::newsletter_subscriptions;
use crate::validation::ValidationErrors;

pub const SOURCE_WEBSITE_FORM: &str = "website_form";
pub const SOURCE_VIEWING_REQUEST: &str = "viewing_request";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = newsletter_subscriptions, check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: Uuid,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub is_active: bool,
    pub source: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = newsletter_subscriptions)]
pub struct NewSubscription {
    pub id: Uuid,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub is_active: bool,
    pub source: String,
}

impl NewSubscription {
    /// Addresses are stored trimmed and lowercased so resubmissions collide.
    pub fn new(email: &str, source: &str, now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        let email = email.trim().to_lowercase();
        let mut errors = ValidationErrors::default();
        errors.require_email("email", &email);
        errors.into_result(Self {
            id: Uuid::new_v4(),
            email,
            subscribed_at: now,
            is_active: true,
            source: source.to_string(),
        })
    }
}

impl From<NewSubscription> for Subscription {
    fn from(n: NewSubscription) -> Self {
        Self {
            id: n.id,
            email: n.email,
            subscribed_at: n.subscribed_at,
            is_active: n.is_active,
            source: n.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeOutcome {
    Subscribed(Subscription),
    AlreadySubscribed(Subscription),
}

impl SubscribeOutcome {
    pub fn subscription(&self) -> &Subscription {
        match self {
            SubscribeOutcome::Subscribed(s) | SubscribeOutcome::AlreadySubscribed(s) => s,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, SubscribeOutcome::Subscribed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_address() {
        let s = NewSubscription::new("  Ann@Example.COM ", SOURCE_WEBSITE_FORM, Utc::now()).unwrap();
        assert_eq!(s.email, "ann@example.com");
        assert!(NewSubscription::new("ann@", SOURCE_WEBSITE_FORM, Utc::now()).is_err());
    }
}
