use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{email_logs, inquiries};
use crate::validation::ValidationErrors;

text_enum! {
    pub enum InquiryStatus {
        New => "new",
        Contacted => "contacted",
        Closed => "closed",
    }
}

text_enum! {
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = inquiries, check_for_backend(diesel::pg::Pg))]
pub struct Inquiry {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub budget_range: String,
    pub preferred_location: String,
    pub message: String,
    pub status: InquiryStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inquiry {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive match over the fields the dashboard search covers.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.preferred_location,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn apply(&mut self, patch: InquiryPatch, now: DateTime<Utc>) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.budget_range {
            self.budget_range = v;
        }
        if let Some(v) = patch.preferred_location {
            self.preferred_location = v;
        }
        if let Some(v) = patch.message {
            self.message = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.priority {
            self.priority = v;
        }
        self.updated_at = now;
    }
}

/// Body of the public contact form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InquiryForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub budget_range: String,
    pub preferred_location: String,
    pub message: String,
}

impl InquiryForm {
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewInquiry, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_len("first_name", &self.first_name, 2, "First name must be at least 2 characters");
        errors.require_len("last_name", &self.last_name, 2, "Last name must be at least 2 characters");
        errors.require_email("email", &self.email);
        errors.require_len("budget_range", &self.budget_range, 1, "Please specify your budget range");
        errors.require_len(
            "preferred_location",
            &self.preferred_location,
            1,
            "Please specify your preferred location",
        );
        errors.require_len(
            "message",
            &self.message,
            10,
            "Please provide more details (at least 10 characters)",
        );

        errors.into_result(NewInquiry {
            id: Uuid::new_v4(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            budget_range: self.budget_range.trim().to_string(),
            preferred_location: self.preferred_location.trim().to_string(),
            message: self.message.trim().to_string(),
            status: InquiryStatus::New,
            priority: Priority::Medium,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = inquiries)]
pub struct NewInquiry {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub budget_range: String,
    pub preferred_location: String,
    pub message: String,
    pub status: InquiryStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NewInquiry> for Inquiry {
    fn from(n: NewInquiry) -> Self {
        Self {
            id: n.id,
            first_name: n.first_name,
            last_name: n.last_name,
            email: n.email,
            budget_range: n.budget_range,
            preferred_location: n.preferred_location,
            message: n.message,
            status: n.status,
            priority: n.priority,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

/// Admin edit; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = inquiries)]
pub struct InquiryPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub budget_range: Option<String>,
    pub preferred_location: Option<String>,
    pub message: Option<String>,
    pub status: Option<InquiryStatus>,
    pub priority: Option<Priority>,
}

impl InquiryPatch {
    pub fn status(status: InquiryStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(v) = &self.first_name {
            errors.require_len("first_name", v, 2, "First name must be at least 2 characters");
        }
        if let Some(v) = &self.last_name {
            errors.require_len("last_name", v, 2, "Last name must be at least 2 characters");
        }
        if let Some(v) = &self.email {
            errors.require_email("email", v);
        }
        errors.into_result(self)
    }
}

/// Dashboard listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InquiryQuery {
    pub search: Option<String>,
    pub status: Option<InquiryStatus>,
    pub priority: Option<Priority>,
}

impl InquiryQuery {
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn matches(&self, inquiry: &Inquiry) -> bool {
        self.status.map_or(true, |s| inquiry.status == s)
            && self.priority.map_or(true, |p| inquiry.priority == p)
            && self.search_term().map_or(true, |t| inquiry.matches_search(t))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InquiryStats {
    pub total_inquiries: usize,
    pub new_inquiries: usize,
    pub contacted_inquiries: usize,
    pub closed_inquiries: usize,
    pub today_inquiries: usize,
    pub week_inquiries: usize,
    pub month_inquiries: usize,
}

impl InquiryStats {
    /// Windows start at UTC midnight of today, 7 days ago and 30 days ago.
    pub fn tally<I>(activity: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (InquiryStatus, DateTime<Utc>)>,
    {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or(now);
        let week = midnight - Duration::days(7);
        let month = midnight - Duration::days(30);

        let mut stats = Self::default();
        for (status, created_at) in activity {
            stats.total_inquiries += 1;
            match status {
                InquiryStatus::New => stats.new_inquiries += 1,
                InquiryStatus::Contacted => stats.contacted_inquiries += 1,
                InquiryStatus::Closed => stats.closed_inquiries += 1,
            }
            if created_at >= midnight {
                stats.today_inquiries += 1;
            }
            if created_at >= week {
                stats.week_inquiries += 1;
            }
            if created_at >= month {
                stats.month_inquiries += 1;
            }
        }
        stats
    }
}

/// Reply composed in the dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailForm {
    pub subject: String,
    pub message: String,
}

impl EmailForm {
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require_len("subject", &self.subject, 1, "Subject is required");
        errors.require_len("message", &self.message, 1, "Message is required");
        errors.into_result(self)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = email_logs)]
pub struct NewEmailLog {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub subject: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn form() -> InquiryForm {
        InquiryForm {
            first_name: "Ada".into(),
            last_name: "Lovel".into(),
            email: "ada@example.com".into(),
            budget_range: "£500k-£750k".into(),
            preferred_location: "Lake District".into(),
            message: "Looking for a farmhouse with land.".into(),
        }
    }

    #[test]
    fn contact_form_defaults_to_new_medium() {
        let created = form().validate(Utc::now()).unwrap();
        assert_eq!(created.status, InquiryStatus::New);
        assert_eq!(created.priority, Priority::Medium);
    }

    #[test]
    fn contact_form_rejects_short_message_and_bad_email() {
        let mut f = form();
        f.message = "hi there".into();
        f.email = "nope".into();
        f.first_name = " A ".into();
        let errors = f.validate(Utc::now()).unwrap_err();
        assert_eq!(
            errors.get("message"),
            Some("Please provide more details (at least 10 characters)")
        );
        assert!(errors.get("email").is_some());
        assert!(errors.get("first_name").is_some());
        assert!(errors.get("last_name").is_none());
    }

    #[test]
    fn tally_counts_windows() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let stats = InquiryStats::tally(
            [
                (InquiryStatus::New, now - Duration::hours(1)),
                (InquiryStatus::Contacted, now - Duration::days(3)),
                (InquiryStatus::Closed, now - Duration::days(20)),
                (InquiryStatus::New, now - Duration::days(90)),
            ],
            now,
        );
        assert_eq!(stats.total_inquiries, 4);
        assert_eq!(stats.new_inquiries, 2);
        assert_eq!(stats.contacted_inquiries, 1);
        assert_eq!(stats.closed_inquiries, 1);
        assert_eq!(stats.today_inquiries, 1);
        assert_eq!(stats.week_inquiries, 2);
        assert_eq!(stats.month_inquiries, 3);
    }

    #[test]
    fn email_needs_subject_and_message() {
        let errors = EmailForm {
            subject: " ".into(),
            message: String::new(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("subject"), Some("Subject is required"));
        assert_eq!(errors.get("message"), Some("Message is required"));
    }

    #[test]
    fn query_combines_filters() {
        let inquiry: Inquiry = form().validate(Utc::now()).unwrap().into();
        let mut q = InquiryQuery {
            search: Some("LAKE".into()),
            ..Default::default()
        };
        assert!(q.matches(&inquiry));
        q.status = Some(InquiryStatus::Closed);
        assert!(!q.matches(&inquiry));
    }
}
