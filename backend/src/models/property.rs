use chrono::{DateTime, Datelike, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::properties;
use crate::validation::ValidationErrors;

/// Shown when a listing has no photographs yet.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder-property.jpg";

text_enum! {
    pub enum PropertyType {
        Farmhouse => "Farmhouse",
        Cottage => "Cottage",
        CountryHouse => "Country House",
        BarnConversion => "Barn Conversion",
        Cabin => "Cabin",
        DetachedHouse => "Detached House",
    }
}

text_enum! {
    /// Protected landscapes the brokerage lists in.
    pub enum Location {
        LakeDistrict => "Lake District",
        YorkshireDales => "Yorkshire Dales",
        PeakDistrict => "Peak District",
        Cotswolds => "Cotswolds AONB",
        NewForest => "New Forest",
        Snowdonia => "Snowdonia National Park",
    }
}

text_enum! {
    pub enum PropertyStatus {
        Available => "available",
        Pending => "pending",
        Sold => "sold",
    }
}

impl Default for PropertyStatus {
    fn default() -> Self {
        PropertyStatus::Available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = properties, check_for_backend(diesel::pg::Pg))]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub location: Option<Location>,
    pub property_type: Option<PropertyType>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub square_feet: Option<i32>,
    pub year_built: Option<i32>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub features: Vec<String>,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn cover_image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or(PLACEHOLDER_IMAGE)
    }

    /// Second photograph, falling back to the cover.
    pub fn hover_image(&self) -> &str {
        self.images
            .get(1)
            .map(String::as_str)
            .unwrap_or_else(|| self.cover_image())
    }

    /// Builds a record from a draft; ids and timestamps are owned by the store.
    pub fn from_draft(id: Uuid, draft: PropertyDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            location: draft.location,
            property_type: draft.property_type,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            square_feet: draft.square_feet,
            year_built: draft.year_built,
            images: draft.images,
            features: draft.features,
            status: draft.status,
            featured: draft.featured,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every editable field, keeping identity and `created_at`.
    pub fn apply_draft(&mut self, draft: PropertyDraft, now: DateTime<Utc>) {
        let id = self.id;
        let created_at = self.created_at;
        *self = Property::from_draft(id, draft, created_at);
        self.updated_at = now;
    }
}

/// Editable fields of a listing, used for both create and full update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Insertable, AsChangeset)]
#[diesel(table_name = properties, treat_none_as_null = true)]
pub struct PropertyDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default)]
    pub square_feet: Option<i32>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub features: Vec<String>,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub featured: bool,
}

impl PropertyDraft {
    pub fn validate(mut self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            errors.add("title", "Title is required");
        }
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        if self.price.is_some_and(|p| p < 0) {
            errors.add("price", "Price cannot be negative");
        }
        for (field, value) in [
            ("bedrooms", self.bedrooms),
            ("bathrooms", self.bathrooms),
            ("square_feet", self.square_feet),
        ] {
            if value.is_some_and(|v| v < 0) {
                errors.add(field, "Must not be negative");
            }
        }
        let latest = Utc::now().year() + 5;
        if self.year_built.is_some_and(|y| !(1000..=latest).contains(&y)) {
            errors.add("year_built", format!("Year built must be between 1000 and {}", latest));
        }

        errors.into_result(self)
    }
}

impl From<&Property> for PropertyDraft {
    fn from(p: &Property) -> Self {
        Self {
            title: p.title.clone(),
            description: p.description.clone(),
            price: p.price,
            location: p.location,
            property_type: p.property_type,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            square_feet: p.square_feet,
            year_built: p.year_built,
            images: p.images.clone(),
            features: p.features.clone(),
            status: p.status,
            featured: p.featured,
        }
    }
}
