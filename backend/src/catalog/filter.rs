use serde::{Deserialize, Serialize};

use crate::models::{Property, PropertyStatus, PropertyType};

/// Visitor-facing catalog filter. Every field is optional and unset fields
/// impose no constraint; `status` falls back to `available`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyFilter {
    pub location: Option<String>,
    pub property_type: Option<PropertyType>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_bedrooms: Option<i32>,
    pub max_bedrooms: Option<i32>,
    pub featured: Option<bool>,
    pub status: Option<PropertyStatus>,
}

impl PropertyFilter {
    pub fn featured() -> Self {
        Self {
            featured: Some(true),
            ..Default::default()
        }
    }

    pub fn with_status(status: PropertyStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Conjunction of one constraint per set field. Bounds are not checked
    /// against each other; an impossible range simply matches nothing.
    pub fn predicate(&self) -> Predicate {
        self.build(Some(self.status.unwrap_or_default()))
    }

    /// Like [`predicate`](Self::predicate) but without the `available`
    /// fallback, for the dashboard which lists every status.
    pub fn predicate_any_status(&self) -> Predicate {
        self.build(self.status)
    }

    fn build(&self, status: Option<PropertyStatus>) -> Predicate {
        let mut constraints = Vec::new();

        if let Some(location) = self.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            constraints.push(Constraint::LocationContains(location.to_string()));
        }
        if let Some(t) = self.property_type {
            constraints.push(Constraint::TypeIs(t));
        }
        if let Some(p) = self.min_price {
            constraints.push(Constraint::PriceAtLeast(p));
        }
        if let Some(p) = self.max_price {
            constraints.push(Constraint::PriceAtMost(p));
        }
        if let Some(b) = self.min_bedrooms {
            constraints.push(Constraint::BedroomsAtLeast(b));
        }
        if let Some(b) = self.max_bedrooms {
            constraints.push(Constraint::BedroomsAtMost(b));
        }
        if let Some(f) = self.featured {
            constraints.push(Constraint::Featured(f));
        }
        if let Some(s) = status {
            constraints.push(Constraint::StatusIs(s));
        }

        Predicate { constraints }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Case-insensitive substring of the location label.
    LocationContains(String),
    TypeIs(PropertyType),
    PriceAtLeast(i64),
    PriceAtMost(i64),
    BedroomsAtLeast(i32),
    BedroomsAtMost(i32),
    Featured(bool),
    StatusIs(PropertyStatus),
}

impl Constraint {
    pub fn matches(&self, p: &Property) -> bool {
        match self {
            Constraint::LocationContains(needle) => p
                .location
                .is_some_and(|l| l.as_str().to_lowercase().contains(&needle.to_lowercase())),
            Constraint::TypeIs(t) => p.property_type == Some(*t),
            Constraint::PriceAtLeast(min) => p.price.is_some_and(|v| v >= *min),
            Constraint::PriceAtMost(max) => p.price.is_some_and(|v| v <= *max),
            Constraint::BedroomsAtLeast(min) => p.bedrooms.is_some_and(|v| v >= *min),
            Constraint::BedroomsAtMost(max) => p.bedrooms.is_some_and(|v| v <= *max),
            Constraint::Featured(f) => p.featured == *f,
            Constraint::StatusIs(s) => p.status == *s,
        }
    }

    /// Column and operator in PostgREST's horizontal filtering syntax.
    pub fn query_pair(&self) -> (&'static str, String) {
        match self {
            Constraint::LocationContains(needle) => {
                // PostgREST rewrites every `*` to `%`, so an escaped `*` stays literal.
                let escaped = escape_like(needle).replace('*', "\\*");
                ("location", format!("ilike.*{}*", escaped))
            }
            Constraint::TypeIs(t) => ("property_type", format!("eq.{}", t)),
            Constraint::PriceAtLeast(v) => ("price", format!("gte.{}", v)),
            Constraint::PriceAtMost(v) => ("price", format!("lte.{}", v)),
            Constraint::BedroomsAtLeast(v) => ("bedrooms", format!("gte.{}", v)),
            Constraint::BedroomsAtMost(v) => ("bedrooms", format!("lte.{}", v)),
            Constraint::Featured(f) => ("featured", format!("eq.{}", f)),
            Constraint::StatusIs(s) => ("status", format!("eq.{}", s)),
        }
    }
}

/// Backslash-escapes LIKE wildcards so user text matches literally.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `ILIKE` pattern for a case-insensitive substring search.
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like(needle))
}

/// Built query condition, shared by every store backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    constraints: Vec<Constraint>,
}

impl Predicate {
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn matches(&self, property: &Property) -> bool {
        self.constraints.iter().all(|c| c.matches(property))
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.constraints.iter().map(Constraint::query_pair).collect()
    }
}
