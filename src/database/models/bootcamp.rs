use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{is_email, is_url, ValidationError};
use crate::policy::OwnedResource;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

pub const CAREERS: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bootcamp {
    pub id: Uuid,
    /// Owning user; empty once that user has been removed
    #[serde(rename = "user")]
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Vec<String>,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub photo: String,
    pub average_cost: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl OwnedResource for Bootcamp {
    fn resource_id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }
}

/// Create payload. The owner never comes from the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewBootcamp {
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Vec<String>,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
}

impl NewBootcamp {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        check_name(&mut errors, &self.name);
        check_description(&mut errors, &self.description);
        check_contact(&mut errors, self.website.as_deref(), self.phone.as_deref(), self.email.as_deref());
        check_careers(&mut errors, &self.careers);
        errors.into_result()
    }

    pub fn into_bootcamp(self, id: Uuid, owner_id: Uuid, created_at: DateTime<Utc>) -> Bootcamp {
        Bootcamp {
            id,
            owner_id: Some(owner_id),
            slug: slugify(&self.name),
            name: self.name.trim().to_string(),
            description: self.description,
            website: self.website,
            phone: self.phone,
            email: self.email,
            address: self.address,
            careers: self.careers,
            housing: self.housing,
            job_assistance: self.job_assistance,
            job_guarantee: self.job_guarantee,
            accept_gi: self.accept_gi,
            photo: DEFAULT_PHOTO.to_string(),
            average_cost: None,
            created_at,
        }
    }
}

/// Update payload. Ownership, photo and derived fields are not part of it, so
/// a body carrying `user` cannot reassign the bootcamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootcampPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl BootcampPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(description) = &self.description {
            check_description(&mut errors, description);
        }
        check_contact(&mut errors, self.website.as_deref(), self.phone.as_deref(), self.email.as_deref());
        if let Some(careers) = &self.careers {
            check_careers(&mut errors, careers);
        }
        errors.into_result()
    }

    /// Apply to an in-memory bootcamp, keeping the slug in step with the name
    pub fn apply(self, bootcamp: &mut Bootcamp) {
        if let Some(name) = self.name {
            bootcamp.slug = slugify(&name);
            bootcamp.name = name.trim().to_string();
        }
        if let Some(v) = self.description {
            bootcamp.description = v;
        }
        if let Some(v) = self.website {
            bootcamp.website = Some(v);
        }
        if let Some(v) = self.phone {
            bootcamp.phone = Some(v);
        }
        if let Some(v) = self.email {
            bootcamp.email = Some(v);
        }
        if let Some(v) = self.address {
            bootcamp.address = Some(v);
        }
        if let Some(v) = self.careers {
            bootcamp.careers = v;
        }
        if let Some(v) = self.housing {
            bootcamp.housing = v;
        }
        if let Some(v) = self.job_assistance {
            bootcamp.job_assistance = v;
        }
        if let Some(v) = self.job_guarantee {
            bootcamp.job_guarantee = v;
        }
        if let Some(v) = self.accept_gi {
            bootcamp.accept_gi = v;
        }
    }
}

/// Exact-match filters accepted by the bootcamp list endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootcampFilter {
    pub name: Option<String>,
    /// Matches when the bootcamp offers this career
    pub careers: Option<String>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
    pub owner_id: Option<Uuid>,
}

impl BootcampFilter {
    pub fn matches(&self, bootcamp: &Bootcamp) -> bool {
        self.name.as_ref().map_or(true, |n| &bootcamp.name == n)
            && self.careers.as_ref().map_or(true, |c| bootcamp.careers.contains(c))
            && self.housing.map_or(true, |v| bootcamp.housing == v)
            && self.job_assistance.map_or(true, |v| bootcamp.job_assistance == v)
            && self.job_guarantee.map_or(true, |v| bootcamp.job_guarantee == v)
            && self.accept_gi.map_or(true, |v| bootcamp.accept_gi == v)
            && self.owner_id.map_or(true, |v| bootcamp.owner_id == Some(v))
    }
}

/// Lowercase, ASCII alphanumerics separated by single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn check_name(errors: &mut ValidationError, name: &str) {
    let name = name.trim();
    if name.is_empty() {
        errors.add("name", "Please add a name");
    } else if name.chars().count() > 50 {
        errors.add("name", "Name can not be more than 50 characters");
    }
}

fn check_description(errors: &mut ValidationError, description: &str) {
    if description.trim().is_empty() {
        errors.add("description", "Please add a description");
    } else if description.chars().count() > 500 {
        errors.add("description", "Description can not be more than 500 characters");
    }
}

fn check_contact(errors: &mut ValidationError, website: Option<&str>, phone: Option<&str>, email: Option<&str>) {
    if website.is_some_and(|w| !is_url(w)) {
        errors.add("website", "Please use a valid URL with HTTP or HTTPS");
    }
    if phone.is_some_and(|p| p.chars().count() > 20) {
        errors.add("phone", "Phone number can not be longer than 20 characters");
    }
    if email.is_some_and(|e| !is_email(e)) {
        errors.add("email", "Please add a valid email");
    }
}

fn check_careers(errors: &mut ValidationError, careers: &[String]) {
    if careers.is_empty() {
        errors.add("careers", "Please add at least one career");
    } else if let Some(unknown) = careers.iter().find(|c| !CAREERS.contains(&c.as_str())) {
        errors.add("careers", format!("'{}' is not a supported career", unknown));
    }
}
