pub mod bootcamp;
pub mod course;
pub mod user;

pub use bootcamp::{Bootcamp, BootcampFilter, BootcampPatch, NewBootcamp};
pub use course::{Course, CourseFilter, CoursePatch, NewCourse, Skill};
pub use user::{NewUser, User, UserFilter, UserPatch};

use std::collections::HashMap;
use url::{Host, Url};

/// Field-level validation failures collected from an input payload
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("Invalid input: {}", summary(.field_errors))]
pub struct ValidationError {
    pub field_errors: HashMap<String, String>,
}

impl ValidationError {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.field_errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn summary(field_errors: &HashMap<String, String>) -> String {
    let mut messages: Vec<&str> = field_errors.values().map(String::as_str).collect();
    messages.sort_unstable();
    messages.join(", ")
}

pub(crate) fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

/// Absolute http(s) URL whose host is an IP or a dotted domain
pub(crate) fn is_url(value: &str) -> bool {
    let Ok(url) = Url::parse(value) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host() {
        Some(Host::Domain(domain)) => domain.contains('.') && domain.split('.').all(|label| !label.is_empty()),
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => true,
        None => false,
    }
}
