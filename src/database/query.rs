use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::models::{BootcampFilter, CourseFilter, Skill, UserFilter};
use crate::policy::Role;

pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 100;

/// Query parameters that drive paging and projection rather than filtering
const RESERVED: &[&str] = &["select", "sort", "page", "limit"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Invalid value '{value}' for query parameter '{param}'")]
    InvalidValue { param: String, value: String },

    #[error("Cannot sort by '{0}'")]
    UnsortableField(String),

    #[error("Unknown query parameter '{0}'")]
    UnknownParameter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Always one of the whitelisted column names, safe to splice into SQL
    pub field: &'static str,
    pub descending: bool,
}

/// Paging, ordering, projection and filtering for a list endpoint
#[derive(Debug, Clone)]
pub struct ListQuery<F> {
    pub filter: F,
    pub sort: Vec<SortKey>,
    pub page: u32,
    pub limit: u32,
    pub select: Option<Vec<String>>,
}

impl<F: Default> Default for ListQuery<F> {
    fn default() -> Self {
        Self {
            filter: F::default(),
            sort: vec![SortKey { field: "created_at", descending: true }],
            page: 1,
            limit: DEFAULT_LIMIT,
            select: None,
        }
    }
}

/// Filters that can be built from raw query parameters
pub trait FilterParams: Sized + Default {
    /// Column names the list may be ordered by
    const SORTABLE: &'static [&'static str];
    /// Parameter names this filter consumes
    const FIELDS: &'static [&'static str];

    fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryError>;
}

impl<F: FilterParams> ListQuery<F> {
    pub fn parse(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        if let Some(unknown) = params
            .keys()
            .find(|k| !RESERVED.contains(&k.as_str()) && !F::FIELDS.contains(&k.as_str()))
        {
            return Err(QueryError::UnknownParameter(unknown.clone()));
        }

        let mut query = Self {
            filter: F::from_params(params)?,
            ..Self::default()
        };

        if let Some(sort) = params.get("sort") {
            query.sort = parse_sort(sort, F::SORTABLE)?;
        }
        if let Some(page) = params.get("page") {
            query.page = parse_positive(page, "page")?;
        }
        if let Some(limit) = params.get("limit") {
            query.limit = parse_positive(limit, "limit")?.min(MAX_LIMIT);
        }
        if let Some(select) = params.get("select") {
            let fields: Vec<String> = select
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !fields.is_empty() {
                query.select = Some(fields);
            }
        }

        Ok(query)
    }
}

impl<F> ListQuery<F> {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of results plus the size of the whole filtered set
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl<T> Page<T> {
    pub fn pagination<F>(&self, query: &ListQuery<F>) -> Pagination {
        let end = query.offset() + u64::from(query.limit);
        Pagination {
            next: query
                .page
                .checked_add(1)
                .filter(|_| end < self.total)
                .map(|page| PageRef { page, limit: query.limit }),
            prev: query
                .page
                .checked_sub(1)
                .filter(|page| *page > 0)
                .map(|page| PageRef { page, limit: query.limit }),
        }
    }
}

/// Order, filter and slice an in-memory collection the way the SQL store does
pub fn paginate<T: Serialize, F>(items: Vec<T>, query: &ListQuery<F>) -> Page<T> {
    let total = items.len() as u64;
    let items = sort_records(items, &query.sort)
        .into_iter()
        .skip(query.offset() as usize)
        .take(query.limit as usize)
        .collect();
    Page { items, total }
}

pub fn sort_records<T: Serialize>(items: Vec<T>, keys: &[SortKey]) -> Vec<T> {
    let mut keyed: Vec<(Value, T)> = items
        .into_iter()
        .map(|item| (serde_json::to_value(&item).unwrap_or(Value::Null), item))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        keys.iter()
            .map(|key| {
                let ord = compare_values(&a[key.field], &b[key.field]);
                if key.descending { ord.reverse() } else { ord }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    keyed.into_iter().map(|(_, item)| item).collect()
}

/// Nulls sort last, like Postgres ascending order
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn parse_sort(raw: &str, sortable: &'static [&'static str]) -> Result<Vec<SortKey>, QueryError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|part| {
            let (name, descending) = match part.strip_prefix('-') {
                Some(name) => (name, true),
                None => (part, false),
            };
            sortable
                .iter()
                .copied()
                .find(|f| *f == name)
                .map(|field| SortKey { field, descending })
                .ok_or_else(|| QueryError::UnsortableField(name.to_string()))
        })
        .collect()
}

fn parse_positive(raw: &str, param: &str) -> Result<u32, QueryError> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(param, raw)),
    }
}

fn invalid(param: &str, value: &str) -> QueryError {
    QueryError::InvalidValue {
        param: param.to_string(),
        value: value.to_string(),
    }
}

fn parsed<T: FromStr>(params: &HashMap<String, String>, key: &str) -> Result<Option<T>, QueryError> {
    params
        .get(key)
        .map(|raw| raw.parse::<T>().map_err(|_| invalid(key, raw)))
        .transpose()
}

impl FilterParams for BootcampFilter {
    const SORTABLE: &'static [&'static str] = &["name", "average_cost", "created_at"];
    const FIELDS: &'static [&'static str] = &[
        "name",
        "careers",
        "housing",
        "job_assistance",
        "job_guarantee",
        "accept_gi",
        "user",
    ];

    fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        Ok(Self {
            name: params.get("name").cloned(),
            careers: params.get("careers").cloned(),
            housing: parsed(params, "housing")?,
            job_assistance: parsed(params, "job_assistance")?,
            job_guarantee: parsed(params, "job_guarantee")?,
            accept_gi: parsed(params, "accept_gi")?,
            owner_id: parsed::<Uuid>(params, "user")?,
        })
    }
}

impl FilterParams for CourseFilter {
    const SORTABLE: &'static [&'static str] = &["title", "tuition", "weeks", "created_at"];
    const FIELDS: &'static [&'static str] = &["bootcamp", "minimum_skill", "scholarship_available"];

    fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        Ok(Self {
            bootcamp_id: parsed::<Uuid>(params, "bootcamp")?,
            minimum_skill: parsed::<Skill>(params, "minimum_skill")?,
            scholarship_available: parsed(params, "scholarship_available")?,
        })
    }
}

impl FilterParams for UserFilter {
    const SORTABLE: &'static [&'static str] = &["name", "email", "created_at"];
    const FIELDS: &'static [&'static str] = &["role", "email"];

    fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        Ok(Self {
            role: parsed::<Role>(params, "role")?,
            email: params.get("email").cloned(),
        })
    }
}
