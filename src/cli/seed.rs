use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::database::models::{NewBootcamp, NewCourse, NewUser};
use crate::database::Store;
use crate::policy::{authorize_creation, Decision, Principal};

/// Bootcamp record in `bootcamps.json`; `owner` is the owner's email
#[derive(Debug, Deserialize)]
struct SeedBootcamp {
    owner: String,
    #[serde(flatten)]
    bootcamp: NewBootcamp,
}

/// Course record in `courses.json`; `bootcamp` is the bootcamp's name
#[derive(Debug, Deserialize)]
struct SeedCourse {
    bootcamp: String,
    #[serde(flatten)]
    course: NewCourse,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
}

/// Load the sample data set through the store. Ownership rules apply exactly
/// as they do over HTTP, so a data set giving a user two bootcamps is rejected.
pub async fn import<S: Store + ?Sized>(store: &S, dir: &Path) -> anyhow::Result<ImportSummary> {
    let users: Vec<NewUser> = read_json(&dir.join("users.json"))?;
    let bootcamps: Vec<SeedBootcamp> = read_json(&dir.join("bootcamps.json"))?;
    let courses: Vec<SeedCourse> = read_json(&dir.join("courses.json"))?;
    let mut summary = ImportSummary::default();

    let mut principals: HashMap<String, Principal> = HashMap::new();
    for input in users {
        input.validate().with_context(|| format!("user {}", input.email))?;
        let password_hash = hash_password(&input.password)?;
        let user = store
            .create_user(input.into_user(Uuid::new_v4(), password_hash, Utc::now()))
            .await?;
        principals.insert(user.email.clone(), user.principal());
        summary.users += 1;
    }

    let mut bootcamp_ids: HashMap<String, (Uuid, Uuid)> = HashMap::new();
    for SeedBootcamp { owner, bootcamp } in bootcamps {
        let principal = principals
            .get(&owner.trim().to_lowercase())
            .ok_or_else(|| anyhow!("bootcamp '{}' names unknown owner {}", bootcamp.name, owner))?;
        bootcamp.validate().with_context(|| format!("bootcamp '{}'", bootcamp.name))?;

        let existing = store.find_bootcamp_by_owner(principal.id).await?;
        if let Decision::Deny { reason } = authorize_creation(principal, existing.as_ref()) {
            bail!("bootcamp '{}' rejected: {}", bootcamp.name, reason);
        }

        let created = store.create_bootcamp(principal.id, bootcamp).await?;
        bootcamp_ids.insert(created.name.clone(), (created.id, principal.id));
        summary.bootcamps += 1;
    }

    for SeedCourse { bootcamp, course } in courses {
        let &(bootcamp_id, owner_id) = bootcamp_ids
            .get(bootcamp.trim())
            .ok_or_else(|| anyhow!("course '{}' names unknown bootcamp '{}'", course.title, bootcamp))?;
        course.validate().with_context(|| format!("course '{}'", course.title))?;

        store.create_course(bootcamp_id, owner_id, course).await?;
        summary.courses += 1;
    }

    info!("Seeded {:?} from {}", summary, dir.display());
    Ok(summary)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
