use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    course::average_cost, user::normalize_email, Bootcamp, BootcampFilter, BootcampPatch, Course, CourseFilter,
    CoursePatch, NewBootcamp, NewCourse, User, UserFilter, UserPatch,
};
use super::query::{paginate, ListQuery, Page};
use super::{BootcampStore, CourseStore, DatabaseError, Store, UserStore};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    bootcamps: HashMap<Uuid, Bootcamp>,
    courses: HashMap<Uuid, Course>,
}

impl Collections {
    fn ensure_unique_bootcamp_name(&self, name: &str, except: Option<Uuid>) -> Result<(), DatabaseError> {
        let taken = self
            .bootcamps
            .values()
            .any(|b| Some(b.id) != except && b.name.eq_ignore_ascii_case(name.trim()));
        if taken {
            return Err(DatabaseError::Duplicate("name".to_string()));
        }
        Ok(())
    }

    fn ensure_unique_email(&self, email: &str, except: Option<Uuid>) -> Result<(), DatabaseError> {
        let email = normalize_email(email);
        if self.users.values().any(|u| Some(u.id) != except && u.email == email) {
            return Err(DatabaseError::Duplicate("email".to_string()));
        }
        Ok(())
    }

    fn refresh_average_cost(&mut self, bootcamp_id: Uuid) {
        let tuitions: Vec<i32> = self
            .courses
            .values()
            .filter(|c| c.bootcamp_id == bootcamp_id)
            .map(|c| c.tuition)
            .collect();
        if let Some(bootcamp) = self.bootcamps.get_mut(&bootcamp_id) {
            bootcamp.average_cost = average_cost(&tuitions);
        }
    }
}

/// Process-local store with the same semantics as the Postgres schema
/// (unique names and emails, cascading course deletes, owners nulled when a
/// user is removed). Backs the test suite and database-less local runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BootcampStore for MemoryStore {
    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, DatabaseError> {
        Ok(self.data.read().await.bootcamps.get(&id).cloned())
    }

    async fn find_bootcamp_by_owner(&self, owner_id: Uuid) -> Result<Option<Bootcamp>, DatabaseError> {
        let data = self.data.read().await;
        Ok(data
            .bootcamps
            .values()
            .filter(|b| b.owner_id == Some(owner_id))
            .min_by_key(|b| b.created_at)
            .cloned())
    }

    async fn list_bootcamps(&self, query: &ListQuery<BootcampFilter>) -> Result<Page<Bootcamp>, DatabaseError> {
        let data = self.data.read().await;
        let matching = data.bootcamps.values().filter(|b| query.filter.matches(b)).cloned().collect();
        Ok(paginate(matching, query))
    }

    async fn create_bootcamp(&self, owner_id: Uuid, input: NewBootcamp) -> Result<Bootcamp, DatabaseError> {
        let mut data = self.data.write().await;
        data.ensure_unique_bootcamp_name(&input.name, None)?;
        if !data.users.contains_key(&owner_id) {
            return Err(DatabaseError::MissingReference("user".to_string()));
        }

        let bootcamp = input.into_bootcamp(Uuid::new_v4(), owner_id, Utc::now());
        data.bootcamps.insert(bootcamp.id, bootcamp.clone());
        Ok(bootcamp)
    }

    async fn update_bootcamp(&self, id: Uuid, patch: BootcampPatch) -> Result<Option<Bootcamp>, DatabaseError> {
        let mut data = self.data.write().await;
        if let Some(name) = &patch.name {
            data.ensure_unique_bootcamp_name(name, Some(id))?;
        }
        Ok(data.bootcamps.get_mut(&id).map(|bootcamp| {
            patch.apply(bootcamp);
            bootcamp.clone()
        }))
    }

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<Option<Bootcamp>, DatabaseError> {
        let mut data = self.data.write().await;
        Ok(data.bootcamps.get_mut(&id).map(|bootcamp| {
            bootcamp.photo = photo.to_string();
            bootcamp.clone()
        }))
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut data = self.data.write().await;
        if data.bootcamps.remove(&id).is_none() {
            return Ok(false);
        }
        data.courses.retain(|_, c| c.bootcamp_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, DatabaseError> {
        Ok(self.data.read().await.courses.get(&id).cloned())
    }

    async fn list_courses(&self, query: &ListQuery<CourseFilter>) -> Result<Page<Course>, DatabaseError> {
        let data = self.data.read().await;
        let matching = data.courses.values().filter(|c| query.filter.matches(c)).cloned().collect();
        Ok(paginate(matching, query))
    }

    async fn create_course(
        &self,
        bootcamp_id: Uuid,
        user_id: Uuid,
        input: NewCourse,
    ) -> Result<Course, DatabaseError> {
        let mut data = self.data.write().await;
        if !data.bootcamps.contains_key(&bootcamp_id) {
            return Err(DatabaseError::MissingReference("bootcamp".to_string()));
        }

        let course = input.into_course(Uuid::new_v4(), bootcamp_id, user_id, Utc::now());
        data.courses.insert(course.id, course.clone());
        data.refresh_average_cost(bootcamp_id);
        Ok(course)
    }

    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> Result<Option<Course>, DatabaseError> {
        let mut data = self.data.write().await;
        let Some(course) = data.courses.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(course);
        let course = course.clone();
        data.refresh_average_cost(course.bootcamp_id);
        Ok(Some(course))
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut data = self.data.write().await;
        let Some(course) = data.courses.remove(&id) else {
            return Ok(false);
        };
        data.refresh_average_cost(course.bootcamp_id);
        Ok(true)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.data.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let email = normalize_email(email);
        let data = self.data.read().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, query: &ListQuery<UserFilter>) -> Result<Page<User>, DatabaseError> {
        let data = self.data.read().await;
        let matching = data.users.values().filter(|u| query.filter.matches(u)).cloned().collect();
        Ok(paginate(matching, query))
    }

    async fn create_user(&self, user: User) -> Result<User, DatabaseError> {
        let mut data = self.data.write().await;
        data.ensure_unique_email(&user.email, None)?;
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, DatabaseError> {
        let mut data = self.data.write().await;
        if let Some(email) = &patch.email {
            data.ensure_unique_email(email, Some(id))?;
        }
        Ok(data.users.get_mut(&id).map(|user| {
            patch.apply(user);
            user.clone()
        }))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<bool, DatabaseError> {
        let mut data = self.data.write().await;
        Ok(data
            .users
            .get_mut(&id)
            .map(|user| user.password_hash = password_hash.to_string())
            .is_some())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut data = self.data.write().await;
        if data.users.remove(&id).is_none() {
            return Ok(false);
        }
        for bootcamp in data.bootcamps.values_mut().filter(|b| b.owner_id == Some(id)) {
            bootcamp.owner_id = None;
        }
        for course in data.courses.values_mut().filter(|c| c.user_id == Some(id)) {
            course.user_id = None;
        }
        Ok(true)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn purge(&self) -> Result<(), DatabaseError> {
        *self.data.write().await = Collections::default();
        Ok(())
    }
}
