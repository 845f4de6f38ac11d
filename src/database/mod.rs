pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{ListQuery, Page};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use models::{
    Bootcamp, BootcampFilter, BootcampPatch, Course, CourseFilter, CoursePatch, NewBootcamp, NewCourse, User,
    UserFilter, UserPatch,
};

/// Errors from the resource stores
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    /// A unique constraint was violated; carries the offending field
    #[error("Duplicate value for field '{0}'")]
    Duplicate(String),

    /// A referenced record does not exist; carries the referencing field
    #[error("Referenced record missing for field '{0}'")]
    MissingReference(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait BootcampStore: Send + Sync {
    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, DatabaseError>;

    /// The bootcamp (if any) owned by `owner_id`; oldest first when an admin owns several
    async fn find_bootcamp_by_owner(&self, owner_id: Uuid) -> Result<Option<Bootcamp>, DatabaseError>;

    async fn list_bootcamps(&self, query: &ListQuery<BootcampFilter>) -> Result<Page<Bootcamp>, DatabaseError>;

    async fn create_bootcamp(&self, owner_id: Uuid, input: NewBootcamp) -> Result<Bootcamp, DatabaseError>;

    /// `None` when the bootcamp no longer exists
    async fn update_bootcamp(&self, id: Uuid, patch: BootcampPatch) -> Result<Option<Bootcamp>, DatabaseError>;

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<Option<Bootcamp>, DatabaseError>;

    /// Removes the bootcamp and its courses. `false` when nothing was deleted.
    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

/// Course writes also refresh the parent bootcamp's average cost
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, DatabaseError>;

    async fn list_courses(&self, query: &ListQuery<CourseFilter>) -> Result<Page<Course>, DatabaseError>;

    async fn create_course(&self, bootcamp_id: Uuid, user_id: Uuid, input: NewCourse)
        -> Result<Course, DatabaseError>;

    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> Result<Option<Course>, DatabaseError>;

    async fn delete_course(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn list_users(&self, query: &ListQuery<UserFilter>) -> Result<Page<User>, DatabaseError>;

    /// Persist a fully built user (password already hashed)
    async fn create_user(&self, user: User) -> Result<User, DatabaseError>;

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, DatabaseError>;

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<bool, DatabaseError>;

    /// Bootcamps owned by the user keep existing with an empty owner
    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

/// Everything the handlers need from persistence
#[async_trait]
pub trait Store: BootcampStore + CourseStore + UserStore {
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Remove every record (seeder `destroy`)
    async fn purge(&self) -> Result<(), DatabaseError>;
}

pub type SharedStore = Arc<dyn Store>;
