use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::models::{
    bootcamp::slugify, Bootcamp, BootcampFilter, BootcampPatch, Course, CourseFilter, CoursePatch, NewBootcamp,
    NewCourse, User, UserFilter, UserPatch,
};
use super::query::{ListQuery, Page, SortKey};
use super::{BootcampStore, CourseStore, DatabaseError, Store, UserStore};
use crate::config::DatabaseConfig;

const BOOTCAMP_COLUMNS: &str = "id, owner_id, name, slug, description, website, phone, email, address, careers, \
     housing, job_assistance, job_guarantee, accept_gi, photo, average_cost, created_at";

const COURSE_COLUMNS: &str = "id, bootcamp_id, user_id, title, description, weeks, tuition, minimum_skill, \
     scholarship_available, created_at";

const USER_COLUMNS: &str = "id, name, email, role, password_hash, created_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Connected database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Translate constraint violations into store-level errors
fn map_write_error(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        let field = constraint_field(db_err.constraint().unwrap_or_default());
        if db_err.is_unique_violation() {
            return DatabaseError::Duplicate(field);
        }
        if db_err.is_foreign_key_violation() {
            return DatabaseError::MissingReference(field);
        }
    }
    DatabaseError::Sqlx(err)
}

/// `bootcamps_name_key` -> `name`, `courses_bootcamp_id_fkey` -> `bootcamp`
fn constraint_field(constraint: &str) -> String {
    let trimmed = constraint
        .trim_end_matches("_key")
        .trim_end_matches("_fkey")
        .trim_end_matches("_id");
    let field = ["users_", "bootcamps_", "courses_"]
        .iter()
        .find_map(|table| trimmed.strip_prefix(table))
        .unwrap_or(trimmed);
    match field {
        "owner" => "user".to_string(),
        other => other.to_string(),
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: &[SortKey]) {
    qb.push(" ORDER BY ");
    for key in sort {
        // Field names come from a fixed whitelist
        qb.push(key.field).push(if key.descending { " DESC, " } else { " ASC, " });
    }
    qb.push("id");
}

fn push_page<F>(qb: &mut QueryBuilder<'_, Postgres>, query: &ListQuery<F>) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(query.limit))
        .push(" OFFSET ")
        .push_bind(query.offset() as i64);
}

fn bootcamp_conditions(head: &str, filter: &BootcampFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(" WHERE TRUE");
    if let Some(name) = &filter.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(career) = &filter.careers {
        qb.push(" AND ").push_bind(career.clone()).push(" = ANY(careers)");
    }
    if let Some(v) = filter.housing {
        qb.push(" AND housing = ").push_bind(v);
    }
    if let Some(v) = filter.job_assistance {
        qb.push(" AND job_assistance = ").push_bind(v);
    }
    if let Some(v) = filter.job_guarantee {
        qb.push(" AND job_guarantee = ").push_bind(v);
    }
    if let Some(v) = filter.accept_gi {
        qb.push(" AND accept_gi = ").push_bind(v);
    }
    if let Some(v) = filter.owner_id {
        qb.push(" AND owner_id = ").push_bind(v);
    }
    qb
}

fn course_conditions(head: &str, filter: &CourseFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(" WHERE TRUE");
    if let Some(v) = filter.bootcamp_id {
        qb.push(" AND bootcamp_id = ").push_bind(v);
    }
    if let Some(v) = filter.minimum_skill {
        qb.push(" AND minimum_skill = ").push_bind(v.as_str());
    }
    if let Some(v) = filter.scholarship_available {
        qb.push(" AND scholarship_available = ").push_bind(v);
    }
    qb
}

fn user_conditions(head: &str, filter: &UserFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(" WHERE TRUE");
    if let Some(v) = filter.role {
        qb.push(" AND role = ").push_bind(v.as_str());
    }
    if let Some(v) = &filter.email {
        qb.push(" AND email = ").push_bind(super::models::user::normalize_email(v));
    }
    qb
}

impl PgStore {
    async fn refresh_average_cost<'e, E>(executor: E, bootcamp_id: Uuid) -> Result<(), DatabaseError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            "UPDATE bootcamps SET average_cost = \
             (SELECT (CEIL(AVG(tuition) / 10) * 10)::INTEGER FROM courses WHERE bootcamp_id = $1) \
             WHERE id = $1",
        )
        .bind(bootcamp_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl BootcampStore for PgStore {
    async fn find_bootcamp(&self, id: Uuid) -> Result<Option<Bootcamp>, DatabaseError> {
        let sql = format!("SELECT {} FROM bootcamps WHERE id = $1", BOOTCAMP_COLUMNS);
        Ok(sqlx::query_as::<_, Bootcamp>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_bootcamp_by_owner(&self, owner_id: Uuid) -> Result<Option<Bootcamp>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM bootcamps WHERE owner_id = $1 ORDER BY created_at LIMIT 1",
            BOOTCAMP_COLUMNS
        );
        Ok(sqlx::query_as::<_, Bootcamp>(&sql).bind(owner_id).fetch_optional(&self.pool).await?)
    }

    async fn list_bootcamps(&self, query: &ListQuery<BootcampFilter>) -> Result<Page<Bootcamp>, DatabaseError> {
        let total: i64 = bootcamp_conditions("SELECT COUNT(*) FROM bootcamps", &query.filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = bootcamp_conditions(&format!("SELECT {} FROM bootcamps", BOOTCAMP_COLUMNS), &query.filter);
        push_order(&mut qb, &query.sort);
        push_page(&mut qb, query);
        let items = qb.build_query_as::<Bootcamp>().fetch_all(&self.pool).await?;

        Ok(Page { items, total: total as u64 })
    }

    async fn create_bootcamp(&self, owner_id: Uuid, input: NewBootcamp) -> Result<Bootcamp, DatabaseError> {
        let b = input.into_bootcamp(Uuid::new_v4(), owner_id, Utc::now());
        let sql = format!(
            "INSERT INTO bootcamps ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {}",
            BOOTCAMP_COLUMNS, BOOTCAMP_COLUMNS
        );
        sqlx::query_as::<_, Bootcamp>(&sql)
            .bind(b.id)
            .bind(b.owner_id)
            .bind(&b.name)
            .bind(&b.slug)
            .bind(&b.description)
            .bind(&b.website)
            .bind(&b.phone)
            .bind(&b.email)
            .bind(&b.address)
            .bind(&b.careers)
            .bind(b.housing)
            .bind(b.job_assistance)
            .bind(b.job_guarantee)
            .bind(b.accept_gi)
            .bind(&b.photo)
            .bind(b.average_cost)
            .bind(b.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn update_bootcamp(&self, id: Uuid, patch: BootcampPatch) -> Result<Option<Bootcamp>, DatabaseError> {
        let slug = patch.name.as_deref().map(slugify);
        let sql = format!(
            "UPDATE bootcamps SET \
             name = COALESCE(TRIM($2), name), slug = COALESCE($3, slug), \
             description = COALESCE($4, description), website = COALESCE($5, website), \
             phone = COALESCE($6, phone), email = COALESCE($7, email), address = COALESCE($8, address), \
             careers = COALESCE($9, careers), housing = COALESCE($10, housing), \
             job_assistance = COALESCE($11, job_assistance), job_guarantee = COALESCE($12, job_guarantee), \
             accept_gi = COALESCE($13, accept_gi) \
             WHERE id = $1 RETURNING {}",
            BOOTCAMP_COLUMNS
        );
        sqlx::query_as::<_, Bootcamp>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(slug)
            .bind(patch.description)
            .bind(patch.website)
            .bind(patch.phone)
            .bind(patch.email)
            .bind(patch.address)
            .bind(patch.careers)
            .bind(patch.housing)
            .bind(patch.job_assistance)
            .bind(patch.job_guarantee)
            .bind(patch.accept_gi)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn set_bootcamp_photo(&self, id: Uuid, photo: &str) -> Result<Option<Bootcamp>, DatabaseError> {
        let sql = format!("UPDATE bootcamps SET photo = $2 WHERE id = $1 RETURNING {}", BOOTCAMP_COLUMNS);
        Ok(sqlx::query_as::<_, Bootcamp>(&sql)
            .bind(id)
            .bind(photo)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_bootcamp(&self, id: Uuid) -> Result<bool, DatabaseError> {
        // Courses go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, DatabaseError> {
        let sql = format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS);
        Ok(sqlx::query_as::<_, Course>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn list_courses(&self, query: &ListQuery<CourseFilter>) -> Result<Page<Course>, DatabaseError> {
        let total: i64 = course_conditions("SELECT COUNT(*) FROM courses", &query.filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = course_conditions(&format!("SELECT {} FROM courses", COURSE_COLUMNS), &query.filter);
        push_order(&mut qb, &query.sort);
        push_page(&mut qb, query);
        let items = qb.build_query_as::<Course>().fetch_all(&self.pool).await?;

        Ok(Page { items, total: total as u64 })
    }

    async fn create_course(
        &self,
        bootcamp_id: Uuid,
        user_id: Uuid,
        input: NewCourse,
    ) -> Result<Course, DatabaseError> {
        let c = input.into_course(Uuid::new_v4(), bootcamp_id, user_id, Utc::now());
        let sql = format!(
            "INSERT INTO courses ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            COURSE_COLUMNS, COURSE_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let course = sqlx::query_as::<_, Course>(&sql)
            .bind(c.id)
            .bind(c.bootcamp_id)
            .bind(c.user_id)
            .bind(&c.title)
            .bind(&c.description)
            .bind(c.weeks)
            .bind(c.tuition)
            .bind(c.minimum_skill.as_str())
            .bind(c.scholarship_available)
            .bind(c.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        Self::refresh_average_cost(&mut *tx, bootcamp_id).await?;
        tx.commit().await?;

        Ok(course)
    }

    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> Result<Option<Course>, DatabaseError> {
        let sql = format!(
            "UPDATE courses SET \
             title = COALESCE(TRIM($2), title), description = COALESCE($3, description), \
             weeks = COALESCE($4, weeks), tuition = COALESCE($5, tuition), \
             minimum_skill = COALESCE($6, minimum_skill), \
             scholarship_available = COALESCE($7, scholarship_available) \
             WHERE id = $1 RETURNING {}",
            COURSE_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let course = sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.weeks)
            .bind(patch.tuition)
            .bind(patch.minimum_skill.map(|s| s.as_str()))
            .bind(patch.scholarship_available)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_write_error)?;
        if let Some(course) = &course {
            Self::refresh_average_cost(&mut *tx, course.bootcamp_id).await?;
        }
        tx.commit().await?;

        Ok(course)
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let bootcamp_id: Option<Uuid> = sqlx::query_scalar("DELETE FROM courses WHERE id = $1 RETURNING bootcamp_id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(bootcamp_id) = bootcamp_id {
            Self::refresh_average_cost(&mut *tx, bootcamp_id).await?;
        }
        tx.commit().await?;

        Ok(bootcamp_id.is_some())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(super::models::user::normalize_email(email))
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self, query: &ListQuery<UserFilter>) -> Result<Page<User>, DatabaseError> {
        let total: i64 = user_conditions("SELECT COUNT(*) FROM users", &query.filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = user_conditions(&format!("SELECT {} FROM users", USER_COLUMNS), &query.filter);
        push_order(&mut qb, &query.sort);
        push_page(&mut qb, query);
        let items = qb.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(Page { items, total: total as u64 })
    }

    async fn create_user(&self, user: User) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS, USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.role.as_str())
            .bind(&user.password_hash)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "UPDATE users SET name = COALESCE(TRIM($2), name), email = COALESCE($3, email), \
             role = COALESCE($4, role) WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.email.as_deref().map(super::models::user::normalize_email))
            .bind(patch.role.map(|r| r.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn purge(&self) -> Result<(), DatabaseError> {
        sqlx::query("TRUNCATE courses, bootcamps, users")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_constraint_names_to_fields() {
        assert_eq!(constraint_field("bootcamps_name_key"), "name");
        assert_eq!(constraint_field("users_email_key"), "email");
        assert_eq!(constraint_field("courses_bootcamp_id_fkey"), "bootcamp");
        assert_eq!(constraint_field("bootcamps_owner_id_fkey"), "user");
    }

    #[test]
    fn order_clause_uses_whitelisted_fields() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM bootcamps");
        push_order(
            &mut qb,
            &[
                SortKey { field: "average_cost", descending: true },
                SortKey { field: "name", descending: false },
            ],
        );
        assert_eq!(qb.sql(), "SELECT id FROM bootcamps ORDER BY average_cost DESC, name ASC, id");
    }

    #[test]
    fn filters_become_bound_parameters() {
        let filter = BootcampFilter {
            careers: Some("Business".into()),
            housing: Some(true),
            ..Default::default()
        };
        let qb = bootcamp_conditions("SELECT COUNT(*) FROM bootcamps", &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM bootcamps WHERE TRUE AND $1 = ANY(careers) AND housing = $2"
        );
    }
}
