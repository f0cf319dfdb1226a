use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{error, warn};

use super::error::{OnboardingError, OnboardingResult};
use super::schema::{role_tasks, roles, task_progress, tasks, users};
use super::store::OnboardingStore;
use super::types::{
    CatalogSnapshot, ProgressEntry, Role, RoleId, RoleTaskAssignment, Task, TaskDraft, TaskId,
    User, UserDraft, UserId,
};
use crate::shared::utils::DbPool;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = roles)]
struct RoleRow {
    id: i32,
    name: String,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
struct TaskRow {
    id: i32,
    title: String,
    week_num: i32,
    category: String,
    format: String,
    assigned_to: String,
    resource_url: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = OnboardingError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |e: OnboardingError| OnboardingError::storage(format!("task {id}: {e}"));
        Ok(Self {
            id: row.id,
            category: row.category.parse().map_err(corrupt)?,
            format: row.format.parse().map_err(corrupt)?,
            assigned_to: row.assigned_to.parse().map_err(corrupt)?,
            title: row.title,
            week_num: row.week_num,
            resource_url: row.resource_url,
        })
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = tasks, treat_none_as_null = true)]
struct TaskChanges<'a> {
    title: &'a str,
    week_num: i32,
    category: &'static str,
    format: &'static str,
    assigned_to: &'static str,
    resource_url: Option<&'a str>,
}

impl<'a> From<&'a TaskDraft> for TaskChanges<'a> {
    fn from(draft: &'a TaskDraft) -> Self {
        Self {
            title: &draft.title,
            week_num: draft.week_num,
            category: draft.category.as_str(),
            format: draft.format.as_str(),
            assigned_to: draft.assigned_to.as_str(),
            resource_url: draft.resource_url.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, Queryable, Selectable, Insertable)]
#[diesel(table_name = role_tasks)]
struct RoleTaskRow {
    task_id: i32,
    role_id: i32,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    role_id: Option<i32>,
    is_admin: bool,
    password_hash: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role_id: row.role_id,
            is_admin: row.is_admin,
            password_hash: row.password_hash,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
struct NewUserRow<'a> {
    name: &'a str,
    email: &'a str,
    role_id: Option<i32>,
    is_admin: bool,
    password_hash: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_progress)]
struct ProgressRow {
    user_id: i32,
    task_id: i32,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

impl From<ProgressRow> for ProgressEntry {
    fn from(row: ProgressRow) -> Self {
        Self {
            user_id: row.user_id,
            task_id: row.task_id,
            completed: row.completed,
            completed_at: row.completed_at,
        }
    }
}

impl From<&ProgressEntry> for ProgressRow {
    fn from(entry: &ProgressEntry) -> Self {
        Self {
            user_id: entry.user_id,
            task_id: entry.task_id,
            completed: entry.completed,
            completed_at: entry.completed_at,
        }
    }
}

fn load_tasks(conn: &mut PgConnection) -> OnboardingResult<Vec<Task>> {
    tasks::table
        .order((tasks::week_num.asc(), tasks::id.asc()))
        .select(TaskRow::as_select())
        .load(conn)?
        .into_iter()
        .map(Task::try_from)
        .collect()
}

fn load_assignments(conn: &mut PgConnection) -> OnboardingResult<Vec<RoleTaskAssignment>> {
    Ok(role_tasks::table
        .order((role_tasks::task_id.asc(), role_tasks::role_id.asc()))
        .select(RoleTaskRow::as_select())
        .load(conn)?
        .into_iter()
        .map(|row| RoleTaskAssignment {
            role_id: row.role_id,
            task_id: row.task_id,
        })
        .collect())
}

/// PostgreSQL-backed store. Every call checks out a pooled connection on the
/// blocking thread pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, op: F) -> OnboardingResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> OnboardingResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl OnboardingStore for PgStore {
    async fn list_roles(&self) -> OnboardingResult<Vec<Role>> {
        self.run(|conn| {
            Ok(roles::table
                .order(roles::id.asc())
                .select(RoleRow::as_select())
                .load(conn)?
                .into_iter()
                .map(Role::from)
                .collect())
        })
        .await
    }

    async fn create_role(&self, name: &str) -> OnboardingResult<Role> {
        let name = name.to_string();
        self.run(move |conn| {
            let row: RoleRow = diesel::insert_into(roles::table)
                .values(roles::name.eq(&name))
                .returning(RoleRow::as_returning())
                .get_result(conn)?;
            Ok(row.into())
        })
        .await
    }

    async fn rename_role(&self, id: RoleId, name: &str) -> OnboardingResult<bool> {
        let name = name.to_string();
        self.run(move |conn| {
            let updated = diesel::update(roles::table.find(id))
                .set(roles::name.eq(&name))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn delete_role(&self, id: RoleId) -> OnboardingResult<bool> {
        self.run(move |conn| {
            conn.transaction::<_, OnboardingError, _>(|conn| {
                diesel::update(users::table.filter(users::role_id.eq(id)))
                    .set(users::role_id.eq(None::<i32>))
                    .execute(conn)?;
                diesel::delete(role_tasks::table.filter(role_tasks::role_id.eq(id)))
                    .execute(conn)?;
                let deleted = diesel::delete(roles::table.find(id)).execute(conn)?;
                Ok(deleted > 0)
            })
        })
        .await
    }

    async fn list_tasks(&self) -> OnboardingResult<Vec<Task>> {
        self.run(load_tasks).await
    }

    async fn create_task(&self, draft: &TaskDraft) -> OnboardingResult<TaskId> {
        let draft = draft.clone();
        self.run(move |conn| {
            let id: TaskId = diesel::insert_into(tasks::table)
                .values(TaskChanges::from(&draft))
                .returning(tasks::id)
                .get_result(conn)?;
            Ok(id)
        })
        .await
    }

    async fn update_task(&self, id: TaskId, draft: &TaskDraft) -> OnboardingResult<bool> {
        let draft = draft.clone();
        self.run(move |conn| {
            let updated = diesel::update(tasks::table.find(id))
                .set(TaskChanges::from(&draft))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn delete_task(&self, id: TaskId) -> OnboardingResult<bool> {
        self.run(move |conn| {
            conn.transaction::<_, OnboardingError, _>(|conn| {
                diesel::delete(role_tasks::table.filter(role_tasks::task_id.eq(id)))
                    .execute(conn)?;
                diesel::delete(task_progress::table.filter(task_progress::task_id.eq(id)))
                    .execute(conn)?;
                let deleted = diesel::delete(tasks::table.find(id)).execute(conn)?;
                Ok(deleted > 0)
            })
        })
        .await
    }

    async fn list_assignments(&self) -> OnboardingResult<Vec<RoleTaskAssignment>> {
        self.run(load_assignments).await
    }

    async fn assign_roles(&self, task_id: TaskId, role_ids: &[RoleId]) -> OnboardingResult<usize> {
        let role_ids = role_ids.to_vec();
        self.run(move |conn| {
            conn.transaction::<_, OnboardingError, _>(|conn| {
                let task_exists: bool =
                    diesel::select(diesel::dsl::exists(tasks::table.find(task_id)))
                        .get_result(conn)?;
                if !task_exists {
                    return Err(OnboardingError::not_found("task", task_id));
                }

                let known: HashSet<i32> = roles::table
                    .filter(roles::id.eq_any(role_ids.clone()))
                    .select(roles::id)
                    .load::<i32>(conn)?
                    .into_iter()
                    .collect();
                if let Some(missing) = role_ids.iter().find(|id| !known.contains(*id)) {
                    return Err(OnboardingError::not_found("role", *missing));
                }

                let rows: Vec<RoleTaskRow> = role_ids
                    .iter()
                    .map(|role_id| RoleTaskRow {
                        task_id,
                        role_id: *role_id,
                    })
                    .collect();
                diesel::insert_into(role_tasks::table)
                    .values(&rows)
                    .on_conflict_do_nothing()
                    .execute(conn)?;
                Ok(role_ids.len())
            })
        })
        .await
    }

    async fn list_users(&self) -> OnboardingResult<Vec<User>> {
        self.run(|conn| {
            Ok(users::table
                .order(users::id.asc())
                .select(UserRow::as_select())
                .load(conn)?
                .into_iter()
                .map(User::from)
                .collect())
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> OnboardingResult<Option<User>> {
        self.run(move |conn| {
            Ok(users::table
                .find(id)
                .select(UserRow::as_select())
                .first(conn)
                .optional()?
                .map(User::from))
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> OnboardingResult<Option<User>> {
        let email = email.to_string();
        self.run(move |conn| {
            Ok(users::table
                .filter(users::email.eq(&email))
                .select(UserRow::as_select())
                .first(conn)
                .optional()?
                .map(User::from))
        })
        .await
    }

    async fn count_users(&self) -> OnboardingResult<u64> {
        self.run(|conn| {
            let count: i64 = users::table.count().get_result(conn)?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn create_user(&self, draft: &UserDraft) -> OnboardingResult<User> {
        let draft = draft.clone();
        self.run(move |conn| {
            let row: UserRow = diesel::insert_into(users::table)
                .values(NewUserRow {
                    name: &draft.name,
                    email: &draft.email,
                    role_id: draft.role_id,
                    is_admin: draft.is_admin,
                    password_hash: draft.password_hash.as_deref(),
                })
                .returning(UserRow::as_returning())
                .get_result(conn)?;
            Ok(row.into())
        })
        .await
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> OnboardingResult<bool> {
        let draft = draft.clone();
        self.run(move |conn| {
            conn.transaction::<_, OnboardingError, _>(|conn| {
                let updated = diesel::update(users::table.find(id))
                    .set((
                        users::name.eq(&draft.name),
                        users::email.eq(&draft.email),
                        users::role_id.eq(draft.role_id),
                        users::is_admin.eq(draft.is_admin),
                    ))
                    .execute(conn)?;
                if updated > 0 {
                    if let Some(hash) = &draft.password_hash {
                        diesel::update(users::table.find(id))
                            .set(users::password_hash.eq(hash))
                            .execute(conn)?;
                    }
                }
                Ok(updated > 0)
            })
        })
        .await
    }

    async fn delete_user(&self, id: UserId) -> OnboardingResult<bool> {
        self.run(move |conn| {
            conn.transaction::<_, OnboardingError, _>(|conn| {
                diesel::delete(task_progress::table.filter(task_progress::user_id.eq(id)))
                    .execute(conn)?;
                let deleted = diesel::delete(users::table.find(id)).execute(conn)?;
                Ok(deleted > 0)
            })
        })
        .await
    }

    async fn progress_for_user(&self, user_id: UserId) -> OnboardingResult<Vec<ProgressEntry>> {
        self.run(move |conn| {
            Ok(task_progress::table
                .filter(task_progress::user_id.eq(user_id))
                .order(task_progress::task_id.asc())
                .select(ProgressRow::as_select())
                .load(conn)?
                .into_iter()
                .map(ProgressEntry::from)
                .collect())
        })
        .await
    }

    async fn upsert_progress(&self, entry: &ProgressEntry) -> OnboardingResult<ProgressEntry> {
        let row = ProgressRow::from(entry);
        self.run(move |conn| {
            // Share locks keep both parent rows until commit.
            conn.transaction::<_, OnboardingError, _>(|conn| {
                users::table
                    .find(row.user_id)
                    .select(users::id)
                    .for_share()
                    .first::<UserId>(conn)
                    .optional()?
                    .ok_or_else(|| OnboardingError::not_found("user", row.user_id))?;
                tasks::table
                    .find(row.task_id)
                    .select(tasks::id)
                    .for_share()
                    .first::<TaskId>(conn)
                    .optional()?
                    .ok_or_else(|| OnboardingError::not_found("task", row.task_id))?;

                let stored: ProgressRow = diesel::insert_into(task_progress::table)
                    .values(&row)
                    .on_conflict((task_progress::user_id, task_progress::task_id))
                    .do_update()
                    .set((
                        task_progress::completed.eq(row.completed),
                        task_progress::completed_at.eq(row.completed_at),
                    ))
                    .returning(ProgressRow::as_returning())
                    .get_result(conn)?;
                Ok(stored.into())
            })
        })
        .await
    }

    async fn snapshot(&self) -> OnboardingResult<CatalogSnapshot> {
        self.run(|conn| {
            conn.build_transaction()
                .read_only()
                .repeatable_read()
                .run::<_, OnboardingError, _>(|conn| {
                    let roles = roles::table
                        .order(roles::id.asc())
                        .select(RoleRow::as_select())
                        .load(conn)?
                        .into_iter()
                        .map(Role::from)
                        .collect();
                    let tasks = load_tasks(conn)?;
                    let assignments = load_assignments(conn)?;
                    let users = users::table
                        .order(users::id.asc())
                        .select(UserRow::as_select())
                        .load(conn)?
                        .into_iter()
                        .map(User::from)
                        .collect();
                    let progress = task_progress::table
                        .order((task_progress::user_id.asc(), task_progress::task_id.asc()))
                        .select(ProgressRow::as_select())
                        .load(conn)?
                        .into_iter()
                        .map(ProgressEntry::from)
                        .collect();
                    Ok(CatalogSnapshot {
                        roles,
                        tasks,
                        assignments,
                        users,
                        progress,
                    })
                })
        })
        .await
    }

    async fn ping(&self) -> bool {
        let result = self
            .run(|conn| {
                diesel::sql_query("SELECT 1").execute(conn)?;
                Ok(())
            })
            .await;
        match result {
            Ok(()) => true,
            Err(OnboardingError::Storage(detail)) => {
                warn!("[HEALTH] database ping failed: {detail}");
                false
            }
            Err(e) => {
                error!("[HEALTH] unexpected ping error: {e}");
                false
            }
        }
    }
}
