use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = applications)]
#[diesel(belongs_to(User))]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

/// One row of an application's append-only status history.
#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = application_status_history)]
#[diesel(belongs_to(Application))]
pub struct StatusChange {
    pub id: i64,
    pub application_id: Uuid,
    pub status: String,
    pub note: Option<String>,
    pub changed_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = application_status_history)]
pub struct NewStatusChange {
    pub application_id: Uuid,
    pub status: String,
    pub note: Option<String>,
    pub changed_at: NaiveDateTime,
}
