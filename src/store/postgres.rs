//! Postgres-backed stores.
//!
//! Enums are stored as their upper-case names in TEXT columns; tags and
//! agenda items as TEXT[]. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::{admission_status, already_registered, EventStore, RegistrationStore, UserStore};
use crate::models::{
    Event, EventCategory, Location, Page, PageRequest, Registration, RegistrationStatus, User,
    UserPreferences,
};
use crate::utils::error::AppError;

const EVENT_COLUMNS: &str = "id, title, description, category, organizer_id, start_date_time, \
     end_date_time, location_type, address, city, country, virtual_link, capacity, \
     registration_deadline, status, tags, image_url, requirements, agenda, created_at, updated_at";

const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, status, registration_date, notes, attended";

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, profile_image, \
     preferred_categories, notifications, active, created_at, updated_at";

fn corrupt(what: &str, err: AppError) -> AppError {
    AppError::InternalServerError(format!("Stored {} could not be decoded: {}", what, err))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Builds an ILIKE pattern that matches `query` literally anywhere.
fn contains_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Debug, FromRow)]
struct EventRow {
    id: String,
    title: String,
    description: Option<String>,
    category: String,
    organizer_id: String,
    start_date_time: DateTime<Utc>,
    end_date_time: DateTime<Utc>,
    location_type: String,
    address: Option<String>,
    city: Option<String>,
    country: Option<String>,
    virtual_link: Option<String>,
    capacity: i32,
    registration_deadline: Option<DateTime<Utc>>,
    status: String,
    tags: Vec<String>,
    image_url: Option<String>,
    requirements: Option<String>,
    agenda: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            category: row.category.parse().map_err(|e| corrupt("event", e))?,
            status: row.status.parse().map_err(|e| corrupt("event", e))?,
            location: Location {
                location_type: row.location_type.parse().map_err(|e| corrupt("event", e))?,
                address: row.address,
                city: row.city,
                country: row.country,
                virtual_link: row.virtual_link,
            },
            capacity: u32::try_from(row.capacity).unwrap_or(0),
            id: row.id,
            title: row.title,
            description: row.description,
            organizer_id: row.organizer_id,
            start_date_time: row.start_date_time,
            end_date_time: row.end_date_time,
            registration_deadline: row.registration_deadline,
            tags: row.tags,
            image_url: row.image_url,
            requirements: row.requirements,
            agenda: row.agenda,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn events_from_rows(rows: Vec<EventRow>) -> Result<Vec<Event>, AppError> {
    rows.into_iter().map(Event::try_from).collect()
}

#[derive(Debug, FromRow)]
struct RegistrationRow {
    id: String,
    event_id: String,
    user_id: String,
    status: String,
    registration_date: DateTime<Utc>,
    notes: Option<String>,
    attended: bool,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = AppError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(Registration {
            status: row.status.parse().map_err(|e| corrupt("registration", e))?,
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            registration_date: row.registration_date,
            notes: row.notes,
            attended: row.attended,
        })
    }
}

fn registrations_from_rows(rows: Vec<RegistrationRow>) -> Result<Vec<Registration>, AppError> {
    rows.into_iter().map(Registration::try_from).collect()
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    profile_image: Option<String>,
    preferred_categories: Vec<String>,
    notifications: bool,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let categories = row
            .preferred_categories
            .iter()
            .map(|c| c.parse::<EventCategory>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt("user", e))?;

        Ok(User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            profile_image: row.profile_image,
            preferences: UserPreferences {
                categories,
                notifications: row.notifications,
            },
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn get(&self, id: &str) -> Result<Option<Event>, AppError> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Event::try_from).transpose()
    }

    async fn find_by_organizer(&self, organizer_id: &str) -> Result<Vec<Event>, AppError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events WHERE organizer_id = $1 ORDER BY created_at DESC, id",
            EVENT_COLUMNS
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await?;

        events_from_rows(rows)
    }

    async fn find_by_category(&self, category: EventCategory) -> Result<Vec<Event>, AppError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events WHERE category = $1 ORDER BY created_at DESC, id",
            EVENT_COLUMNS
        ))
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        events_from_rows(rows)
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Event>, AppError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
            EVENT_COLUMNS
        ))
        .bind(to_i64(page.size))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            events_from_rows(rows)?,
            page,
            to_count(total) as usize,
        ))
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Event>, AppError> {
        const MATCHES: &str = "title ILIKE $1 OR description ILIKE $1 \
             OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $1)";

        let pattern = contains_pattern(query);

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM events WHERE {}", MATCHES))
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events WHERE {} ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
            EVENT_COLUMNS, MATCHES
        ))
        .bind(&pattern)
        .bind(to_i64(page.size))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            events_from_rows(rows)?,
            page,
            to_count(total) as usize,
        ))
    }

    async fn save(&self, event: &Event) -> Result<(), AppError> {
        let capacity = i32::try_from(event.capacity).map_err(|_| {
            AppError::ValidationError(format!("Capacity {} is out of range", event.capacity))
        })?;

        sqlx::query(
            "INSERT INTO events (id, title, description, category, organizer_id, start_date_time,
                 end_date_time, location_type, address, city, country, virtual_link, capacity,
                 registration_deadline, status, tags, image_url, requirements, agenda,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                 $17, $18, $19, $20, $21)
             ON CONFLICT (id) DO UPDATE SET
                 title = EXCLUDED.title,
                 description = EXCLUDED.description,
                 category = EXCLUDED.category,
                 organizer_id = EXCLUDED.organizer_id,
                 start_date_time = EXCLUDED.start_date_time,
                 end_date_time = EXCLUDED.end_date_time,
                 location_type = EXCLUDED.location_type,
                 address = EXCLUDED.address,
                 city = EXCLUDED.city,
                 country = EXCLUDED.country,
                 virtual_link = EXCLUDED.virtual_link,
                 capacity = EXCLUDED.capacity,
                 registration_deadline = EXCLUDED.registration_deadline,
                 status = EXCLUDED.status,
                 tags = EXCLUDED.tags,
                 image_url = EXCLUDED.image_url,
                 requirements = EXCLUDED.requirements,
                 agenda = EXCLUDED.agenda,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.category.as_str())
        .bind(&event.organizer_id)
        .bind(event.start_date_time)
        .bind(event.end_date_time)
        .bind(event.location.location_type.as_str())
        .bind(&event.location.address)
        .bind(&event.location.city)
        .bind(&event.location.country)
        .bind(&event.location.virtual_link)
        .bind(capacity)
        .bind(event.registration_deadline)
        .bind(event.status.as_str())
        .bind(&event.tags)
        .bind(&event.image_url)
        .bind(&event.requirements)
        .bind(&event.agenda)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct PgRegistrationStore {
    pool: PgPool,
}

impl PgRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        registration: &Registration,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO registrations (id, event_id, user_id, status, registration_date, notes, attended)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&registration.id)
        .bind(&registration.event_id)
        .bind(&registration.user_id)
        .bind(registration.status.as_str())
        .bind(registration.registration_date)
        .bind(&registration.notes)
        .bind(registration.attended)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                already_registered()
            } else {
                AppError::DatabaseError(e)
            }
        })?;

        Ok(())
    }
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn get(&self, id: &str) -> Result<Option<Registration>, AppError> {
        let row: Option<RegistrationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM registrations WHERE id = $1",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Registration::try_from).transpose()
    }

    async fn find_by_event(&self, event_id: &str) -> Result<Vec<Registration>, AppError> {
        let rows: Vec<RegistrationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM registrations WHERE event_id = $1 ORDER BY registration_date, id",
            REGISTRATION_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        registrations_from_rows(rows)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Registration>, AppError> {
        let rows: Vec<RegistrationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM registrations WHERE user_id = $1 ORDER BY registration_date, id",
            REGISTRATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        registrations_from_rows(rows)
    }

    async fn exists_by_event_and_user(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM registrations WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn count_by_event_and_status(
        &self,
        event_id: &str,
        status: RegistrationStatus,
    ) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = $2",
        )
        .bind(event_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(to_count(count))
    }

    async fn save(&self, registration: &Registration) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO registrations (id, event_id, user_id, status, registration_date, notes, attended)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                 status = EXCLUDED.status,
                 notes = EXCLUDED.notes,
                 attended = EXCLUDED.attended",
        )
        .bind(&registration.id)
        .bind(&registration.event_id)
        .bind(&registration.user_id)
        .bind(registration.status.as_str())
        .bind(registration.registration_date)
        .bind(&registration.notes)
        .bind(registration.attended)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn admit(
        &self,
        mut registration: Registration,
        _capacity: u32,
    ) -> Result<Registration, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the event serializes admissions for that event only.
        let locked: Option<(i32,)> =
            sqlx::query_as("SELECT capacity FROM events WHERE id = $1 FOR UPDATE")
                .bind(&registration.event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let capacity = match locked {
            Some((capacity,)) => u32::try_from(capacity).unwrap_or(0),
            None => return Err(AppError::not_found("Event", &registration.event_id)),
        };

        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM registrations WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(&registration.event_id)
        .bind(&registration.user_id)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(already_registered());
        }

        let (confirmed,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = $2",
        )
        .bind(&registration.event_id)
        .bind(RegistrationStatus::Confirmed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        registration.status = admission_status(to_count(confirmed), capacity);
        Self::insert(&mut tx, &registration).await?;
        tx.commit().await?;

        Ok(registration)
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get(&self, id: &str) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<User>, AppError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(to_i64(page.size))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(users, page, to_count(total) as usize))
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        let categories: Vec<String> = user
            .preferences
            .categories
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();

        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, phone, profile_image,
                 preferred_categories, notifications, active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (id) DO UPDATE SET
                 email = EXCLUDED.email,
                 first_name = EXCLUDED.first_name,
                 last_name = EXCLUDED.last_name,
                 phone = EXCLUDED.phone,
                 profile_image = EXCLUDED.profile_image,
                 preferred_categories = EXCLUDED.preferred_categories,
                 notifications = EXCLUDED.notifications,
                 active = EXCLUDED.active,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.profile_image)
        .bind(categories)
        .bind(user.preferences.notifications)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
