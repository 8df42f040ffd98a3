use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{query, query_as, query_scalar, FromRow};
use tracing::{error, info};
use uuid::Uuid;

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

#[cfg(feature = "postgres")]
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::errors::{TouchlineError, TouchlineResult};
use crate::license::{expiring_window_end, LicenseStatus, LicenseType, VideoLicense};
use crate::notification::{NewNotification, Notification, NotificationStatus, NotificationType};
use crate::store::{ExpiringLicense, NotificationStore, VideoStore};
use crate::video::{normalize_territories, LicenseUpdate, NewVideo, VideoContent, VideoUpdate};

/// One video joined with its license, as read from the database.
///
/// List columns (`tags`, `terms`, `restrictions`, `territory_restrictions`)
/// are stored as JSON text.
#[derive(Debug, Clone, FromRow)]
pub struct VideoRow {
    pub id: String,
    pub url: String,
    pub title: String,
    pub creator: String,
    pub created_date: NaiveDateTime,
    pub duration: String,
    pub attribution: String,
    pub thumbnail_url: Option<String>,
    pub tags: String,
    pub license_id: String,
    pub license_type: String,
    pub start_date: NaiveDateTime,
    pub expiration_date: Option<NaiveDateTime>,
    pub terms: String,
    pub restrictions: String,
    pub territory_restrictions: String,
    pub renewal_terms: Option<String>,
}

/// A notification record as stored in the `notifications` table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub status: String,
    pub metadata: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<VideoRow> for VideoContent {
    type Error = TouchlineError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        let license_type =
            LicenseType::from_str(&row.license_type).map_err(TouchlineError::Internal)?;

        Ok(VideoContent {
            license: VideoLicense {
                id: row.license_id,
                video_id: row.id.clone(),
                license_type,
                start_date: row.start_date,
                expiration_date: row.expiration_date,
                terms: serde_json::from_str(&row.terms)?,
                restrictions: serde_json::from_str(&row.restrictions)?,
                territory_restrictions: serde_json::from_str(&row.territory_restrictions)?,
                renewal_terms: row.renewal_terms,
            },
            id: row.id,
            url: row.url,
            title: row.title,
            creator: row.creator,
            created_date: row.created_date,
            duration: row.duration,
            attribution: row.attribution,
            thumbnail_url: row.thumbnail_url,
            tags: serde_json::from_str(&row.tags)?,
        })
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = TouchlineError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            notification_type: NotificationType::from_str(&row.notification_type)
                .map_err(TouchlineError::Internal)?,
            title: row.title,
            message: row.message,
            status: NotificationStatus::from_str(&row.status).map_err(TouchlineError::Internal)?,
            metadata: serde_json::from_str(&row.metadata)?,
            created_at: row.created_at,
        })
    }
}

const VIDEO_SELECT: &str = "SELECT v.id, v.url, v.title, v.creator, v.created_date, \
     v.duration, v.attribution, v.thumbnail_url, v.tags, \
     l.id AS license_id, l.license_type, l.start_date, l.expiration_date, \
     l.terms, l.restrictions, l.territory_restrictions, l.renewal_terms \
     FROM video_contents v JOIN video_licenses l ON l.video_id = v.id";

const VIDEO_ORDER: &str = " ORDER BY v.title, v.id";

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

/// Run the same sqlx code against whichever pool backs `self`.
macro_rules! with_pool {
    ($db:expr, $pool:ident => $body:expr) => {
        match $db {
            #[cfg(feature = "sqlite")]
            Database::SQLite($pool) => $body,
            #[cfg(feature = "postgres")]
            Database::Postgres($pool) => $body,
        }
    };
}

/// Log a failed statement and wrap it as a store error.
fn db_err(op: &str, e: sqlx::Error) -> TouchlineError {
    error!("{op} failed: {e}");
    TouchlineError::DatabaseError(e.to_string())
}

/// Rewrite `?` placeholders as `$1, $2, ...` for PostgreSQL.
fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 16);
    let mut n = 0;
    for ch in sql.chars() {
        if ch == '?' {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}

fn to_json<T: serde::Serialize>(value: &T) -> TouchlineResult<String> {
    Ok(serde_json::to_string(value)?)
}

impl Database {
    /// Connect using the database section of the configuration.
    pub async fn new(config: &DatabaseConfig) -> TouchlineResult<Arc<Self>> {
        match config.db_type.as_str() {
            "sqlite" => Self::connect_sqlite(&config.sqlite_url).await,
            "postgres" => Self::connect_postgres(&config.postgres_url).await,
            other => Err(TouchlineError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    #[cfg(feature = "sqlite")]
    pub async fn connect_sqlite(url: &str) -> TouchlineResult<Arc<Self>> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| TouchlineError::ConfigError(format!("invalid SQLite URL: {e}")))?
            .foreign_keys(true);

        // Each connection to an in-memory database is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to connect to SQLite: {e}");
                TouchlineError::DatabaseError(format!("failed to connect to SQLite: {e}"))
            })?;

        Ok(Arc::new(Database::SQLite(pool)))
    }

    #[cfg(not(feature = "sqlite"))]
    pub async fn connect_sqlite(_url: &str) -> TouchlineResult<Arc<Self>> {
        Err(TouchlineError::ConfigError(
            "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
        ))
    }

    #[cfg(feature = "postgres")]
    pub async fn connect_postgres(url: &str) -> TouchlineResult<Arc<Self>> {
        let pool = PgPool::connect(url).await.map_err(|e| {
            error!("Failed to connect to PostgreSQL: {e}");
            TouchlineError::DatabaseError(format!("failed to connect to PostgreSQL: {e}"))
        })?;

        Ok(Arc::new(Database::Postgres(pool)))
    }

    #[cfg(not(feature = "postgres"))]
    pub async fn connect_postgres(_url: &str) -> TouchlineResult<Arc<Self>> {
        Err(TouchlineError::ConfigError(
            "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
        ))
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> TouchlineResult<()> {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => sqlx::migrate!("./migrations/sqlite").run(pool).await,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => sqlx::migrate!("./migrations/postgres").run(pool).await,
        };

        result.map_err(|e| {
            error!("Migration failed: {e}");
            TouchlineError::DatabaseError(format!("migration failed: {e}"))
        })?;

        info!("Database schema is up to date ({})", self.kind());
        Ok(())
    }

    /// "sqlite" or "postgres".
    pub fn kind(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Adapt a `?`-style statement to this backend's placeholder syntax.
    fn sql(&self, sql: &str) -> String {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => sql.to_string(),
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => numbered_placeholders(sql),
        }
    }

    /// Predicate true when the license's territory list lacks the bound code.
    fn territory_absent_predicate(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => {
                "NOT EXISTS (SELECT 1 FROM json_each(l.territory_restrictions) t WHERE t.value = ?)"
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "NOT jsonb_exists(l.territory_restrictions::jsonb, ?)",
        }
    }

    async fn fetch_videos(
        &self,
        op: &str,
        where_clause: &str,
        binds: Vec<NaiveDateTime>,
    ) -> TouchlineResult<Vec<VideoContent>> {
        let sql = self.sql(&format!("{VIDEO_SELECT} WHERE {where_clause}{VIDEO_ORDER}"));

        let rows: Vec<VideoRow> = with_pool!(self, pool => {
            let mut q = query_as::<_, VideoRow>(&sql);
            for value in binds {
                q = q.bind(value);
            }
            q.fetch_all(pool).await.map_err(|e| db_err(op, e))?
        });

        rows.into_iter().map(VideoContent::try_from).collect()
    }

    async fn fetch_video_by_id(&self, id: &str) -> TouchlineResult<Option<VideoContent>> {
        let sql = self.sql(&format!("{VIDEO_SELECT} WHERE v.id = ?"));

        let row: Option<VideoRow> = with_pool!(self, pool => {
            query_as::<_, VideoRow>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .map_err(|e| db_err("find_by_id", e))?
        });

        row.map(VideoContent::try_from).transpose()
    }
}

#[async_trait]
impl VideoStore for Database {
    async fn find_all(&self) -> TouchlineResult<Vec<VideoContent>> {
        self.fetch_videos("find_all", "1 = 1", Vec::new()).await
    }

    async fn find_by_status(
        &self,
        status: LicenseStatus,
        now: NaiveDateTime,
        threshold_days: u32,
    ) -> TouchlineResult<Vec<VideoContent>> {
        let until = expiring_window_end(now, threshold_days);

        let (predicate, binds) = match status {
            LicenseStatus::Expired => (
                "l.expiration_date IS NOT NULL AND l.expiration_date < ?",
                vec![now],
            ),
            LicenseStatus::ExpiringSoon => (
                "l.expiration_date >= ? AND l.expiration_date < ?",
                vec![now, until],
            ),
            LicenseStatus::Active => (
                "(l.expiration_date IS NULL OR l.expiration_date >= ?)",
                vec![until],
            ),
        };

        self.fetch_videos("find_by_status", predicate, binds).await
    }

    async fn find_by_territory_exclusion(
        &self,
        territory: &str,
    ) -> TouchlineResult<Vec<VideoContent>> {
        let code = crate::license::normalize_territory(territory);
        let sql = self.sql(&format!(
            "{VIDEO_SELECT} WHERE {}{VIDEO_ORDER}",
            self.territory_absent_predicate()
        ));

        let rows: Vec<VideoRow> = with_pool!(self, pool => {
            query_as::<_, VideoRow>(&sql)
                .bind(&code)
                .fetch_all(pool)
                .await
                .map_err(|e| db_err("find_by_territory_exclusion", e))?
        });

        rows.into_iter().map(VideoContent::try_from).collect()
    }

    async fn find_by_id(&self, id: &str) -> TouchlineResult<VideoContent> {
        self.fetch_video_by_id(id)
            .await?
            .ok_or_else(|| TouchlineError::video_not_found(id))
    }

    async fn find_license(&self, video_id: &str) -> TouchlineResult<VideoLicense> {
        self.fetch_video_by_id(video_id)
            .await?
            .map(|v| v.license)
            .ok_or_else(|| TouchlineError::license_not_found(video_id))
    }

    async fn create(&self, new: NewVideo) -> TouchlineResult<VideoContent> {
        let video_id = Uuid::new_v4().to_string();
        let video = VideoContent {
            id: video_id.clone(),
            url: new.url,
            title: new.title,
            creator: new.creator,
            created_date: new.created_date,
            duration: new.duration,
            attribution: new.attribution,
            thumbnail_url: new.thumbnail_url,
            tags: new.tags,
            license: VideoLicense {
                id: Uuid::new_v4().to_string(),
                video_id,
                license_type: new.license.license_type,
                start_date: new.license.start_date,
                expiration_date: new.license.expiration_date,
                terms: new.license.terms,
                restrictions: new.license.restrictions,
                territory_restrictions: normalize_territories(new.license.territory_restrictions),
                renewal_terms: new.license.renewal_terms,
            },
        };

        let insert_video = self.sql(
            "INSERT INTO video_contents \
             (id, url, title, creator, created_date, duration, attribution, thumbnail_url, tags) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        );
        let insert_license = self.sql(
            "INSERT INTO video_licenses \
             (id, video_id, license_type, start_date, expiration_date, terms, restrictions, \
              territory_restrictions, renewal_terms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        );

        let tags = to_json(&video.tags)?;
        let terms = to_json(&video.license.terms)?;
        let restrictions = to_json(&video.license.restrictions)?;
        let territories = to_json(&video.license.territory_restrictions)?;

        with_pool!(self, pool => {
            let mut tx = pool.begin().await.map_err(|e| db_err("create", e))?;

            query(&insert_video)
                .bind(&video.id)
                .bind(&video.url)
                .bind(&video.title)
                .bind(&video.creator)
                .bind(video.created_date)
                .bind(&video.duration)
                .bind(&video.attribution)
                .bind(&video.thumbnail_url)
                .bind(&tags)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_err("create video", e))?;

            query(&insert_license)
                .bind(&video.license.id)
                .bind(&video.id)
                .bind(video.license.license_type.as_str())
                .bind(video.license.start_date)
                .bind(video.license.expiration_date)
                .bind(&terms)
                .bind(&restrictions)
                .bind(&territories)
                .bind(&video.license.renewal_terms)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_err("create license", e))?;

            tx.commit().await.map_err(|e| db_err("create", e))?;
        });

        Ok(video)
    }

    async fn update_video(&self, id: &str, update: VideoUpdate) -> TouchlineResult<VideoContent> {
        let mut video = self.find_by_id(id).await?;
        update.apply_to(&mut video);

        let sql = self.sql(
            "UPDATE video_contents SET url = ?, title = ?, creator = ?, created_date = ?, \
             duration = ?, attribution = ?, thumbnail_url = ?, tags = ? WHERE id = ?",
        );
        let tags = to_json(&video.tags)?;

        let rows_affected = with_pool!(self, pool => {
            query(&sql)
                .bind(&video.url)
                .bind(&video.title)
                .bind(&video.creator)
                .bind(video.created_date)
                .bind(&video.duration)
                .bind(&video.attribution)
                .bind(&video.thumbnail_url)
                .bind(&tags)
                .bind(id)
                .execute(pool)
                .await
                .map_err(|e| db_err("update_video", e))?
                .rows_affected()
        });

        if rows_affected == 0 {
            return Err(TouchlineError::video_not_found(id));
        }

        Ok(video)
    }

    async fn update_license(
        &self,
        video_id: &str,
        update: LicenseUpdate,
    ) -> TouchlineResult<VideoLicense> {
        let mut license = self.find_license(video_id).await?;
        update.apply_to(&mut license)?;

        let sql = self.sql(
            "UPDATE video_licenses SET license_type = ?, start_date = ?, expiration_date = ?, \
             terms = ?, restrictions = ?, territory_restrictions = ?, renewal_terms = ? \
             WHERE video_id = ?",
        );
        let terms = to_json(&license.terms)?;
        let restrictions = to_json(&license.restrictions)?;
        let territories = to_json(&license.territory_restrictions)?;

        let rows_affected = with_pool!(self, pool => {
            query(&sql)
                .bind(license.license_type.as_str())
                .bind(license.start_date)
                .bind(license.expiration_date)
                .bind(&terms)
                .bind(&restrictions)
                .bind(&territories)
                .bind(&license.renewal_terms)
                .bind(video_id)
                .execute(pool)
                .await
                .map_err(|e| db_err("update_license", e))?
                .rows_affected()
        });

        if rows_affected == 0 {
            return Err(TouchlineError::license_not_found(video_id));
        }

        Ok(license)
    }

    async fn delete(&self, id: &str) -> TouchlineResult<()> {
        let delete_license = self.sql("DELETE FROM video_licenses WHERE video_id = ?");
        let delete_video = self.sql("DELETE FROM video_contents WHERE id = ?");

        with_pool!(self, pool => {
            let mut tx = pool.begin().await.map_err(|e| db_err("delete", e))?;

            query(&delete_license)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_err("delete license", e))?;

            let removed = query(&delete_video)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_err("delete video", e))?
                .rows_affected();

            if removed == 0 {
                // Dropping the transaction rolls it back.
                return Err(TouchlineError::video_not_found(id));
            }

            tx.commit().await.map_err(|e| db_err("delete", e))?;
        });

        Ok(())
    }

    async fn find_expiring_licenses(
        &self,
        now: NaiveDateTime,
        until: NaiveDateTime,
    ) -> TouchlineResult<Vec<ExpiringLicense>> {
        let sql = self.sql(&format!(
            "{VIDEO_SELECT} WHERE l.expiration_date > ? AND l.expiration_date < ? \
             ORDER BY l.expiration_date, v.id"
        ));

        let rows: Vec<VideoRow> = with_pool!(self, pool => {
            query_as::<_, VideoRow>(&sql)
                .bind(now)
                .bind(until)
                .fetch_all(pool)
                .await
                .map_err(|e| db_err("find_expiring_licenses", e))?
        });

        rows.into_iter()
            .map(|row| {
                let video = VideoContent::try_from(row)?;
                Ok(ExpiringLicense {
                    video_title: video.title,
                    license: video.license,
                })
            })
            .collect()
    }

    async fn ping(&self) -> bool {
        with_pool!(self, pool => query("SELECT 1").execute(pool).await.is_ok())
    }

    fn backend_name(&self) -> &'static str {
        self.kind()
    }
}

#[async_trait]
impl NotificationStore for Database {
    async fn create_notification(
        &self,
        new: NewNotification,
        created_at: NaiveDateTime,
    ) -> TouchlineResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            notification_type: new.notification_type,
            title: new.title,
            message: new.message,
            status: NotificationStatus::Unread,
            metadata: new.metadata,
            created_at,
        };

        let sql = self.sql(
            "INSERT INTO notifications \
             (id, notification_type, title, message, status, metadata, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        );
        let metadata = to_json(&notification.metadata)?;

        with_pool!(self, pool => {
            query(&sql)
                .bind(&notification.id)
                .bind(notification.notification_type.as_str())
                .bind(&notification.title)
                .bind(&notification.message)
                .bind(notification.status.as_str())
                .bind(&metadata)
                .bind(notification.created_at)
                .execute(pool)
                .await
                .map_err(|e| db_err("create_notification", e))?;
        });

        Ok(notification)
    }

    async fn list_notifications(
        &self,
        status: Option<NotificationStatus>,
    ) -> TouchlineResult<Vec<Notification>> {
        let base = "SELECT id, notification_type, title, message, status, metadata, created_at \
                    FROM notifications";

        let rows: Vec<NotificationRow> = match status {
            Some(status) => {
                let sql = self.sql(&format!(
                    "{base} WHERE status = ? ORDER BY created_at DESC, id"
                ));
                with_pool!(self, pool => {
                    query_as::<_, NotificationRow>(&sql)
                        .bind(status.as_str())
                        .fetch_all(pool)
                        .await
                        .map_err(|e| db_err("list_notifications", e))?
                })
            }
            None => {
                let sql = format!("{base} ORDER BY created_at DESC, id");
                with_pool!(self, pool => {
                    query_as::<_, NotificationRow>(&sql)
                        .fetch_all(pool)
                        .await
                        .map_err(|e| db_err("list_notifications", e))?
                })
            }
        };

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_notification_read(&self, id: &str) -> TouchlineResult<Notification> {
        let update = self.sql("UPDATE notifications SET status = ? WHERE id = ?");
        let select = self.sql(
            "SELECT id, notification_type, title, message, status, metadata, created_at \
             FROM notifications WHERE id = ?",
        );

        let row: Option<NotificationRow> = with_pool!(self, pool => {
            let updated = query(&update)
                .bind(NotificationStatus::Read.as_str())
                .bind(id)
                .execute(pool)
                .await
                .map_err(|e| db_err("mark_notification_read", e))?
                .rows_affected();

            if updated == 0 {
                None
            } else {
                query_as::<_, NotificationRow>(&select)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| db_err("mark_notification_read", e))?
            }
        });

        row.map(Notification::try_from)
            .transpose()?
            .ok_or_else(|| TouchlineError::notification_not_found(id))
    }

    async fn delete_notification(&self, id: &str) -> TouchlineResult<()> {
        let sql = self.sql("DELETE FROM notifications WHERE id = ?");

        let removed = with_pool!(self, pool => {
            query(&sql)
                .bind(id)
                .execute(pool)
                .await
                .map_err(|e| db_err("delete_notification", e))?
                .rows_affected()
        });

        if removed == 0 {
            return Err(TouchlineError::notification_not_found(id));
        }
        Ok(())
    }

    async fn unread_count(&self) -> TouchlineResult<u64> {
        let sql = self.sql("SELECT COUNT(*) FROM notifications WHERE status = ?");

        let count: i64 = with_pool!(self, pool => {
            query_scalar::<_, i64>(&sql)
                .bind(NotificationStatus::Unread.as_str())
                .fetch_one(pool)
                .await
                .map_err(|e| db_err("unread_count", e))?
        });

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
