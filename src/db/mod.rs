mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::*;

/// SQLite-backed stand-in for the user directory and record store.
///
/// The directory partitions (`residents`, `collectors`) are owned by the
/// client app's registration flow; this layer only queries them by
/// username and point-updates fields on located documents.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const USER_COLUMNS: &str = "id, username, password, first_name, last_name, email, phone, \
     full_address, region, city, barangay, latitude, longitude, push_token, \
     reset_code, reset_timestamp_ms, created_at";

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "gtrack")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("gtrack.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Directory operations
    // ============================================================

    pub fn create_user(&self, user_type: UserType, input: CreateUserInput) -> Result<User> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            &format!(
                "INSERT INTO {} (id, username, password, first_name, last_name, email, phone, \
                 full_address, region, city, barangay, latitude, longitude, push_token, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                user_type.partition()
            ),
            rusqlite::params![
                id.to_string(),
                &input.username,
                &input.password,
                &input.first_name,
                &input.last_name,
                &input.email,
                &input.phone,
                &input.full_address,
                &input.region,
                &input.city,
                &input.barangay,
                input.latitude,
                input.longitude,
                &input.push_token,
                now.to_rfc3339(),
            ],
        )?;

        Ok(User {
            id,
            username: input.username,
            password: input.password,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            full_address: input.full_address,
            region: input.region,
            city: input.city,
            barangay: input.barangay,
            latitude: input.latitude,
            longitude: input.longitude,
            push_token: input.push_token,
            reset_code: None,
            reset_timestamp_ms: None,
            created_at: now,
        })
    }

    /// Exact-match lookup by username within a partition. Usernames are
    /// not unique; the first match (insertion order) wins.
    pub fn find_user_by_username(
        &self,
        user_type: UserType,
        username: &str,
    ) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM {} WHERE username = ? LIMIT 1",
            user_type.partition()
        ))?;

        let mut rows = stmt.query([username])?;
        match rows.next()? {
            Some(row) => Ok(Some(user_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// All residents, optionally narrowed to a single username for
    /// targeted test/debug runs.
    pub fn list_residents(&self, target_username: Option<&str>) -> Result<Vec<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let (sql, params): (String, Vec<String>) = match target_username {
            Some(username) => (
                format!("SELECT {USER_COLUMNS} FROM residents WHERE username = ?"),
                vec![username.to_string()],
            ),
            None => (format!("SELECT {USER_COLUMNS} FROM residents"), vec![]),
        };

        let mut stmt = conn.prepare(&sql)?;
        let residents = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                user_from_row(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(residents)
    }

    /// Store a freshly issued OTP. Both transient fields are written in
    /// one statement; any prior outstanding code is overwritten.
    pub fn set_reset_state(
        &self,
        user_type: UserType,
        id: Uuid,
        code: &str,
        timestamp_ms: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            &format!(
                "UPDATE {} SET reset_code = ?, reset_timestamp_ms = ? WHERE id = ?",
                user_type.partition()
            ),
            rusqlite::params![code, timestamp_ms, id.to_string()],
        )?;
        Ok(())
    }

    /// Replace the password and clear both reset fields in a single
    /// statement, so the transient pair can never be half-cleared.
    pub fn complete_password_reset(
        &self,
        user_type: UserType,
        id: Uuid,
        new_password: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            &format!(
                "UPDATE {} SET password = ?, reset_code = NULL, reset_timestamp_ms = NULL \
                 WHERE id = ?",
                user_type.partition()
            ),
            rusqlite::params![new_password, id.to_string()],
        )?;
        Ok(())
    }

    // ============================================================
    // Notification records
    // ============================================================

    pub fn insert_notification(
        &self,
        resident_id: Uuid,
        username: &str,
        message: &str,
    ) -> Result<NotificationRecord> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO notifications (id, resident_id, username, message, read, created_at)
             VALUES (?, ?, ?, ?, 0, ?)",
            rusqlite::params![
                id.to_string(),
                resident_id.to_string(),
                username,
                message,
                now.to_rfc3339(),
            ],
        )?;

        Ok(NotificationRecord {
            id,
            resident_id,
            username: username.to_string(),
            message: message.to_string(),
            read: false,
            created_at: now,
        })
    }

    pub fn notifications_for_resident(&self, resident_id: Uuid) -> Result<Vec<NotificationRecord>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, resident_id, username, message, read, created_at
             FROM notifications WHERE resident_id = ? ORDER BY created_at DESC",
        )?;

        let records = stmt
            .query_map([resident_id.to_string()], |row| {
                Ok(NotificationRecord {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    resident_id: parse_uuid(row.get::<_, String>(1)?),
                    username: row.get(2)?,
                    message: row.get(3)?,
                    read: row.get::<_, i32>(4)? != 0,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE notifications SET read = 1 WHERE id = ?",
            [id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Cooldown entries
    // ============================================================

    pub fn get_cooldown(&self, resident_id: Uuid) -> Result<Option<i64>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT last_notified_at_ms FROM cooldown_entries WHERE resident_id = ?",
        )?;
        let mut rows = stmt.query([resident_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn set_cooldown(&self, resident_id: Uuid, last_notified_at_ms: i64) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO cooldown_entries (resident_id, last_notified_at_ms) VALUES (?, ?)
             ON CONFLICT(resident_id) DO UPDATE SET last_notified_at_ms = excluded.last_notified_at_ms",
            rusqlite::params![resident_id.to_string(), last_notified_at_ms],
        )?;
        Ok(())
    }

    pub fn clear_cooldown(&self, resident_id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM cooldown_entries WHERE resident_id = ?",
            [resident_id.to_string()],
        )?;
        Ok(rows > 0)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        username: row.get(1)?,
        password: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        full_address: row.get(7)?,
        region: row.get(8)?,
        city: row.get(9)?,
        barangay: row.get(10)?,
        latitude: row.get(11)?,
        longitude: row.get(12)?,
        push_token: row.get(13)?,
        reset_code: row.get(14)?,
        reset_timestamp_ms: row.get(15)?,
        created_at: parse_datetime(row.get::<_, String>(16)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
