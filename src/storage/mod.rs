use crate::error::Result;
use crate::track::TrackMetadata;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Database of lyric files that have been assigned to tracks.
///
/// Records are keyed by track location when one is known, and fall back to
/// the `(title, artist, album, tracknum)` tuple otherwise. Every call runs in
/// its own transaction behind a mutex, so the store can be shared through an
/// `Arc` and used from `spawn_blocking`.
pub struct LrcDb {
    conn: Mutex<Connection>,
}

/// A stored track → lyric file association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationRecord {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub tracknum: u32,
    pub location: Option<String>,
    pub lyrcpath: String,
}

const FIND_BY_LOCATION: &str = "SELECT lyrcpath FROM lyrics WHERE location = ?1 LIMIT 1";

// Records assigned without a location belong to the info tuple itself and
// win over located records that happen to share it.
const FIND_BY_INFO: &str = r#"
SELECT lyrcpath FROM lyrics
WHERE title = ?1 AND artist = ?2 AND album = ?3 AND tracknum = ?4
ORDER BY location IS NOT NULL, id
LIMIT 1
"#;

const FIND_UNLOCATED: &str = r#"
SELECT id FROM lyrics
WHERE location IS NULL AND title = ?1 AND artist = ?2 AND album = ?3 AND tracknum = ?4
ORDER BY id
LIMIT 1
"#;

impl LrcDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened lyric association db");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.lock().execute_batch(
            r#"
CREATE TABLE IF NOT EXISTS lyrics (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  title TEXT,
  artist TEXT,
  album TEXT,
  tracknum INTEGER,
  location TEXT UNIQUE ON CONFLICT REPLACE,
  lyrcpath TEXT
);
"#,
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the guard cannot leave a transaction open:
        // rusqlite rolls back on drop.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Assign the lyric file at `lyrcpath` to `track`.
    ///
    /// When a record with the same location exists only its lyric path is
    /// updated; otherwise a new record is inserted from the track metadata.
    /// Without a location the record with no location and the same info
    /// tuple plays that role.
    pub fn assign(&self, track: &TrackMetadata, lyrcpath: &str) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = match track.location() {
            Some(location) => tx
                .query_row(
                    "SELECT id FROM lyrics WHERE location = ?1",
                    params![location],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?,
            None => {
                let info = track.info_key();
                tx.query_row(
                    FIND_UNLOCATED,
                    params![info.title, info.artist, info.album, info.tracknum],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?
            }
        };

        if let Some(id) = existing {
            tracing::debug!(id, lyrcpath, location = ?track.location(), "update lyric assignment");
            tx.execute(
                "UPDATE lyrics SET lyrcpath = ?1 WHERE id = ?2",
                params![lyrcpath, id],
            )?;
        } else {
            let info = track.info_key();
            tracing::debug!(
                lyrcpath,
                title = info.title,
                artist = info.artist,
                album = info.album,
                tracknum = info.tracknum,
                location = ?track.location(),
                "insert lyric assignment"
            );
            tx.execute(
                r#"
INSERT INTO lyrics(title, artist, album, tracknum, location, lyrcpath)
VALUES(?1, ?2, ?3, ?4, ?5, ?6)
"#,
                params![
                    info.title,
                    info.artist,
                    info.album,
                    info.tracknum,
                    track.location(),
                    lyrcpath
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete every association that `find` could return for `track`.
    ///
    /// Removes records matching the location and, independently, records
    /// matching the info tuple. Returns the number of removed rows.
    pub fn delete(&self, track: &TrackMetadata) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut removed = 0;
        if let Some(location) = track.location() {
            removed += tx.execute("DELETE FROM lyrics WHERE location = ?1", params![location])?;
        }

        let info = track.info_key();
        removed += tx.execute(
            "DELETE FROM lyrics WHERE title = ?1 AND artist = ?2 AND album = ?3 AND tracknum = ?4",
            params![info.title, info.artist, info.album, info.tracknum],
        )?;

        tx.commit()?;
        tracing::debug!(removed, track = %track.display_name(), "deleted lyric assignments");
        Ok(removed)
    }

    /// Find the lyric path assigned to `track`.
    ///
    /// Looks up by location first, then by info tuple. `Some("")` is a valid
    /// result distinct from `None`.
    pub fn find(&self, track: &TrackMetadata) -> Result<Option<String>> {
        let conn = self.lock();

        if let Some(location) = track.location() {
            let found = query_lyrcpath(&conn, FIND_BY_LOCATION, params![location])?;
            tracing::debug!(location, ?found, "find by location");
            if found.is_some() {
                return Ok(found);
            }
        }

        let info = track.info_key();
        let found = query_lyrcpath(
            &conn,
            FIND_BY_INFO,
            params![info.title, info.artist, info.album, info.tracknum],
        )?;
        tracing::debug!(?info, ?found, "find by info");
        Ok(found)
    }

    /// All stored associations, oldest first.
    pub fn records(&self) -> Result<Vec<AssociationRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            r#"
SELECT id, title, artist, album, tracknum, location, lyrcpath
FROM lyrics
ORDER BY id
"#,
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(AssociationRecord {
                    id: row.get(0)?,
                    title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    artist: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    album: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    tracknum: row.get::<_, Option<u32>>(4)?.unwrap_or(0),
                    location: row.get(5)?,
                    lyrcpath: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }
}

fn query_lyrcpath(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Option<String>> {
    let found = conn
        .query_row(sql, params, |row| row.get::<_, Option<String>>(0))
        .optional()?;
    Ok(found.map(Option::unwrap_or_default))
}
