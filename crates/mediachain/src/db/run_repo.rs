//! Run repository — persistence for the `runs` table.
//!
//! The full run record is kept as a JSON `body`; the remaining columns are
//! there for ordering and ad-hoc inspection.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw run row from the database.
#[derive(Debug, Clone)]
pub struct RunRow {
    pub id: String,
    pub blueprint: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub body: String,
}

impl RunRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            blueprint: row.get("blueprint")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            body: row.get("body")?,
        })
    }
}

/// Inserts a run or overwrites every column except `created_at`.
pub fn upsert(db: &Database, run: &RunRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO runs (id, blueprint, status, created_at, updated_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                blueprint = excluded.blueprint,
                status = excluded.status,
                updated_at = excluded.updated_at,
                body = excluded.body",
            params![
                run.id,
                run.blueprint,
                run.status,
                run.created_at,
                run.updated_at,
                run.body,
            ],
        )?;
        Ok(())
    })
}

/// Finds a run by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RunRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM runs WHERE id = ?1",
                params![id],
                RunRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// The `limit` most recently created runs, newest first.
pub fn list_recent(db: &Database, limit: usize) -> Result<Vec<RunRow>, DatabaseError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM runs ORDER BY created_at DESC, id ASC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], RunRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, created_at: &str) -> RunRow {
        RunRow {
            id: id.to_string(),
            blueprint: "social_pack".to_string(),
            status: "pending".to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            body: "{}".to_string(),
        }
    }

    #[test]
    fn test_upsert_and_find() {
        let db = Database::open_in_memory().unwrap();
        upsert(&db, &row("r1", "2026-01-01T00:00:00Z")).unwrap();

        let found = find_by_id(&db, "r1").unwrap().unwrap();
        assert_eq!(found.blueprint, "social_pack");
        assert!(find_by_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_upsert_keeps_created_at() {
        let db = Database::open_in_memory().unwrap();
        upsert(&db, &row("r1", "2026-01-01T00:00:00Z")).unwrap();

        let mut updated = row("r1", "2027-01-01T00:00:00Z");
        updated.status = "completed".to_string();
        upsert(&db, &updated).unwrap();

        let found = find_by_id(&db, "r1").unwrap().unwrap();
        assert_eq!(found.status, "completed");
        assert_eq!(found.created_at, "2026-01-01T00:00:00Z");
        assert_eq!(found.updated_at, "2027-01-01T00:00:00Z");
    }

    #[test]
    fn test_list_recent_newest_first() {
        let db = Database::open_in_memory().unwrap();
        upsert(&db, &row("old", "2026-01-01T00:00:00Z")).unwrap();
        upsert(&db, &row("new", "2026-03-01T00:00:00Z")).unwrap();
        upsert(&db, &row("mid", "2026-02-01T00:00:00Z")).unwrap();

        let ids: Vec<String> = list_recent(&db, 10).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let ids: Vec<String> = list_recent(&db, 2).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }
}
