//! SQLite store implementation.

use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;

use super::error::StoreError;
use super::schema::{MIGRATIONS, SCHEMA};
use super::{NewPhoto, Photo, PhotoFilter, Tag};

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

impl SqliteDb {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn)?;
        Ok(Self { conn })
    }

    fn apply_pragmas(conn: &Connection) -> Result<(), StoreError> {
        // Cascading tag deletion depends on foreign keys being enforced.
        conn.pragma_update(None, "foreign_keys", true)?;
        // Substring filters are specified as case-sensitive matches.
        conn.pragma_update(None, "case_sensitive_like", true)?;
        Ok(())
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    // ========================================================================
    // Photo operations
    // ========================================================================

    /// Insert a new photo record. A duplicate path is reported as
    /// [`StoreError::AlreadyExists`] and leaves the table untouched.
    pub fn insert_photo(&self, photo: &NewPhoto) -> Result<i64, StoreError> {
        let result = self.conn.execute(
            r#"
            INSERT INTO photos (path, filename, taken_at, location, camera_model, gps_latitude, gps_longitude)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                photo.path,
                photo.filename,
                photo.taken_at,
                photo.location,
                photo.camera_model,
                photo.gps_latitude,
                photo.gps_longitude,
            ],
        );
        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if StoreError::is_unique_violation(&e) => Err(StoreError::AlreadyExists {
                path: photo.path.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_photo(&self, id: i64) -> Result<Option<Photo>, StoreError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, path, filename, taken_at, location, camera_model,
                       gps_latitude, gps_longitude, extracted_text
                FROM photos
                WHERE id = ?
                "#,
                [id],
                row_to_photo,
            )
            .optional()?;

        match row {
            Some(mut photo) => {
                photo.tags = self.tags_for_photo(photo.id)?;
                Ok(Some(photo))
            }
            None => Ok(None),
        }
    }

    pub fn photo_exists(&self, id: i64) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM photos WHERE id = ?", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// List photos matching every predicate in `filter`.
    ///
    /// Tag filtering uses AND semantics: a photo matches only if it carries
    /// all of the requested tags. Substring filters match case-sensitively
    /// with LIKE wildcards escaped.
    pub fn list_photos(&self, filter: &PhotoFilter) -> Result<Vec<Photo>, StoreError> {
        let mut query = String::from(
            r#"
            SELECT p.id, p.path, p.filename, p.taken_at, p.location, p.camera_model,
                   p.gps_latitude, p.gps_longitude, p.extracted_text
            FROM photos p
            "#,
        );
        let mut params: Vec<String> = Vec::new();

        if !filter.tags.is_empty() {
            query.push_str(
                "JOIN photo_tags pt ON pt.photo_id = p.id JOIN tags t ON t.id = pt.tag_id\n",
            );
        }
        query.push_str("WHERE 1=1\n");

        if let Some(date_from) = &filter.date_from {
            query.push_str("AND p.taken_at >= ?\n");
            params.push(date_from.clone());
        }
        if let Some(date_to) = &filter.date_to {
            query.push_str("AND p.taken_at <= ?\n");
            params.push(date_to.clone());
        }
        if let Some(location) = &filter.location {
            query.push_str("AND p.location LIKE ? ESCAPE '\\'\n");
            params.push(like_pattern(location));
        }
        if let Some(camera_model) = &filter.camera_model {
            query.push_str("AND p.camera_model LIKE ? ESCAPE '\\'\n");
            params.push(like_pattern(camera_model));
        }
        if !filter.tags.is_empty() {
            let placeholders = vec!["?"; filter.tags.len()].join(",");
            query.push_str(&format!(
                "AND t.name IN ({placeholders}) GROUP BY p.id HAVING COUNT(DISTINCT t.id) = {}\n",
                filter.tags.len()
            ));
            params.extend(filter.tags.iter().cloned());
        }

        let mut stmt = self.conn.prepare(&query)?;
        let mut photos: Vec<Photo> = stmt
            .query_map(rusqlite::params_from_iter(params), row_to_photo)?
            .collect::<Result<_, _>>()?;

        for photo in &mut photos {
            photo.tags = self.tags_for_photo(photo.id)?;
        }
        Ok(photos)
    }

    // ========================================================================
    // Tag operations
    // ========================================================================

    /// Replace a photo's tag set with `(current ∪ add) − remove`.
    ///
    /// Additions run before removals, so a tag listed in both ends up
    /// removed. Input lists are deduplicated as sets; names compare
    /// case-sensitively. The whole update is one transaction.
    pub fn update_photo_tags(
        &self,
        photo_id: i64,
        add: &[String],
        remove: &[String],
    ) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;

        let exists = tx
            .query_row("SELECT 1 FROM photos WHERE id = ?", [photo_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::photo_not_found(photo_id));
        }

        for name in add.iter().collect::<BTreeSet<_>>() {
            let tag_id = get_or_create_tag(&tx, name)?;
            tx.execute(
                "INSERT OR IGNORE INTO photo_tags (photo_id, tag_id) VALUES (?, ?)",
                rusqlite::params![photo_id, tag_id],
            )?;
        }
        for name in remove.iter().collect::<BTreeSet<_>>() {
            tx.execute(
                r#"
                DELETE FROM photo_tags
                WHERE photo_id = ?
                  AND tag_id = (SELECT id FROM tags WHERE name = ?)
                "#,
                rusqlite::params![photo_id, name],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Attach processing output (auto-generated tags and OCR text) to a record.
    pub fn attach_processing(
        &self,
        photo_id: i64,
        tags: &[String],
        extracted_text: &str,
    ) -> Result<(), StoreError> {
        if !self.photo_exists(photo_id)? {
            return Err(StoreError::photo_not_found(photo_id));
        }
        if !extracted_text.is_empty() {
            self.conn.execute(
                "UPDATE photos SET extracted_text = ? WHERE id = ?",
                rusqlite::params![extracted_text, photo_id],
            )?;
        }
        self.update_photo_tags(photo_id, tags, &[])
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM tags ORDER BY name")?;
        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(tags)
    }

    pub fn tags_for_photo(&self, photo_id: i64) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.name
            FROM tags t
            JOIN photo_tags pt ON pt.tag_id = t.id
            WHERE pt.photo_id = ?
            ORDER BY t.name
            "#,
        )?;
        let tags = stmt
            .query_map([photo_id], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        Ok(tags)
    }

    /// Delete a tag globally. Foreign keys cascade the association rows.
    pub fn delete_tag(&self, tag_id: i64) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?", [tag_id])?;
        if deleted == 0 {
            return Err(StoreError::tag_not_found(tag_id));
        }
        Ok(())
    }
}

/// Look a tag up by exact name, creating it if absent.
fn get_or_create_tag(conn: &Connection, name: &str) -> Result<i64, StoreError> {
    let existing = conn
        .query_row("SELECT id FROM tags WHERE name = ?", [name], |row| {
            row.get(0)
        })
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute("INSERT INTO tags (name) VALUES (?)", [name])?;
    Ok(conn.last_insert_rowid())
}

fn row_to_photo(row: &rusqlite::Row) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        path: row.get(1)?,
        filename: row.get(2)?,
        taken_at: row.get(3)?,
        location: row.get(4)?,
        camera_model: row.get(5)?,
        gps_latitude: row.get(6)?,
        gps_longitude: row.get(7)?,
        extracted_text: row.get(8)?,
        tags: Vec::new(),
    })
}

/// Turn user input into a `%...%` LIKE pattern that matches the input
/// literally, with `%`, `_` and the escape character itself escaped.
fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_db(dir: &tempfile::TempDir) -> SqliteDb {
        let db = SqliteDb::open(&dir.path().join("photonav.db")).unwrap();
        db.initialize().unwrap();
        db
    }

    fn sample_photo(path: &str) -> NewPhoto {
        NewPhoto {
            path: path.to_string(),
            filename: path.rsplit('/').next().unwrap().to_string(),
            taken_at: Some("2023-07-15 10:30:00".to_string()),
            location: Some("Harbor".to_string()),
            camera_model: Some("Canon EOS R5".to_string()),
            gps_latitude: None,
            gps_longitude: None,
        }
    }

    fn tagged(db: &SqliteDb, path: &str, tags: &[&str]) -> i64 {
        let id = db.insert_photo(&sample_photo(path)).unwrap();
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        db.update_photo_tags(id, &tags, &[]).unwrap();
        id
    }

    #[test]
    fn duplicate_path_is_a_conflict_not_a_second_row() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let id = db.insert_photo(&sample_photo("/p/a.jpg")).unwrap();
        let err = db.insert_photo(&sample_photo("/p/a.jpg")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { ref path } if path == "/p/a.jpg"));

        let all = db.list_photos(&PhotoFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
    }

    #[test]
    fn tag_filter_requires_all_requested_tags() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let both = tagged(&db, "/p/both.jpg", &["City", "Landscape"]);
        tagged(&db, "/p/city.jpg", &["City"]);
        tagged(&db, "/p/none.jpg", &[]);

        let filter = PhotoFilter {
            tags: vec!["City".to_string(), "Landscape".to_string()],
            ..Default::default()
        };
        let matches = db.list_photos(&filter).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, both);
    }

    #[test]
    fn tag_names_are_case_sensitive() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        tagged(&db, "/p/a.jpg", &["City"]);
        let filter = PhotoFilter {
            tags: vec!["city".to_string()],
            ..Default::default()
        };
        assert!(db.list_photos(&filter).unwrap().is_empty());
    }

    #[test]
    fn remove_wins_when_a_tag_is_added_and_removed_together() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let id = db.insert_photo(&sample_photo("/p/a.jpg")).unwrap();
        db.update_photo_tags(id, &["x".to_string()], &["x".to_string()])
            .unwrap();
        assert!(db.tags_for_photo(id).unwrap().is_empty());
    }

    #[test]
    fn tag_update_merges_as_a_set() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let id = tagged(&db, "/p/a.jpg", &["sunset", "beach"]);
        db.update_photo_tags(
            id,
            &["beach".to_string(), "summer".to_string()],
            &["sunset".to_string()],
        )
        .unwrap();
        assert_eq!(db.tags_for_photo(id).unwrap(), vec!["beach", "summer"]);
    }

    #[test]
    fn deleting_a_tag_cascades_to_every_record() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        tagged(&db, "/p/a.jpg", &["trip", "City"]);
        tagged(&db, "/p/b.jpg", &["trip"]);

        let trip = db
            .list_tags()
            .unwrap()
            .into_iter()
            .find(|t| t.name == "trip")
            .unwrap();
        db.delete_tag(trip.id).unwrap();

        for photo in db.list_photos(&PhotoFilter::default()).unwrap() {
            assert!(!photo.tags.contains(&"trip".to_string()));
        }
        let filter = PhotoFilter {
            tags: vec!["trip".to_string()],
            ..Default::default()
        };
        assert!(db.list_photos(&filter).unwrap().is_empty());
    }

    #[test]
    fn deleting_an_unknown_tag_is_not_found() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);
        let err = db.delete_tag(9999).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "tag", .. }));
    }

    #[test]
    fn tag_update_on_unknown_photo_is_not_found() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);
        let err = db
            .update_photo_tags(42, &["x".to_string()], &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "photo", id: 42 }));
    }

    #[test]
    fn date_and_camera_filters_combine_conjunctively() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let mut jan = sample_photo("/p/jan.jpg");
        jan.taken_at = Some("2023-01-20 14:30:00".to_string());
        jan.camera_model = Some("Sony Alpha 7 III".to_string());
        db.insert_photo(&jan).unwrap();

        let mut feb = sample_photo("/p/feb.jpg");
        feb.taken_at = Some("2023-02-01 09:15:00".to_string());
        feb.camera_model = Some("Sony Alpha 7 III".to_string());
        db.insert_photo(&feb).unwrap();

        let filter = PhotoFilter {
            date_from: Some("2023-01-01".to_string()),
            date_to: Some("2023-01-31".to_string()),
            camera_model: Some("Sony".to_string()),
            ..Default::default()
        };
        let matches = db.list_photos(&filter).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "/p/jan.jpg");
    }

    #[test]
    fn substring_filters_are_case_sensitive_and_literal() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let mut photo = sample_photo("/p/a.jpg");
        photo.location = Some("100% Harbor".to_string());
        db.insert_photo(&photo).unwrap();

        let lowercase = PhotoFilter {
            location: Some("harbor".to_string()),
            ..Default::default()
        };
        assert!(db.list_photos(&lowercase).unwrap().is_empty());

        let literal_percent = PhotoFilter {
            location: Some("100% Ha".to_string()),
            ..Default::default()
        };
        assert_eq!(db.list_photos(&literal_percent).unwrap().len(), 1);

        // `%` must not act as a wildcard
        let wildcard_abuse = PhotoFilter {
            location: Some("100%X".to_string()),
            ..Default::default()
        };
        assert!(db.list_photos(&wildcard_abuse).unwrap().is_empty());
    }

    #[test]
    fn photo_tags_come_back_alphabetical() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let id = tagged(&db, "/p/a.jpg", &["zebra", "alpha", "mid"]);
        assert_eq!(db.tags_for_photo(id).unwrap(), vec!["alpha", "mid", "zebra"]);
    }

    #[test]
    fn attach_processing_stores_text_and_tags() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let id = db.insert_photo(&sample_photo("/p/a.jpg")).unwrap();
        db.attach_processing(id, &["cat".to_string()], "Welcome to the park")
            .unwrap();

        let photo = db.get_photo(id).unwrap().unwrap();
        assert_eq!(photo.tags, vec!["cat"]);
        assert_eq!(photo.extracted_text.as_deref(), Some("Welcome to the park"));

        let err = db.attach_processing(999, &[], "").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
