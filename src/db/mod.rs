//! Metadata store: a normalized photos/tags/photo_tags schema over SQLite.

mod schema;

pub mod error;
pub mod sqlite;

pub use error::StoreError;
pub use schema::{MIGRATIONS, SCHEMA};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use sqlite::SqliteDb;

/// One photo's metadata row, with its tag set resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Photo {
    pub id: i64,
    pub path: String,
    pub filename: String,
    pub taken_at: Option<String>,
    pub location: Option<String>,
    pub camera_model: Option<String>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub extracted_text: Option<String>,
    pub tags: Vec<String>,
}

/// Fields accepted when creating a record.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPhoto {
    pub path: String,
    pub filename: String,
    #[serde(default)]
    pub taken_at: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub camera_model: Option<String>,
    #[serde(default)]
    pub gps_latitude: Option<f64>,
    #[serde(default)]
    pub gps_longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Conjunctive listing predicates. Every present field must match.
#[derive(Debug, Clone, Default)]
pub struct PhotoFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub camera_model: Option<String>,
}

/// Store handle shared across request handlers.
///
/// Holds the single long-lived connection behind a mutex; every call is
/// a scoped acquisition. Consistency past that is SQLite's problem.
pub struct Database {
    inner: Mutex<SqliteDb>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = SqliteDb::open(path)?;
        Ok(Self {
            inner: Mutex::new(db),
        })
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        self.db().initialize()
    }

    fn db(&self) -> MutexGuard<'_, SqliteDb> {
        // A poisoned lock only means another request panicked mid-call;
        // the connection itself is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_photo(&self, photo: &NewPhoto) -> Result<i64, StoreError> {
        self.db().insert_photo(photo)
    }

    pub fn get_photo(&self, id: i64) -> Result<Option<Photo>, StoreError> {
        self.db().get_photo(id)
    }

    pub fn list_photos(&self, filter: &PhotoFilter) -> Result<Vec<Photo>, StoreError> {
        self.db().list_photos(filter)
    }

    pub fn update_photo_tags(
        &self,
        photo_id: i64,
        add: &[String],
        remove: &[String],
    ) -> Result<(), StoreError> {
        self.db().update_photo_tags(photo_id, add, remove)
    }

    pub fn attach_processing(
        &self,
        photo_id: i64,
        tags: &[String],
        extracted_text: &str,
    ) -> Result<(), StoreError> {
        self.db().attach_processing(photo_id, tags, extracted_text)
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.db().list_tags()
    }

    pub fn tags_for_photo(&self, photo_id: i64) -> Result<Vec<String>, StoreError> {
        self.db().tags_for_photo(photo_id)
    }

    pub fn delete_tag(&self, tag_id: i64) -> Result<(), StoreError> {
        self.db().delete_tag(tag_id)
    }
}
