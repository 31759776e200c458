pub const SCHEMA: &str = r#"
-- Photos table: core photo metadata
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    filename TEXT NOT NULL,
    taken_at TEXT,
    location TEXT,
    camera_model TEXT,
    gps_latitude REAL,
    gps_longitude REAL,

    -- Text attached by the processing collaborator (OCR)
    extracted_text TEXT,

    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_photos_taken_at ON photos(taken_at);
CREATE INDEX IF NOT EXISTS idx_photos_camera_model ON photos(camera_model);

-- Tags: free-text labels, unique and case-sensitive
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Photo to tag mapping
CREATE TABLE IF NOT EXISTS photo_tags (
    photo_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (photo_id, tag_id),
    FOREIGN KEY (photo_id) REFERENCES photos(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_photo_tags_tag ON photo_tags(tag_id);
"#;

/// Additive migrations run on every startup. Each statement must be
/// safe to fail against a database that already has it (the runner
/// ignores individual errors).
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE photos ADD COLUMN extracted_text TEXT",
];
