//! Database schema and migrations for prepboard.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded. All timestamps are stored as unix seconds.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: registered identities
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password    TEXT NOT NULL,                    -- Argon2 hash
    role        TEXT NOT NULL DEFAULT 'member',   -- 'member', 'admin'
    created_at  INTEGER NOT NULL
);
"#,
    // v2: one-time verification codes
    r#"
CREATE TABLE one_time_codes (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    email               TEXT NOT NULL COLLATE NOCASE,
    code                TEXT NOT NULL,
    purpose             TEXT NOT NULL,            -- 'signup', 'reset'
    pending_name        TEXT,                     -- signup only
    pending_password    TEXT,                     -- signup only, Argon2 hash
    expires_at          INTEGER NOT NULL,
    created_at          INTEGER NOT NULL
);

CREATE INDEX idx_one_time_codes_email ON one_time_codes(email);
CREATE INDEX idx_one_time_codes_expires_at ON one_time_codes(expires_at);
"#,
    // v3: interview-experience submissions
    r#"
CREATE TABLE submissions (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id            INTEGER NOT NULL REFERENCES users(id),
    name                TEXT NOT NULL,
    rounds              TEXT NOT NULL DEFAULT '[]',   -- JSON array
    year                INTEGER,
    college             TEXT,
    status              TEXT NOT NULL DEFAULT 'pending',  -- 'pending', 'approved', 'rejected'
    rejection_reason    TEXT NOT NULL DEFAULT '',
    created_at          INTEGER NOT NULL
);

CREATE INDEX idx_submissions_owner_id ON submissions(owner_id);
CREATE INDEX idx_submissions_status ON submissions(status);
CREATE INDEX idx_submissions_created_at ON submissions(created_at);
"#,
    // v4: Unicode case-folded name for search
    r#"
ALTER TABLE submissions ADD COLUMN name_folded TEXT NOT NULL DEFAULT '';

-- Existing rows get SQLite's ASCII-only lower(); new rows are folded on insert.
UPDATE submissions SET name_folded = lower(name);
"#,
];
