//! Database schema and migrations for fileshare.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script executed in order. The schema_version
/// table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id              TEXT PRIMARY KEY,                 -- UUID v4
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password        TEXT NOT NULL,                    -- Argon2 hash
    display_name    TEXT,
    created_at      TEXT NOT NULL,
    last_sign_in_at TEXT
);
"#,
    // v2: refresh tokens
    r#"
CREATE TABLE refresh_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  INTEGER NOT NULL,                    -- unix seconds
    created_at  TEXT NOT NULL,
    revoked_at  TEXT
);

CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id);
"#,
    // v3: buckets and the object index
    r#"
CREATE TABLE buckets (
    name        TEXT PRIMARY KEY,
    public      INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE objects (
    id          TEXT PRIMARY KEY,                    -- UUID v4
    bucket      TEXT NOT NULL REFERENCES buckets(name),
    path        TEXT NOT NULL,                       -- {owner_id}/{name}
    owner_id    TEXT NOT NULL,
    name        TEXT NOT NULL,
    stored_name TEXT NOT NULL,                       -- blob file name
    size        INTEGER NOT NULL,
    mimetype    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (bucket, path)
);

CREATE INDEX idx_objects_owner ON objects(bucket, owner_id);
"#,
    // v4: shares
    r#"
CREATE TABLE shares (
    file_path   TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL,
    file_id     TEXT NOT NULL,
    created_by  TEXT
);

CREATE INDEX idx_shares_file_id ON shares(file_id);
"#,
];
