//! SQL schema for the GeoBase SQLite store.
//!
//! Executed once at connection startup. Reverse-index columns hold JSON
//! arrays of UUID strings and are maintained with the JSON1 functions.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS companies (
    company_id      TEXT PRIMARY KEY,
    name            TEXT NOT NULL UNIQUE,
    description     TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL,
    member_user_ids TEXT NOT NULL DEFAULT '[]',   -- JSON array, cache of users.company_id
    storypoint_ids  TEXT NOT NULL DEFAULT '[]'    -- JSON array, cache of storypoints.company_id
);

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    company_id    TEXT NOT NULL REFERENCES companies(company_id),
    fullname      TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,           -- global: login has no company context
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS storypoints (
    storypoint_id TEXT PRIMARY KEY,
    company_id    TEXT NOT NULL REFERENCES companies(company_id),
    created_by    TEXT NOT NULL,                  -- no FK: creators may be deleted
    lat           REAL NOT NULL,
    lon           REAL NOT NULL,
    title         TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    history       TEXT NOT NULL DEFAULT '[]',
    file_ids      TEXT NOT NULL DEFAULT '[]',     -- JSON array, cache of attachments.storypoint_id
    created_at    TEXT NOT NULL,
    UNIQUE (company_id, lat, lon)
);

CREATE TABLE IF NOT EXISTS attachments (
    attachment_id TEXT PRIMARY KEY,
    storypoint_id TEXT NOT NULL REFERENCES storypoints(storypoint_id),
    company_id    TEXT NOT NULL,
    created_by    TEXT NOT NULL,
    filename      TEXT NOT NULL,
    size          INTEGER NOT NULL,
    created_at    TEXT NOT NULL,
    UNIQUE (storypoint_id, filename)
);

-- Append-only; never pruned.
CREATE TABLE IF NOT EXISTS revoked_tokens (
    token      TEXT PRIMARY KEY,
    revoked_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS users_company_idx       ON users(company_id);
CREATE INDEX IF NOT EXISTS storypoints_company_idx ON storypoints(company_id);

PRAGMA user_version = 1;
";
