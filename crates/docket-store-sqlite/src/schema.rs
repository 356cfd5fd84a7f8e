//! SQL schema for the Docket SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS roles (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,   -- 'administrator' | 'user'
    description TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,        -- argon2 PHC string
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    middle_name   TEXT,
    role_id       INTEGER NOT NULL REFERENCES roles(id)
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    persistent INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS persons (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    reg_number        TEXT NOT NULL UNIQUE,
    first_name        TEXT NOT NULL,
    last_name         TEXT NOT NULL,
    patronymic        TEXT,
    address           TEXT,
    convictions_count INTEGER NOT NULL DEFAULT 0 CHECK (convictions_count >= 0)
);

CREATE TABLE IF NOT EXISTS incidents (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    reg_number        TEXT NOT NULL UNIQUE,
    registration_date TEXT NOT NULL,    -- fixed-width RFC 3339 UTC
    short_description TEXT NOT NULL,
    decision_status   TEXT,
    case_reg_number   TEXT
);

-- Referenced incidents and persons cannot be deleted.
CREATE TABLE IF NOT EXISTS incident_persons (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    incident_id INTEGER NOT NULL REFERENCES incidents(id) ON DELETE RESTRICT,
    person_id   INTEGER NOT NULL REFERENCES persons(id)   ON DELETE RESTRICT,
    role        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS incidents_registered_idx ON incidents(registration_date);
CREATE INDEX IF NOT EXISTS incident_persons_incident_idx ON incident_persons(incident_id);
CREATE INDEX IF NOT EXISTS incident_persons_person_idx   ON incident_persons(person_id);
CREATE INDEX IF NOT EXISTS sessions_expires_idx ON sessions(expires_at);

PRAGMA user_version = 1;
";
