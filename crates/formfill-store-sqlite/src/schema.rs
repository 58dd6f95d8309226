//! SQL schema for the formfill SQLite store.
//!
//! Executed at every open; `PRAGMA user_version` records the layout so later
//! migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per user; flat_json is the whole FlatProfile in schema order.
-- The *_fold columns hold Unicode-lowercased copies for search; SQLite's
-- lower() only folds ASCII.
CREATE TABLE IF NOT EXISTS profiles (
    email           TEXT PRIMARY KEY,
    first_name_fold TEXT NOT NULL DEFAULT '',
    last_name_fold  TEXT NOT NULL DEFAULT '',
    email_fold      TEXT NOT NULL DEFAULT '',
    flat_json       TEXT NOT NULL,
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at      TEXT NOT NULL
);

-- owner_id '' is the unpartitioned mapping for a page.
-- version is bumped on every write and checked by compare-and-swap.
CREATE TABLE IF NOT EXISTS mappings (
    page_id     TEXT NOT NULL,
    owner_id    TEXT NOT NULL DEFAULT '',
    fields_json TEXT NOT NULL,
    version     INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (page_id, owner_id)
);

CREATE TABLE IF NOT EXISTS inverted_mappings (
    page_id     TEXT PRIMARY KEY,
    fields_json TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS profiles_updated_idx ON profiles(updated_at);
CREATE INDEX IF NOT EXISTS mappings_created_idx ON mappings(created_at);
CREATE INDEX IF NOT EXISTS inverted_updated_idx ON inverted_mappings(updated_at);

PRAGMA user_version = 1;
";
