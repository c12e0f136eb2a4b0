use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::internal_error::InternalResult;
use crate::progress::Direction;

pub type DBConnection = Arc<Mutex<Connection>>;

pub type UserID = i64;

#[derive(Deserialize, Debug)]
pub struct MoveRequest {
    pub id: i64,
    pub direction: Direction,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct MoveResult {
    pub moved: bool,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    password TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    expires_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    title TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (user_id, title)
);
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    parent_id INTEGER,
    title TEXT NOT NULL,
    content TEXT,
    fullness INTEGER NOT NULL DEFAULT 0,
    maxfullness INTEGER NOT NULL DEFAULT 5,
    type TEXT NOT NULL DEFAULT 'progress',
    pinned INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS nodes_page_id ON nodes (page_id);
";

pub fn open_database(path: &str) -> InternalResult<DBConnection> {
    let connection = Connection::open(path)?;
    create_tables(&connection)?;

    Ok(Arc::new(Mutex::new(connection)))
}

pub fn create_tables(connection: &Connection) -> InternalResult<()> {
    connection.execute_batch(SCHEMA)?;
    Ok(())
}
