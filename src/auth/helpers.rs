use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::data::UserID;
use crate::internal_error::{InternalError, InternalResult};

use super::data::*;

pub fn hash_password(password: &str) -> InternalResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;

    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> InternalResult<bool> {
    let parsed = PasswordHash::new(hash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub fn get_user(user_id: UserID, db_connection: &Connection) -> InternalResult<Option<User>> {
    let user = db_connection
        .query_row(
            "SELECT id, email, name, created_at FROM users WHERE id = (?1)",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(user)
}

pub fn create_user(
    signup: &SignupRequest,
    now: DateTime<Utc>,
    db_connection: &Connection,
) -> InternalResult<User> {
    let email = signup.email.trim();

    if email.is_empty() || signup.password.is_empty() {
        return Err(InternalError::validation("Email and password are required"));
    }

    let existing = db_connection
        .query_row(
            "SELECT id FROM users WHERE email = (?1)",
            params![email],
            |row| row.get::<usize, UserID>(0),
        )
        .optional()?;

    if existing.is_some() {
        return Err(InternalError::validation("User already exists"));
    }

    let name = signup
        .name
        .as_ref()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    db_connection.execute(
        "INSERT INTO users (email, name, password, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![email, name, hash_password(&signup.password)?, now],
    )?;
    let id = db_connection.last_insert_rowid();

    info!(user_id = id, "user signed up");

    Ok(User {
        id,
        email: email.to_string(),
        name,
        created_at: now,
    })
}

/// Checks credentials. Unknown email and wrong password are reported the same way.
pub fn authenticate(login: &LoginRequest, db_connection: &Connection) -> InternalResult<UserID> {
    if login.email.trim().is_empty() || login.password.is_empty() {
        return Err(InternalError::validation("Email and password are required"));
    }

    let stored = db_connection
        .query_row(
            "SELECT id, password FROM users WHERE email = (?1)",
            params![login.email.trim()],
            |row| Ok((row.get::<usize, UserID>(0)?, row.get::<usize, String>(1)?)),
        )
        .optional()?;

    match stored {
        Some((user_id, hash)) if verify_password(&login.password, &hash)? => Ok(user_id),
        _ => Err(InternalError::Unauthorized(
            "Invalid email or password".to_string(),
        )),
    }
}

pub fn create_session(
    user_id: UserID,
    ttl: Duration,
    now: DateTime<Utc>,
    db_connection: &Connection,
) -> InternalResult<Session> {
    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id,
        expires_at: now + ttl,
    };

    db_connection.execute(
        "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![session.id, session.user_id, session.expires_at],
    )?;

    Ok(session)
}

/// Maps an opaque session token to its user. Unknown and expired tokens give
/// `None`; an expired session row is deleted on the way.
pub fn resolve_session(
    token: &str,
    now: DateTime<Utc>,
    db_connection: &Connection,
) -> InternalResult<Option<UserID>> {
    let session = db_connection
        .query_row(
            "SELECT user_id, expires_at FROM sessions WHERE id = (?1)",
            params![token],
            |row| {
                Ok((
                    row.get::<usize, UserID>(0)?,
                    row.get::<usize, DateTime<Utc>>(1)?,
                ))
            },
        )
        .optional()?;

    match session {
        Some((user_id, expires_at)) if expires_at > now => Ok(Some(user_id)),
        Some(_) => {
            invalidate_session(token, db_connection)?;
            debug!("expired session removed");
            Ok(None)
        }
        None => Ok(None),
    }
}

pub fn invalidate_session(token: &str, db_connection: &Connection) -> InternalResult<()> {
    db_connection.execute("DELETE FROM sessions WHERE id = (?1)", params![token])?;
    Ok(())
}
