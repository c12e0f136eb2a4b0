use chrono::Utc;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

use crate::data::{DBConnection, UserID};
use crate::internal_error::{InternalError, InternalResult};

use super::data::SESSION_COOKIE;
use super::helpers::resolve_session;

/// The signed-in caller, resolved from the `session_id` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: UserID,
}

fn lookup(request: &Request<'_>) -> InternalResult<Option<UserID>> {
    let token = match request.cookies().get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return Ok(None),
    };

    let db_connection = request
        .rocket()
        .state::<DBConnection>()
        .ok_or_else(|| InternalError::from("Database connection is not managed"))?;
    let db_connection = db_connection.lock()?;

    resolve_session(&token, Utc::now(), &db_connection)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = InternalError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match lookup(request) {
            Ok(Some(user_id)) => Outcome::Success(CurrentUser { user_id }),
            Ok(None) => Outcome::Error((
                Status::Unauthorized,
                InternalError::Unauthorized("Not signed in".to_string()),
            )),
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}
