use chrono::Utc;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::serde::json::Json;
use rocket::{get, post, State};
use tracing::info;

use crate::config::AppConfig;
use crate::data::DBConnection;
use crate::internal_error::{InternalError, InternalResult};

use super::data::*;
use super::guard::CurrentUser;
use super::helpers::*;

fn set_session_cookie(cookies: &CookieJar<'_>, session: &Session, config: &AppConfig) {
    let cookie = Cookie::build((SESSION_COOKIE, session.id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(rocket::time::Duration::days(config.session_ttl_days));

    cookies.add(cookie);
}

#[post("/signup", format = "json", data = "<signup_request>")]
pub fn signup(
    signup_request: Json<SignupRequest>,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<User>> {
    let db_connection = db_connection.lock()?;
    let now = Utc::now();

    let user = create_user(&signup_request, now, &db_connection)?;
    let session = create_session(user.id, config.session_ttl(), now, &db_connection)?;
    set_session_cookie(cookies, &session, config);

    Ok(Json(user))
}

#[post("/login", format = "json", data = "<login_request>")]
pub fn login(
    login_request: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Json<User>> {
    let db_connection = db_connection.lock()?;
    let now = Utc::now();

    let user_id = authenticate(&login_request, &db_connection)?;
    let session = create_session(user_id, config.session_ttl(), now, &db_connection)?;
    set_session_cookie(cookies, &session, config);

    info!(user_id, "user logged in");

    get_user(user_id, &db_connection)?
        .map(Json)
        .ok_or(InternalError::NotFound("User", user_id))
}

#[post("/logout")]
pub fn logout(cookies: &CookieJar<'_>, db_connection: &State<DBConnection>) -> InternalResult<()> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        let db_connection = db_connection.lock()?;
        invalidate_session(cookie.value(), &db_connection)?;
    }
    cookies.remove(SESSION_COOKIE);

    Ok(())
}

#[get("/me")]
pub fn me(user: CurrentUser, db_connection: &State<DBConnection>) -> InternalResult<Json<User>> {
    let db_connection = db_connection.lock()?;

    get_user(user.user_id, &db_connection)?
        .map(Json)
        .ok_or(InternalError::NotFound("User", user.user_id))
}
