use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::auth::CurrentUser;
use crate::data::{MoveRequest, MoveResult};
use crate::internal_error::InternalResult;
use crate::storage::SharedStorage;

use super::data::*;
use super::helpers;

#[get("/get_pages")]
pub fn get_pages(user: CurrentUser, store: &State<SharedStorage>) -> InternalResult<Json<Vec<Page>>> {
    Ok(Json(store.get_pages(user.user_id)?))
}

#[post("/add_page", format = "json", data = "<add_page_request>")]
pub fn add_page(
    add_page_request: Json<AddPageRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<AddPageResult>> {
    let page_id = helpers::add_page(
        store.inner().as_ref(),
        user.user_id,
        &add_page_request.title,
        Utc::now(),
    )?;

    Ok(Json(AddPageResult { page_id }))
}

#[post("/rename_page", format = "json", data = "<rename_page_request>")]
pub fn rename_page(
    rename_page_request: Json<RenamePageRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<()> {
    helpers::rename_page(
        store.inner().as_ref(),
        user.user_id,
        rename_page_request.page_id,
        &rename_page_request.title,
        Utc::now(),
    )
}

#[post("/delete_page", format = "json", data = "<delete_page_request>")]
pub fn delete_page(
    delete_page_request: Json<DeletePageRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<()> {
    helpers::delete_page(store.inner().as_ref(), user.user_id, delete_page_request.page_id)
}

#[post("/reorder_pages", format = "json", data = "<reorder_pages_request>")]
pub fn reorder_pages(
    reorder_pages_request: Json<ReorderPagesRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<()> {
    helpers::reorder_pages(store.inner().as_ref(), user.user_id, &reorder_pages_request.page_ids)
}

#[post("/move_page", format = "json", data = "<move_request>")]
pub fn move_page(
    move_request: Json<MoveRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<MoveResult>> {
    let moved = helpers::move_page(
        store.inner().as_ref(),
        user.user_id,
        move_request.id,
        move_request.direction,
    )?;

    Ok(Json(MoveResult { moved }))
}
