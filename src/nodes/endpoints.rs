use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::data::{MoveRequest, MoveResult};
use crate::internal_error::{InternalError, InternalResult};
use crate::pages::data::PageID;
use crate::progress::view;
use crate::storage::SharedStorage;
use crate::workspace::PageWorkspace;

use super::data::*;
use super::helpers::{self, NodeAction};

#[get("/get_nodes/<page_id>")]
pub fn get_nodes(
    page_id: PageID,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<Vec<Node>>> {
    let nodes = helpers::visible_nodes(store.inner().as_ref(), user.user_id, page_id)?;

    Ok(Json(nodes))
}

#[get("/get_active_nodes/<page_id>")]
pub fn get_active_nodes(
    page_id: PageID,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<Vec<ActiveGroup>>> {
    let nodes = helpers::visible_nodes(store.inner().as_ref(), user.user_id, page_id)?;

    Ok(Json(view::group_active(&nodes)))
}

#[get("/get_completed_nodes/<page_id>")]
pub fn get_completed_nodes(
    page_id: PageID,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<Vec<Node>>> {
    let nodes = helpers::visible_nodes(store.inner().as_ref(), user.user_id, page_id)?;

    Ok(Json(view::completed_list(&nodes).into_iter().cloned().collect()))
}

#[post("/add_node", format = "json", data = "<add_node_request>")]
pub fn add_node(
    add_node_request: Json<AddNodeRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<AddNodeResult>> {
    let node_id = helpers::add_node(
        store.inner().as_ref(),
        user.user_id,
        &add_node_request,
        Utc::now(),
    )?;

    Ok(Json(AddNodeResult { node_id }))
}

#[post("/update_node", format = "json", data = "<update_node_request>")]
pub fn update_node(
    update_node_request: Json<UpdateNodeRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<Node>> {
    let node = helpers::update_node(
        store.inner().as_ref(),
        user.user_id,
        &update_node_request,
        Utc::now(),
    )?;

    Ok(Json(node))
}

#[post("/delete_node", format = "json", data = "<node_id_request>")]
pub fn delete_node(
    node_id_request: Json<NodeIdRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<ChangedNodes>> {
    let nodes = helpers::delete_node(
        store.inner().as_ref(),
        user.user_id,
        node_id_request.node_id,
        Utc::now(),
    )?;

    Ok(Json(ChangedNodes { nodes }))
}

fn run(
    action: NodeAction,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<ChangedNodes>> {
    let nodes = helpers::run_action(store.inner().as_ref(), user.user_id, action, Utc::now())?;

    Ok(Json(ChangedNodes { nodes }))
}

#[post("/increment_node", format = "json", data = "<node_id_request>")]
pub fn increment_node(
    node_id_request: Json<NodeIdRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<ChangedNodes>> {
    run(NodeAction::Increment(node_id_request.node_id), user, store)
}

#[post("/complete_node", format = "json", data = "<node_id_request>")]
pub fn complete_node(
    node_id_request: Json<NodeIdRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<ChangedNodes>> {
    run(NodeAction::Complete(node_id_request.node_id), user, store)
}

#[post("/restore_node", format = "json", data = "<node_id_request>")]
pub fn restore_node(
    node_id_request: Json<NodeIdRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<ChangedNodes>> {
    run(NodeAction::Restore(node_id_request.node_id), user, store)
}

/// Ticks off a simple node. The reply shows it completed; storage catches up
/// after the configured delay.
#[post("/finish_node", format = "json", data = "<node_id_request>")]
pub fn finish_node(
    node_id_request: Json<NodeIdRequest>,
    user: CurrentUser,
    config: &State<AppConfig>,
    store: &State<SharedStorage>,
) -> InternalResult<Json<ChangedNodes>> {
    let node_id = node_id_request.node_id;
    let node = store
        .get_node(node_id)?
        .ok_or(InternalError::NotFound("Node", node_id))?;

    let mut workspace =
        PageWorkspace::from_config(store.inner().clone(), user.user_id, node.page_id, config)?;
    let pending = workspace.finish_simple(node_id)?;

    let nodes = pending
        .changed()
        .iter()
        .filter_map(|id| workspace.nodes().iter().find(|node| node.id == *id).cloned())
        .collect();

    Ok(Json(ChangedNodes { nodes }))
}

#[post("/reorder_nodes", format = "json", data = "<reorder_nodes_request>")]
pub fn reorder_nodes(
    reorder_nodes_request: Json<ReorderNodesRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<()> {
    helpers::reorder_nodes(
        store.inner().as_ref(),
        user.user_id,
        &reorder_nodes_request.node_ids,
    )
}

#[post("/move_node", format = "json", data = "<move_request>")]
pub fn move_node(
    move_request: Json<MoveRequest>,
    user: CurrentUser,
    store: &State<SharedStorage>,
) -> InternalResult<Json<MoveResult>> {
    let moved = helpers::move_node(
        store.inner().as_ref(),
        user.user_id,
        move_request.id,
        move_request.direction,
    )?;

    Ok(Json(MoveResult { moved }))
}
