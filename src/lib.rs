#[macro_use]
extern crate rocket;

use rocket::figment::Figment;
use rocket::fs::FileServer;
use rocket::{Build, Rocket};
use tracing::info;

use std::path::Path;
use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod data;
pub mod internal_error;
pub mod logging;
pub mod nodes;
pub mod pages;
pub mod progress;
pub mod storage;
pub mod workspace;

use config::{AppConfig, StorageBackend};
use internal_error::{InternalError, InternalResult};
use storage::{LocalStorage, SharedStorage, SqliteStorage};

fn open_storage(config: &AppConfig, connection: &data::DBConnection) -> InternalResult<SharedStorage> {
    let storage: SharedStorage = match config.storage {
        StorageBackend::Sqlite => Arc::new(SqliteStorage::new(connection.clone())),
        StorageBackend::Local => Arc::new(LocalStorage::open(&config.local_store_path)?),
    };

    Ok(storage)
}

/// Assembles the server from a Figment carrying both Rocket's and the app's settings.
pub fn build_rocket(figment: Figment) -> InternalResult<Rocket<Build>> {
    let config = AppConfig::from_figment(&figment)?;

    let connection = data::open_database(&config.database_path)?;
    let storage = open_storage(&config, &connection)?;

    info!(
        database = %config.database_path,
        storage = ?config.storage,
        "starting revise"
    );

    let static_dir = config.static_dir.clone();

    let rocket = rocket::custom(figment)
        .manage(connection)
        .manage(storage)
        .manage(config)
        .mount(
            "/api",
            routes![
                auth::endpoints::signup,
                auth::endpoints::login,
                auth::endpoints::logout,
                auth::endpoints::me,
                pages::endpoints::get_pages,
                pages::endpoints::add_page,
                pages::endpoints::rename_page,
                pages::endpoints::delete_page,
                pages::endpoints::reorder_pages,
                pages::endpoints::move_page,
                nodes::endpoints::get_nodes,
                nodes::endpoints::get_active_nodes,
                nodes::endpoints::get_completed_nodes,
                nodes::endpoints::add_node,
                nodes::endpoints::update_node,
                nodes::endpoints::delete_node,
                nodes::endpoints::increment_node,
                nodes::endpoints::complete_node,
                nodes::endpoints::restore_node,
                nodes::endpoints::finish_node,
                nodes::endpoints::reorder_nodes,
                nodes::endpoints::move_node,
            ],
        );

    match static_dir {
        Some(dir) if !Path::new(&dir).is_dir() => Err(InternalError::validation(format!(
            "static_dir {} is not a directory",
            dir
        ))),
        Some(dir) => Ok(rocket.mount("/", FileServer::from(dir).rank(15))),
        None => Ok(rocket),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;
    use rocket::local::blocking::Client;
    use serde_json::{json, Value};

    fn client() -> Client {
        let figment = rocket::Config::figment()
            .merge(("database_path", ":memory:"))
            .merge(("log_level", "off"));

        Client::tracked(build_rocket(figment).unwrap()).unwrap()
    }

    fn signed_in() -> Client {
        let client = client();
        let (status, _) = post(
            &client,
            "/api/signup",
            json!({"email": "ada@example.com", "password": "hunter22", "name": "Ada"}),
        );
        assert_eq!(status, Status::Ok);

        client
    }

    fn post(client: &Client, path: &str, body: Value) -> (Status, Value) {
        let response = client.post(path).json(&body).dispatch();
        let status = response.status();

        (status, response.into_json().unwrap_or(Value::Null))
    }

    fn get(client: &Client, path: &str) -> (Status, Value) {
        let response = client.get(path).dispatch();
        let status = response.status();

        (status, response.into_json().unwrap_or(Value::Null))
    }

    #[test]
    fn requests_without_a_session_are_rejected() {
        let client = client();

        assert_eq!(client.get("/api/get_pages").dispatch().status(), Status::Unauthorized);
        assert_eq!(client.get("/api/me").dispatch().status(), Status::Unauthorized);
    }

    #[test]
    fn signup_starts_a_session_and_logout_ends_it() {
        let client = signed_in();

        let (status, me) = get(&client, "/api/me");
        assert_eq!(status, Status::Ok);
        assert_eq!(me["email"], "ada@example.com");

        assert_eq!(client.post("/api/logout").dispatch().status(), Status::Ok);
        assert_eq!(client.get("/api/me").dispatch().status(), Status::Unauthorized);

        let (status, _) = post(
            &client,
            "/api/login",
            json!({"email": "ada@example.com", "password": "wrong"}),
        );
        assert_eq!(status, Status::Unauthorized);

        let (status, _) = post(
            &client,
            "/api/login",
            json!({"email": "ada@example.com", "password": "hunter22"}),
        );
        assert_eq!(status, Status::Ok);
        assert_eq!(client.get("/api/me").dispatch().status(), Status::Ok);
    }

    #[test]
    fn duplicate_page_titles_are_a_bad_request() {
        let client = signed_in();

        let (status, _) = post(&client, "/api/add_page", json!({"title": "Exam Prep"}));
        assert_eq!(status, Status::Ok);

        let (status, body) = post(&client, "/api/add_page", json!({"title": "Exam Prep"}));
        assert_eq!(status, Status::BadRequest);
        assert!(body["error"].is_string());
    }

    #[test]
    fn completing_the_last_child_completes_the_parent() {
        let client = signed_in();

        let (_, page) = post(&client, "/api/add_page", json!({"title": "Exam Prep"}));
        let page_id = page["pageId"].as_i64().unwrap();

        let (_, chapter) = post(
            &client,
            "/api/add_node",
            json!({"pageId": page_id, "title": "Chapter 1", "maxFullness": 3}),
        );
        let chapter_id = chapter["nodeId"].as_i64().unwrap();

        let (_, section) = post(
            &client,
            "/api/add_node",
            json!({"pageId": page_id, "title": "Section 1.1", "parentId": chapter_id, "maxFullness": 2}),
        );
        let section_id = section["nodeId"].as_i64().unwrap();

        let (status, changed) = post(&client, "/api/increment_node", json!({"nodeId": section_id}));
        assert_eq!(status, Status::Ok);
        assert_eq!(changed["nodes"][0]["fullness"], 1);

        let (_, active) = get(&client, &format!("/api/get_active_nodes/{}", page_id));
        assert_eq!(active[0]["node"]["id"], chapter_id);
        assert_eq!(active[0]["progress"]["fullness"], 0);
        assert_eq!(active[0]["progress"]["maxFullness"], 1);
        assert_eq!(active[0]["children"][0]["fullness"], 1);

        let (_, changed) = post(&client, "/api/increment_node", json!({"nodeId": section_id}));
        let ids: Vec<i64> = changed["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|node| node["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![section_id, chapter_id]);

        let (_, active) = get(&client, &format!("/api/get_active_nodes/{}", page_id));
        assert_eq!(active, json!([]));

        let (_, completed) = get(&client, &format!("/api/get_completed_nodes/{}", page_id));
        assert_eq!(completed.as_array().unwrap().len(), 2);

        let (_, restored) = post(&client, "/api/restore_node", json!({"nodeId": chapter_id}));
        assert_eq!(restored["nodes"][0]["completed"], false);
        assert_eq!(restored["nodes"][0]["fullness"], 0);
    }

    #[test]
    fn other_users_pages_are_not_found() {
        let client = signed_in();
        let (_, page) = post(&client, "/api/add_page", json!({"title": "Mine"}));
        let page_id = page["pageId"].as_i64().unwrap();

        assert_eq!(client.post("/api/logout").dispatch().status(), Status::Ok);
        let (status, _) = post(
            &client,
            "/api/signup",
            json!({"email": "bob@example.com", "password": "hunter22"}),
        );
        assert_eq!(status, Status::Ok);

        let (status, _) = get(&client, &format!("/api/get_nodes/{}", page_id));
        assert_eq!(status, Status::NotFound);

        let (status, _) = post(&client, "/api/add_node", json!({"pageId": page_id, "title": "Sneaky"}));
        assert_eq!(status, Status::NotFound);
    }

    #[test]
    fn progress_nodes_cannot_be_completed_by_hand() {
        let client = signed_in();
        let (_, page) = post(&client, "/api/add_page", json!({"title": "P"}));
        let (_, bar) = post(&client, "/api/add_node", json!({"pageId": page["pageId"], "title": "Bar"}));

        let (status, _) = post(&client, "/api/complete_node", json!({"nodeId": bar["nodeId"]}));
        assert_eq!(status, Status::BadRequest);

        let (status, _) = post(&client, "/api/finish_node", json!({"nodeId": bar["nodeId"]}));
        assert_eq!(status, Status::BadRequest);
    }

    #[test]
    fn finished_simple_nodes_are_shown_done_before_they_are_stored() {
        let client = signed_in();
        let (_, page) = post(&client, "/api/add_page", json!({"title": "P"}));
        let page_id = page["pageId"].as_i64().unwrap();
        let (_, task) = post(
            &client,
            "/api/add_node",
            json!({"pageId": page_id, "title": "Email tutor", "type": "simple"}),
        );

        let (status, shown) = post(&client, "/api/finish_node", json!({"nodeId": task["nodeId"]}));
        assert_eq!(status, Status::Ok);
        assert_eq!(shown["nodes"][0]["id"], task["nodeId"]);
        assert_eq!(shown["nodes"][0]["completed"], true);

        let (_, stored) = get(&client, &format!("/api/get_nodes/{}", page_id));
        assert_eq!(stored[0]["completed"], false);
    }

    #[test]
    fn unknown_node_kinds_are_rejected() {
        let client = signed_in();
        let (_, page) = post(&client, "/api/add_page", json!({"title": "P"}));

        let (status, _) = post(
            &client,
            "/api/add_node",
            json!({"pageId": page["pageId"], "title": "Odd", "type": "bar"}),
        );
        assert!(status.code >= 400 && status.code < 500);
    }

    #[test]
    fn move_page_reports_when_nothing_moved() {
        let client = signed_in();
        let (_, first) = post(&client, "/api/add_page", json!({"title": "First"}));
        post(&client, "/api/add_page", json!({"title": "Second"}));

        let (_, result) = post(
            &client,
            "/api/move_page",
            json!({"id": first["pageId"], "direction": "up"}),
        );
        assert_eq!(result["moved"], false);

        let (_, result) = post(
            &client,
            "/api/move_page",
            json!({"id": first["pageId"], "direction": "down"}),
        );
        assert_eq!(result["moved"], true);

        let (_, pages) = get(&client, "/api/get_pages");
        assert_eq!(pages[0]["title"], "Second");
    }
}
