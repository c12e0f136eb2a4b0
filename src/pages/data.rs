use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::UserID;

pub type PageID = i64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageID,
    pub user_id: UserID,
    pub title: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct AddPageRequest {
    pub title: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddPageResult {
    pub page_id: PageID,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RenamePageRequest {
    pub page_id: PageID,
    pub title: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeletePageRequest {
    pub page_id: PageID,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPagesRequest {
    pub page_ids: Vec<PageID>,
}
