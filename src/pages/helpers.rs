use chrono::{DateTime, Utc};
use tracing::info;

use crate::data::UserID;
use crate::internal_error::{InternalError, InternalResult};
use crate::progress::ledger::{self, Direction};
use crate::storage::Storage;

use super::data::*;

fn clean_title(title: &str) -> InternalResult<&str> {
    let title = title.trim();

    if title.is_empty() {
        return Err(InternalError::validation("Page title cannot be empty"));
    }

    Ok(title)
}

/// Pages the caller does not own are reported as missing.
pub fn owned_page(store: &dyn Storage, user_id: UserID, page_id: PageID) -> InternalResult<Page> {
    match store.get_page(page_id)? {
        Some(page) if page.user_id == user_id => Ok(page),
        _ => Err(InternalError::NotFound("Page", page_id)),
    }
}

pub fn add_page(
    store: &dyn Storage,
    user_id: UserID,
    title: &str,
    now: DateTime<Utc>,
) -> InternalResult<PageID> {
    let title = clean_title(title)?;

    if store.find_page_by_title(user_id, title)?.is_some() {
        return Err(InternalError::validation("Page with this title already exists"));
    }

    let position = ledger::next_position(&store.get_pages(user_id)?);
    let page_id = store.add_page(user_id, title, position, now)?;

    info!(user_id, page_id, "page created");

    Ok(page_id)
}

pub fn rename_page(
    store: &dyn Storage,
    user_id: UserID,
    page_id: PageID,
    title: &str,
    now: DateTime<Utc>,
) -> InternalResult<()> {
    let title = clean_title(title)?;

    match store.find_page_by_title(user_id, title)? {
        Some(existing) if existing.id != page_id => {
            return Err(InternalError::validation("Page with this title already exists"))
        }
        _ => {}
    }

    if !store.rename_page(user_id, page_id, title, now)? {
        return Err(InternalError::NotFound("Page", page_id));
    }

    Ok(())
}

/// Deleting an unknown page is a no-op.
pub fn delete_page(store: &dyn Storage, user_id: UserID, page_id: PageID) -> InternalResult<()> {
    if store.delete_page(user_id, page_id)? {
        info!(user_id, page_id, "page deleted");
    }

    Ok(())
}

pub fn reorder_pages(store: &dyn Storage, user_id: UserID, page_ids: &[PageID]) -> InternalResult<()> {
    let pages = store.get_pages(user_id)?;
    ledger::validate_group(page_ids, &pages)?;

    store.set_page_positions(user_id, &ledger::reorder(page_ids))
}

pub fn move_page(
    store: &dyn Storage,
    user_id: UserID,
    page_id: PageID,
    direction: Direction,
) -> InternalResult<bool> {
    let pages = store.get_pages(user_id)?;

    match ledger::swap_with_neighbour(&pages, page_id, direction) {
        Some(swap) => {
            store.set_page_positions(user_id, &swap)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
