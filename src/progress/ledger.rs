use serde::{Deserialize, Serialize};

use std::collections::HashSet;

use crate::internal_error::{InternalError, InternalResult};
use crate::nodes::data::Node;
use crate::pages::data::Page;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionAssignment {
    pub id: i64,
    pub position: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Anything that holds a sort rank among its siblings.
pub trait Positioned {
    fn id(&self) -> i64;
    fn position(&self) -> i64;
    fn set_position(&mut self, position: i64);
}

impl Positioned for Node {
    fn id(&self) -> i64 {
        self.id
    }

    fn position(&self) -> i64 {
        self.position
    }

    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

impl Positioned for Page {
    fn id(&self) -> i64 {
        self.id
    }

    fn position(&self) -> i64 {
        self.position
    }

    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

pub fn reorder(ordered_ids: &[i64]) -> Vec<PositionAssignment> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(index, id)| PositionAssignment {
            id: *id,
            position: index as i64,
        })
        .collect()
}

/// Checks that `ordered_ids` names distinct members of one sibling group.
pub fn validate_group<T: Positioned>(ordered_ids: &[i64], group: &[T]) -> InternalResult<()> {
    let members: HashSet<i64> = group.iter().map(|item| item.id()).collect();
    let mut seen = HashSet::new();

    for id in ordered_ids {
        if !seen.insert(*id) {
            return Err(InternalError::validation(format!("Duplicate id in reorder: {}", id)));
        }
        if !members.contains(id) {
            return Err(InternalError::validation(format!(
                "Id {} does not belong to the reordered group",
                id
            )));
        }
    }

    Ok(())
}

pub fn apply_positions<T: Positioned>(items: &mut [T], assignments: &[PositionAssignment]) {
    for assignment in assignments {
        if let Some(item) = items.iter_mut().find(|item| item.id() == assignment.id) {
            item.set_position(assignment.position);
        }
    }
}

/// Finds the sibling directly above or below `id` and returns the two
/// assignments that swap their positions. `None` when it cannot move further.
pub fn swap_with_neighbour<T: Positioned>(
    siblings: &[T],
    id: i64,
    direction: Direction,
) -> Option<[PositionAssignment; 2]> {
    let mut ordered: Vec<&T> = siblings.iter().collect();
    ordered.sort_by(|a, b| a.position().cmp(&b.position()).then(a.id().cmp(&b.id())));

    let index = ordered.iter().position(|item| item.id() == id)?;
    let neighbour_index = match direction {
        Direction::Up => index.checked_sub(1)?,
        Direction::Down => index + 1,
    };
    let neighbour = ordered.get(neighbour_index)?;
    let current = ordered[index];

    Some([
        PositionAssignment {
            id: current.id(),
            position: neighbour.position(),
        },
        PositionAssignment {
            id: neighbour.id(),
            position: current.position(),
        },
    ])
}

/// Position for an item appended after `siblings`.
pub fn next_position<T: Positioned>(siblings: &[T]) -> i64 {
    siblings
        .iter()
        .map(|item| item.position() + 1)
        .max()
        .unwrap_or(0)
}
