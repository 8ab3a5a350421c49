use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Longest title accepted, counted in UTF-16 code units like the web client
pub const TITLE_MAX_LEN: usize = 100;

/// Row as stored in the `todos` table. `completed` is an INTEGER 0/1.
#[derive(Debug, Clone, FromRow)]
pub struct TodoRow {
    pub id: i64,
    #[sqlx(rename = "userId")]
    pub user_id: String,
    pub title: String,
    pub completed: i64,
}

/// Todo as seen by callers of the store and by API clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub completed: bool,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            completed: row.completed == 1,
        }
    }
}

/// Storage encoding of the completed flag
pub fn completed_flag(completed: bool) -> i64 {
    if completed {
        1
    } else {
        0
    }
}

/// Fields an update may touch. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

/// Checks the 1..=100 length bound shared by the store and request validation.
/// Characters outside the BMP count twice.
pub fn check_title(title: &str) -> Result<(), String> {
    let len = title.encode_utf16().count();
    if len == 0 {
        return Err("must be at least 1 character".to_string());
    }
    if len > TITLE_MAX_LEN {
        return Err(format!("must be at most {} characters", TITLE_MAX_LEN));
    }
    Ok(())
}
