use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Fields an owner may change on an existing task.
pub const TASK_UPDATE_FIELDS: &[&str] = &["description", "completed"];

lazy_static! {
    // `field` or `field:asc` / `field:desc`
    static ref SORT_BY_REGEX: Regex = Regex::new(r"^([A-Za-z]+)(?::(asc|desc))?$").unwrap();
}

/// Represents a task entity as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// Trimmed, non-empty description.
    pub description: String,
    pub completed: bool,
    /// Identifier of the owning user. Set from the authenticated identity and never changed.
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new `Task` owned by `owner`.
    pub fn new(input: NewTask, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description,
            completed: input.completed,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input structure for creating a task.
///
/// Any `owner` the client sends is not part of this type and is dropped during
/// deserialization, along with every other unknown field.
#[derive(Debug, Deserialize, Validate)]
pub struct NewTask {
    #[validate(length(min = 1, max = 1000, message = "Description is required (max 1000 characters)"))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            completed: self.completed,
        }
    }
}

/// Partial update; only [`TASK_UPDATE_FIELDS`] are accepted.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 1000, message = "Description is required (max 1000 characters)"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.map(|d| d.trim().to_string()),
            completed: self.completed,
        }
    }

    pub fn apply(self, task: &mut Task) {
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        task.updated_at = Utc::now();
    }
}

/// Raw query string of `GET /tasks`. Every value arrives as a string and is
/// checked by [`TaskListQuery::into_filter`].
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub completed: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

/// Sortable task fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Description,
    Completed,
}

impl SortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            "description" => Some(SortField::Description),
            "completed" => Some(SortField::Completed),
            _ => None,
        }
    }

    /// Column name in the `tasks` table.
    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Description => "description",
            SortField::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortBy {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Checked listing options. Deliberately carries no owner: the owner is always
/// passed separately from the authenticated identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    /// `None` means no limit.
    pub limit: Option<u32>,
    pub skip: u32,
    /// `None` keeps creation order.
    pub sort: Option<SortBy>,
}

impl TaskListQuery {
    pub fn into_filter(self) -> Result<TaskFilter, AppError> {
        let completed = match self.completed.as_deref() {
            None | Some("") => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(_) => {
                return Err(AppError::validation("completed", "completed must be \"true\" or \"false\""))
            }
        };

        let limit = parse_count("limit", self.limit.as_deref())?.filter(|&n| n > 0);
        let skip = parse_count("skip", self.skip.as_deref())?.unwrap_or(0);

        let sort = match self.sort_by.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_sort_by(raw)?),
        };

        Ok(TaskFilter {
            completed,
            limit,
            skip,
            sort,
        })
    }
}

fn parse_count(field: &str, raw: Option<&str>) -> Result<Option<u32>, AppError> {
    match raw {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::validation(field, "must be a non-negative integer")),
    }
}

fn parse_sort_by(raw: &str) -> Result<SortBy, AppError> {
    let invalid = || {
        AppError::validation(
            "sortBy",
            "sortBy must be createdAt, updatedAt, description or completed, optionally followed by :asc or :desc",
        )
    };

    let captures = SORT_BY_REGEX.captures(raw).ok_or_else(invalid)?;
    let field = SortField::parse(&captures[1]).ok_or_else(invalid)?;
    let direction = match captures.get(2).map(|m| m.as_str()) {
        Some("desc") => SortDirection::Desc,
        _ => SortDirection::Asc,
    };
    Ok(SortBy { field, direction })
}
