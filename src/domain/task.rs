use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Task identifier. Server-assigned ids are positive (autoincrement);
/// client-temporary ids for in-flight creates occupy the negative range,
/// so the two spaces never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub i64);

impl TaskId {
    pub fn is_local(&self) -> bool {
        self.0 < 0
    }

    /// Recency rank for the default newest-first ordering. Local ids carry
    /// their creation time in milliseconds (negated), so a pending create
    /// ranks above every persisted task and newer pending creates rank
    /// above older ones.
    pub fn recency(&self) -> (u8, i64) {
        if self.is_local() {
            (1, -self.0)
        } else {
            (0, self.0)
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        TaskId(id)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
    pub user_id: super::UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Parse the comma-delimited tag string into trimmed, non-empty tokens.
    pub fn tag_set(&self) -> Vec<String> {
        self.tags.as_deref().map(parse_tags).unwrap_or_default()
    }

    /// Business rule: determine if task is overdue
    pub fn is_overdue(&self) -> bool {
        self.due_date
            .map(|due| due < Utc::now() && !self.completed)
            .unwrap_or(false)
    }

    /// Format due date for display
    pub fn due_date_display(&self) -> String {
        match self.due_date {
            None => "no due date".to_string(),
            Some(due) => {
                let now = Utc::now();
                let days_diff = (due.date_naive() - now.date_naive()).num_days();

                match days_diff {
                    0 => "today".to_string(),
                    1 => "tomorrow".to_string(),
                    -1 => "yesterday".to_string(),
                    d if d < 0 => {
                        let days = -d;
                        format!("{days} days ago")
                    }
                    d if d <= 7 => format!("in {d} days"),
                    _ => due.format("%Y-%m-%d").to_string(),
                }
            }
        }
    }

    /// Merge a partial update in place, refreshing `updated_at` and keeping
    /// `completed_at` consistent with completion transitions.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = &patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(completed) = patch.completed {
            self.set_completed(completed);
        }
        self.updated_at = Utc::now();
    }

    /// Flip the completion flag, stamping the completion time on the first
    /// transition to completed and clearing it on the way back.
    pub fn set_completed(&mut self, completed: bool) {
        if completed && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        } else if !completed {
            self.completed_at = None;
        }
        self.completed = completed;
    }
}

/// Split a raw tag string on commas, trimming tokens and dropping empties.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical comma-delimited form of a raw tag string, or `None` when no
/// non-empty tags remain.
pub fn normalize_tags(raw: &str) -> Option<String> {
    let tags = parse_tags(raw);
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(","))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTask {
    #[error("title must not be empty")]
    EmptyTitle,
}

/// Payload for creating a task.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Trimmed title, rejected when empty.
    pub fn validated_title(&self) -> Result<String, InvalidTask> {
        let title = self.title.trim();
        if title.is_empty() {
            Err(InvalidTask::EmptyTitle)
        } else {
            Ok(title.to_string())
        }
    }
}

/// Partial update. `due_date` is a double option so a patch can distinguish
/// "leave alone" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Pending => "pending",
            StatusFilter::Completed => "completed",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    DueDate,
    Priority,
    Title,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::DueDate => "due_date",
            SortKey::Priority => "priority",
            SortKey::Title => "title",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created_at" | "created" => Ok(SortKey::CreatedAt),
            "due_date" | "due" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            "title" => Ok(SortKey::Title),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Compound predicate applied on top of the status/search filters.
#[derive(Debug, Clone, Default)]
pub struct AdvancedFilters {
    pub priority: Option<Priority>,
    pub tag: Option<String>,
    pub due_date_from: Option<NaiveDate>,
    pub due_date_to: Option<NaiveDate>,
    pub sort_by: Option<SortKey>,
    pub sort_order: SortOrder,
}

/// Filter parameters accepted by the remote list endpoint; also the shape
/// the console session keeps as its current view state.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub advanced: AdvancedFilters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags_trims_and_drops_empties() {
        assert_eq!(
            parse_tags("home, errands , ,urgent,"),
            vec!["home", "errands", "urgent"]
        );
        assert!(parse_tags("  ,  ,").is_empty());
    }

    #[test]
    fn normalize_tags_rejoins_canonically() {
        assert_eq!(normalize_tags(" a , b ,,c "), Some("a,b,c".to_string()));
        assert_eq!(normalize_tags(" , "), None);
    }

    #[test]
    fn priority_ordering_matches_urgency() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn local_ids_rank_above_server_ids() {
        let local = TaskId(-1_700_000_000_000);
        let newer_local = TaskId(-1_700_000_000_500);
        let server = TaskId(42);

        assert!(local.is_local());
        assert!(!server.is_local());
        assert!(local.recency() > server.recency());
        assert!(newer_local.recency() > local.recency());
    }

    #[test]
    fn draft_title_is_trimmed_and_required() {
        assert_eq!(
            TaskDraft::new("  Buy milk  ").validated_title(),
            Ok("Buy milk".to_string())
        );
        assert_eq!(
            TaskDraft::new("   ").validated_title(),
            Err(InvalidTask::EmptyTitle)
        );
    }
}
