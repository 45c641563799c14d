use crate::domain::{Priority, Task, TaskDraft, TaskId, TaskPatch, UserId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// DTOs for API communication

#[derive(Debug, Deserialize)]
pub struct TaskDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

// Request DTOs

#[derive(Debug, Serialize)]
pub struct TaskCreateDto {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskPatchDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    // Inner None serializes as null to clear the due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToggleDto {
    pub completed: bool,
}

/// Timestamps arrive either as RFC 3339 or as the backend's naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` form (taken as UTC); due dates may also be
/// bare calendar dates.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

// Conversion implementations

impl From<TaskDto> for Task {
    fn from(dto: TaskDto) -> Self {
        Self {
            id: TaskId(dto.id),
            title: dto.title,
            description: dto.description,
            completed: dto.completed,
            priority: dto
                .priority
                .as_deref()
                .and_then(|p| Priority::from_str(p).ok())
                .unwrap_or_default(),
            due_date: dto.due_date.as_deref().and_then(parse_datetime),
            tags: dto.tags,
            user_id: Uuid::parse_str(&dto.user_id)
                .map(UserId)
                .unwrap_or(UserId(Uuid::nil())),
            created_at: parse_datetime(&dto.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&dto.updated_at).unwrap_or_else(Utc::now),
            completed_at: dto.completed_at.as_deref().and_then(parse_datetime),
        }
    }
}

impl From<&TaskDraft> for TaskCreateDto {
    fn from(draft: &TaskDraft) -> Self {
        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            completed: false,
            priority: draft.priority,
            due_date: draft.due_date,
            tags: draft.tags.clone(),
        }
    }
}

impl From<&TaskPatch> for TaskPatchDto {
    fn from(patch: &TaskPatch) -> Self {
        Self {
            title: patch.title.clone(),
            description: patch.description.clone(),
            completed: patch.completed,
            priority: patch.priority,
            due_date: patch.due_date,
            tags: patch.tags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_backend_payload_with_naive_timestamps() {
        let payload = r#"{
            "id": 7,
            "title": "Buy milk",
            "description": null,
            "completed": true,
            "priority": "high",
            "due_date": "2024-06-01T00:00:00",
            "tags": "home,errands",
            "user_id": "4f9c1e9e-1a2b-4c3d-8e4f-5a6b7c8d9e0f",
            "created_at": "2024-05-01T08:30:00.123456",
            "updated_at": "2024-05-02T09:00:00",
            "completed_at": "2024-05-02T09:00:00"
        }"#;

        let task: Task = serde_json::from_str::<TaskDto>(payload).unwrap().into();

        assert_eq!(task.id, TaskId(7));
        assert_eq!(task.priority, Priority::High);
        assert!(task.completed);
        assert_eq!(task.tag_set(), vec!["home", "errands"]);
        assert_eq!(task.created_at.to_rfc3339(), "2024-05-01T08:30:00.123456+00:00");
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn missing_priority_defaults_to_medium() {
        let payload = r#"{
            "id": 1,
            "title": "t",
            "user_id": "4f9c1e9e-1a2b-4c3d-8e4f-5a6b7c8d9e0f",
            "created_at": "2024-05-01T08:30:00",
            "updated_at": "2024-05-01T08:30:00"
        }"#;

        let task: Task = serde_json::from_str::<TaskDto>(payload).unwrap().into();
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
    }

    #[test]
    fn patch_dto_serializes_only_set_fields() {
        let patch = TaskPatch {
            title: Some("renamed".to_string()),
            due_date: Some(None),
            ..Default::default()
        };

        let value = serde_json::to_value(TaskPatchDto::from(&patch)).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert_eq!(object["title"], "renamed");
        assert!(object["due_date"].is_null());
    }
}
