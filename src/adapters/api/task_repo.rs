use super::dto::{TaskCreateDto, TaskDto, TaskPatchDto, ToggleDto};
use super::ApiClient;
use crate::domain::{Session, StatusFilter, Task, TaskDraft, TaskId, TaskPatch, TaskQuery};
use crate::ports::{RepositoryResult, TaskRepository};
use async_trait::async_trait;

pub struct HttpTaskRepository {
    client: ApiClient,
}

impl HttpTaskRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn tasks_path(session: &Session) -> String {
        format!("/users/{}/tasks", session.user_id)
    }

    fn build_query_params(query: &TaskQuery) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if query.status != StatusFilter::All {
            params.push(("status".to_string(), query.status.as_str().to_string()));
        }

        if let Some(search) = query.search.as_deref() {
            let search = search.trim();
            if !search.is_empty() {
                params.push(("search".to_string(), search.to_string()));
            }
        }

        let advanced = &query.advanced;
        if let Some(priority) = advanced.priority {
            params.push(("priority".to_string(), priority.as_str().to_string()));
        }
        if let Some(tag) = advanced.tag.as_deref() {
            params.push(("tag".to_string(), tag.to_string()));
        }
        if let Some(from) = advanced.due_date_from {
            params.push(("due_date_from".to_string(), from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = advanced.due_date_to {
            params.push(("due_date_to".to_string(), to.format("%Y-%m-%d").to_string()));
        }
        if let Some(sort_by) = advanced.sort_by {
            params.push(("sort_by".to_string(), sort_by.as_str().to_string()));
            params.push((
                "sort_order".to_string(),
                advanced.sort_order.as_str().to_string(),
            ));
        }

        params
    }

    fn build_query_string(params: &[(String, String)]) -> String {
        if params.is_empty() {
            return String::new();
        }

        format!(
            "?{}",
            params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
        )
    }
}

#[async_trait]
impl TaskRepository for HttpTaskRepository {
    async fn list_tasks(&self, session: &Session, query: &TaskQuery) -> RepositoryResult<Vec<Task>> {
        let params = Self::build_query_params(query);
        let query_string = Self::build_query_string(&params);
        let path = format!("{}{}", Self::tasks_path(session), query_string);

        let task_dtos: Vec<TaskDto> = self.client.get(&path, &session.token).await?;
        Ok(task_dtos.into_iter().map(Task::from).collect())
    }

    async fn create_task(&self, session: &Session, draft: &TaskDraft) -> RepositoryResult<Task> {
        let path = Self::tasks_path(session);
        let create_dto = TaskCreateDto::from(draft);

        let task_dto: TaskDto = self.client.post(&path, &session.token, &create_dto).await?;
        Ok(task_dto.into())
    }

    async fn update_task(
        &self,
        session: &Session,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> RepositoryResult<Task> {
        let path = format!("{}/{}", Self::tasks_path(session), id);
        let patch_dto = TaskPatchDto::from(patch);

        let task_dto: TaskDto = self.client.put(&path, &session.token, &patch_dto).await?;
        Ok(task_dto.into())
    }

    async fn delete_task(&self, session: &Session, id: &TaskId) -> RepositoryResult<()> {
        let path = format!("{}/{}", Self::tasks_path(session), id);
        self.client.delete(&path, &session.token).await
    }

    async fn toggle_complete(
        &self,
        session: &Session,
        id: &TaskId,
        completed: bool,
    ) -> RepositoryResult<Task> {
        let path = format!("{}/{}/toggle", Self::tasks_path(session), id);
        let toggle_dto = ToggleDto { completed };

        let task_dto: TaskDto = self.client.patch(&path, &session.token, &toggle_dto).await?;
        Ok(task_dto.into())
    }
}
