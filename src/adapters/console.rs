use crate::application::{counts, visible, AppResult, MutationCoordinator, MutationOutcome};
use crate::domain::{
    Priority, Session, SortKey, SortOrder, StatusFilter, Task, TaskDraft, TaskId, TaskPatch,
    TaskQuery,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Interactive console session: reads commands from stdin, applies them
/// through the mutation coordinator, and reprints the visible list. This is
/// the surface where the live task store, the undo affordance, and the
/// dismissible error banner exist.
pub struct ConsoleApp {
    coordinator: MutationCoordinator,
    session: Session,
    query: TaskQuery,
}

/// Taskwarrior-style tokens shared by `add` and `edit`: bare words form the
/// title, `+tag` collects tags, `priority:` and `due:` set fields.
#[derive(Debug, Default)]
struct EditTokens {
    words: Vec<String>,
    tags: Vec<String>,
    priority: Option<Priority>,
    due_date: Option<Option<DateTime<Utc>>>,
}

impl EditTokens {
    fn parse<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Self, String> {
        let mut parsed = Self::default();
        for token in tokens {
            if let Some(tag) = token.strip_prefix('+') {
                if !tag.is_empty() {
                    parsed.tags.push(tag.to_string());
                }
            } else if let Some(raw) = token.strip_prefix("priority:").or_else(|| token.strip_prefix("pri:")) {
                parsed.priority = Some(Priority::from_str(raw)?);
            } else if let Some(raw) = token.strip_prefix("due:") {
                if raw.eq_ignore_ascii_case("none") {
                    parsed.due_date = Some(None);
                } else {
                    parsed.due_date = Some(Some(parse_due_date(raw)?));
                }
            } else {
                parsed.words.push(token.to_string());
            }
        }
        Ok(parsed)
    }

    fn title(&self) -> Option<String> {
        if self.words.is_empty() {
            None
        } else {
            Some(self.words.join(" "))
        }
    }
}

fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_hms_opt(0, 0, 0).unwrap().and_utc())
        .map_err(|_| format!("invalid date (expected YYYY-MM-DD): {raw}"))
}

fn parse_task_id(raw: &str) -> Result<TaskId, String> {
    raw.parse::<i64>()
        .map(TaskId)
        .map_err(|_| format!("invalid task id: {raw}"))
}

impl ConsoleApp {
    pub fn new(coordinator: MutationCoordinator, session: Session) -> Self {
        Self {
            coordinator,
            session,
            query: TaskQuery::default(),
        }
    }

    pub async fn run(mut self) -> AppResult<()> {
        println!("todo-cli interactive session. Type 'help' for commands.");
        self.coordinator.refresh(&self.session, &self.query).await;
        self.print_banner();
        self.print_tasks();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(b"> ").await.ok();
            stdout.flush().await.ok();

            let Ok(Some(line)) = lines.next_line().await else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "quit" | "exit" | "q") {
                break;
            }

            self.handle_line(line).await;
            self.print_banner();
        }

        Ok(())
    }

    async fn handle_line(&mut self, line: &str) {
        let mut tokens = line.split_whitespace();
        let command = tokens.next().unwrap_or_default();

        match command {
            "help" | "?" => Self::print_help(),
            "list" | "ls" => self.print_tasks(),
            "refresh" => {
                if self.coordinator.refresh(&self.session, &self.query).await {
                    self.print_tasks();
                }
            }
            "add" => self.add(tokens).await,
            "edit" => self.edit(tokens).await,
            "done" => self.toggle(tokens.next()).await,
            "rm" => self.delete(tokens.next()).await,
            "undo" => {
                if !self.coordinator.can_undo() {
                    println!("Nothing to undo.");
                } else if let Some(id) = self.coordinator.undo() {
                    println!("Restored task {id}.");
                    self.print_tasks();
                }
            }
            "redo" => {
                if !self.coordinator.can_redo() {
                    println!("Nothing to redo.");
                } else if let Some(id) = self.coordinator.redo() {
                    println!("Removed task {id} again.");
                    self.print_tasks();
                }
            }
            "status" => match tokens.next().map(StatusFilter::from_str) {
                Some(Ok(status)) => {
                    self.query.status = status;
                    self.print_tasks();
                }
                Some(Err(e)) => println!("{e}"),
                None => println!("usage: status all|pending|completed"),
            },
            "search" => {
                let term = tokens.collect::<Vec<_>>().join(" ");
                self.query.search = if term.is_empty() { None } else { Some(term) };
                self.print_tasks();
            }
            "filter" => self.filter(tokens),
            other => println!("Unknown command: {other}. Type 'help' for commands."),
        }
    }

    async fn add<'a>(&mut self, tokens: impl Iterator<Item = &'a str>) {
        let parsed = match EditTokens::parse(tokens) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("{e}");
                return;
            }
        };

        let draft = TaskDraft {
            title: parsed.title().unwrap_or_default(),
            description: None,
            priority: parsed.priority,
            due_date: parsed.due_date.flatten(),
            tags: if parsed.tags.is_empty() {
                None
            } else {
                Some(parsed.tags.join(","))
            },
        };

        match self.coordinator.create(&self.session, draft).await {
            Ok(MutationOutcome::Confirmed) => {
                println!("Task added.");
                self.print_tasks();
            }
            Ok(MutationOutcome::RolledBack) => {}
            Err(e) => println!("{e}"),
        }
    }

    async fn edit<'a>(&mut self, mut tokens: impl Iterator<Item = &'a str>) {
        let id = match tokens.next().map(parse_task_id) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                println!("{e}");
                return;
            }
            None => {
                println!("usage: edit <id> [title words] [+tag] [priority:p] [due:YYYY-MM-DD|none]");
                return;
            }
        };
        let parsed = match EditTokens::parse(tokens) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("{e}");
                return;
            }
        };

        let patch = TaskPatch {
            title: parsed.title(),
            priority: parsed.priority,
            due_date: parsed.due_date,
            tags: if parsed.tags.is_empty() {
                None
            } else {
                Some(parsed.tags.join(","))
            },
            ..Default::default()
        };

        match self.coordinator.update(&self.session, &id, patch).await {
            Ok(MutationOutcome::Confirmed) => {
                println!("Task {id} updated.");
                self.print_tasks();
            }
            Ok(MutationOutcome::RolledBack) => {}
            Err(e) => println!("{e}"),
        }
    }

    async fn toggle(&mut self, raw_id: Option<&str>) {
        let id = match raw_id.map(parse_task_id) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                println!("{e}");
                return;
            }
            None => {
                println!("usage: done <id>");
                return;
            }
        };

        if self.coordinator.toggle_complete(&self.session, &id).await
            == MutationOutcome::Confirmed
        {
            match self.coordinator.store().get(&id) {
                Some(task) if task.completed => {
                    println!("Task \"{}\" marked as completed.", task.title);
                }
                Some(task) => println!("Task \"{}\" marked as pending.", task.title),
                None => {}
            }
            self.print_tasks();
        }
    }

    async fn delete(&mut self, raw_id: Option<&str>) {
        let id = match raw_id.map(parse_task_id) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                println!("{e}");
                return;
            }
            None => {
                println!("usage: rm <id>");
                return;
            }
        };

        let title = self
            .coordinator
            .store()
            .get(&id)
            .map(|t| t.title.clone());
        if self.coordinator.delete(&self.session, &id).await == MutationOutcome::Confirmed {
            if let Some(title) = title {
                println!("Task \"{title}\" deleted. Type 'undo' to restore.");
            }
            self.print_tasks();
        }
    }

    fn filter<'a>(&mut self, tokens: impl Iterator<Item = &'a str>) {
        let mut seen_any = false;
        for token in tokens {
            seen_any = true;
            let result = if token == "clear" {
                self.query.advanced = Default::default();
                Ok(())
            } else if let Some(raw) = token.strip_prefix("priority:") {
                Priority::from_str(raw).map(|p| self.query.advanced.priority = Some(p))
            } else if let Some(raw) = token.strip_prefix("tag:") {
                self.query.advanced.tag = Some(raw.to_string());
                Ok(())
            } else if let Some(raw) = token.strip_prefix("from:") {
                parse_naive_date(raw).map(|d| self.query.advanced.due_date_from = Some(d))
            } else if let Some(raw) = token.strip_prefix("to:") {
                parse_naive_date(raw).map(|d| self.query.advanced.due_date_to = Some(d))
            } else if let Some(raw) = token.strip_prefix("sort:") {
                SortKey::from_str(raw).map(|k| self.query.advanced.sort_by = Some(k))
            } else if let Some(raw) = token.strip_prefix("order:") {
                SortOrder::from_str(raw).map(|o| self.query.advanced.sort_order = o)
            } else {
                Err(format!("unknown filter token: {token}"))
            };

            if let Err(e) = result {
                println!("{e}");
                return;
            }
        }

        if !seen_any {
            println!(
                "usage: filter [clear] [priority:p] [tag:t] [from:date] [to:date] [sort:key] [order:asc|desc]"
            );
            return;
        }
        self.print_tasks();
    }

    fn print_tasks(&self) {
        let store = self.coordinator.store();
        let (all, pending, completed) = counts(store.tasks());
        let shown = visible(
            store.tasks(),
            self.query.status,
            self.query.search.as_deref().unwrap_or(""),
            &self.query.advanced,
        );

        println!("{pending} pending, {completed} completed, {all} total");
        if store.is_empty() {
            println!("No tasks yet. 'add <title>' creates one.");
            return;
        }
        if shown.is_empty() {
            println!("No tasks match the current view.");
            return;
        }
        for task in &shown {
            println!("{}", Self::format_row(task));
        }
    }

    fn format_row(task: &Task) -> String {
        let mark = if task.completed { "x" } else { " " };
        let overdue = if task.is_overdue() { ", overdue" } else { "" };
        let tags = match task.tag_set() {
            tags if tags.is_empty() => String::new(),
            tags => format!("  [{}]", tags.join(", ")),
        };
        format!(
            "{:>14}  [{}] {:<7} {}  ({}{}){}",
            task.id.to_string(),
            mark,
            task.priority.as_str(),
            task.title,
            task.due_date_display(),
            overdue,
            tags,
        )
    }

    /// Print and dismiss the session-level error banner, if any.
    fn print_banner(&mut self) {
        if let Some(message) = self.coordinator.take_error() {
            println!("error: {message}");
        }
    }

    fn print_help() {
        println!("Commands:");
        println!("  list                      show the current view");
        println!("  refresh                   refetch from the server");
        println!("  add <title> [+tag] [priority:p] [due:YYYY-MM-DD]");
        println!("  edit <id> [title] [+tag] [priority:p] [due:YYYY-MM-DD|none]");
        println!("  done <id>                 toggle completion");
        println!("  rm <id>                   delete (undo available)");
        println!("  undo / redo               walk the delete history");
        println!("  status all|pending|completed");
        println!("  search [term]             free-text search (empty clears)");
        println!("  filter priority:p tag:t from:date to:date sort:key order:asc|desc");
        println!("  filter clear              drop advanced filters");
        println!("  quit");
    }
}

fn parse_naive_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date (expected YYYY-MM-DD): {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_split_title_tags_and_fields() {
        let parsed =
            EditTokens::parse("Buy milk +home +errands priority:high due:2024-06-01".split_whitespace())
                .unwrap();

        assert_eq!(parsed.title(), Some("Buy milk".to_string()));
        assert_eq!(parsed.tags, vec!["home", "errands"]);
        assert_eq!(parsed.priority, Some(Priority::High));
        assert!(matches!(parsed.due_date, Some(Some(_))));
    }

    #[test]
    fn due_none_clears_the_due_date() {
        let parsed = EditTokens::parse("due:none".split_whitespace()).unwrap();
        assert_eq!(parsed.due_date, Some(None));
        assert_eq!(parsed.title(), None);
    }

    #[test]
    fn bad_modifier_values_are_reported() {
        assert!(EditTokens::parse("priority:sideways".split_whitespace()).is_err());
        assert!(EditTokens::parse("due:tuesday".split_whitespace()).is_err());
    }
}
