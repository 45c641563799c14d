use crate::domain::{AdvancedFilters, SortKey, SortOrder, StatusFilter, Task};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;

/// Compute the ordered visible subset of `tasks`. Pure: identical inputs
/// give identical output, with no reads of the wall clock.
///
/// All active predicates are ANDed. With a sort key the comparison is
/// stable; records missing the key sort after records that have it no
/// matter the direction. Without a sort key the order is newest-first by
/// identifier.
pub fn visible(
    tasks: &[Task],
    status: StatusFilter,
    search: &str,
    advanced: &AdvancedFilters,
) -> Vec<Task> {
    let search = search.trim().to_lowercase();
    let tag = advanced.tag.as_deref().map(str::to_lowercase);
    let from = advanced.due_date_from.map(start_of_day);
    let to = advanced.due_date_to.map(end_of_day);

    let mut selected: Vec<Task> = tasks
        .iter()
        .filter(|task| {
            matches_status(task, status)
                && matches_search(task, &search)
                && advanced.priority.map_or(true, |p| task.priority == p)
                && tag.as_deref().map_or(true, |t| matches_tag(task, t))
                && matches_due_range(task, from, to)
        })
        .cloned()
        .collect();

    match advanced.sort_by {
        Some(key) => {
            selected.sort_by(|a, b| compare_by(a, b, key, advanced.sort_order));
        }
        None => {
            selected.sort_by(|a, b| b.id.recency().cmp(&a.id.recency()));
        }
    }

    selected
}

/// Status tab counters over the unfiltered store: (all, pending, completed).
pub fn counts(tasks: &[Task]) -> (usize, usize, usize) {
    let completed = tasks.iter().filter(|t| t.completed).count();
    (tasks.len(), tasks.len() - completed, completed)
}

fn matches_status(task: &Task, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Pending => !task.completed,
        StatusFilter::Completed => task.completed,
    }
}

fn matches_search(task: &Task, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
        || task
            .tags
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(needle))
}

fn matches_tag(task: &Task, needle: &str) -> bool {
    task.tags
        .as_deref()
        .is_some_and(|t| t.to_lowercase().contains(needle))
}

/// A task with no due date fails any active date bound.
fn matches_due_range(
    task: &Task,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let Some(due) = task.due_date else {
        return false;
    };
    from.map_or(true, |bound| due >= bound) && to.map_or(true, |bound| due <= bound)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc()
}

/// The upper bound is inclusive of the whole calendar day.
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999).unwrap().and_utc()
}

fn compare_by(a: &Task, b: &Task, key: SortKey, order: SortOrder) -> Ordering {
    match key {
        SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at), order),
        SortKey::Title => directed(a.title.cmp(&b.title), order),
        SortKey::Priority => directed(a.priority.cmp(&b.priority), order),
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (None, None) => Ordering::Equal,
            // Missing field sorts after, regardless of direction.
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a_due), Some(b_due)) => directed(a_due.cmp(&b_due), order),
        },
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, TaskId, UserId};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn task(id: i64, title: &str) -> Task {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(id.unsigned_abs() as i64);
        Task {
            id: TaskId(id),
            title: title.to_string(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            due_date: None,
            tags: None,
            user_id: UserId(Uuid::nil()),
            created_at: created,
            updated_at: created,
            completed_at: None,
        }
    }

    fn due(mut t: Task, y: i32, m: u32, d: u32) -> Task {
        t.due_date = Some(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap());
        t
    }

    #[test]
    fn pending_filter_selects_incomplete_tasks() {
        let mut high = task(1, "one");
        high.priority = Priority::High;
        let got = visible(&[high], StatusFilter::Pending, "", &AdvancedFilters::default());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, TaskId(1));
    }

    #[test]
    fn pending_filter_hides_completed_tasks() {
        let mut done = task(1, "one");
        done.completed = true;
        let got = visible(&[done], StatusFilter::Pending, "", &AdvancedFilters::default());
        assert!(got.is_empty());
    }

    #[test]
    fn due_date_to_is_end_of_day_inclusive() {
        let early = due(task(1, "early"), 2024, 1, 1);
        let late = due(task(2, "late"), 2024, 1, 31);
        let filters = AdvancedFilters {
            due_date_from: Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            due_date_to: Some(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            ..Default::default()
        };

        let got = visible(&[early, late], StatusFilter::All, "", &filters);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, TaskId(2));
    }

    #[test]
    fn task_without_due_date_fails_any_date_bound() {
        let undated = task(1, "undated");
        let filters = AdvancedFilters {
            due_date_from: Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            ..Default::default()
        };
        assert!(visible(&[undated], StatusFilter::All, "", &filters).is_empty());
    }

    #[test]
    fn active_predicates_are_anded() {
        let mut hit = due(task(1, "Write report"), 2024, 3, 10);
        hit.priority = Priority::High;
        hit.tags = Some("work,writing".to_string());

        let mut wrong_priority = due(task(2, "Write notes"), 2024, 3, 10);
        wrong_priority.tags = Some("work".to_string());

        let mut wrong_tag = due(task(3, "Write letter"), 2024, 3, 10);
        wrong_tag.priority = Priority::High;
        wrong_tag.tags = Some("personal".to_string());

        let filters = AdvancedFilters {
            priority: Some(Priority::High),
            tag: Some("WORK".to_string()),
            ..Default::default()
        };

        let got = visible(
            &[hit, wrong_priority, wrong_tag],
            StatusFilter::All,
            "write",
            &filters,
        );
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, TaskId(1));
    }

    #[test]
    fn search_is_case_insensitive_over_title_description_and_tags() {
        let mut by_description = task(1, "alpha");
        by_description.description = Some("Quarterly BUDGET numbers".to_string());
        let mut by_tags = task(2, "beta");
        by_tags.tags = Some("budget,finance".to_string());
        let miss = task(3, "gamma");

        let got = visible(
            &[by_description, by_tags, miss],
            StatusFilter::All,
            "budget",
            &AdvancedFilters::default(),
        );
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let tasks = vec![
            due(task(1, "a"), 2024, 2, 1),
            task(2, "b"),
            due(task(3, "c"), 2024, 2, 20),
        ];
        let filters = AdvancedFilters {
            due_date_from: Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            sort_by: Some(SortKey::DueDate),
            ..Default::default()
        };

        let once = visible(&tasks, StatusFilter::All, "", &filters);
        let twice = visible(&once, StatusFilter::All, "", &filters);
        assert_eq!(once, twice);
    }

    #[test]
    fn sort_is_stable_on_equal_keys() {
        let tasks = vec![task(1, "first"), task(2, "second"), task(3, "third")];
        let filters = AdvancedFilters {
            sort_by: Some(SortKey::Priority),
            ..Default::default()
        };

        let got = visible(&tasks, StatusFilter::All, "", &filters);
        let ids: Vec<i64> = got.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn missing_due_date_sorts_last_in_both_directions() {
        let tasks = vec![
            task(1, "undated"),
            due(task(2, "early"), 2024, 1, 5),
            due(task(3, "late"), 2024, 6, 5),
        ];

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let filters = AdvancedFilters {
                sort_by: Some(SortKey::DueDate),
                sort_order: order,
                ..Default::default()
            };
            let got = visible(&tasks, StatusFilter::All, "", &filters);
            assert_eq!(got.last().unwrap().id, TaskId(1), "order {order:?}");
        }
    }

    #[test]
    fn desc_negates_the_comparison() {
        let tasks = vec![due(task(1, "early"), 2024, 1, 5), due(task(2, "late"), 2024, 6, 5)];
        let filters = AdvancedFilters {
            sort_by: Some(SortKey::DueDate),
            sort_order: SortOrder::Desc,
            ..Default::default()
        };

        let got = visible(&tasks, StatusFilter::All, "", &filters);
        assert_eq!(got[0].id, TaskId(2));
    }

    #[test]
    fn default_order_is_newest_first_with_pending_creates_on_top() {
        let tasks = vec![task(3, "older"), task(7, "newer"), task(-1_700_000_000_000, "pending")];

        let got = visible(&tasks, StatusFilter::All, "", &AdvancedFilters::default());
        let ids: Vec<i64> = got.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![-1_700_000_000_000, 7, 3]);
    }

    #[test]
    fn counts_cover_the_unfiltered_store() {
        let mut done = task(1, "done");
        done.completed = true;
        let tasks = vec![done, task(2, "open"), task(3, "open too")];
        assert_eq!(counts(&tasks), (3, 2, 1));
    }
}
