//! Task use-case service and dashboard/calendar views.
//!
//! # Responsibility
//! - Apply creation-flow rules before delegating to the repository.
//! - Provide pure selections used by the home and calendar screens.
//!
//! # Invariants
//! - Due dates set through `create_task` land on local midnight.
//! - `*_owned` operations only touch tasks of the calling owner.
//! - View helpers never touch storage.

use crate::model::task::{NewTask, Task, TaskPatch};
use crate::repo::task_repo::TaskRepository;
use crate::repo::{check_owner, not_found, RepoResult};
use crate::store::{Collection, DocumentId};
use crate::timestamp::DateInput;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use std::collections::BTreeSet;

const DAY_QUARTER_HOURS: i64 = 24 * 4;

/// Use-case service wrapper for task operations.
pub struct TaskService<R: TaskRepository, Z: TimeZone = Local> {
    repo: R,
    tz: Z,
}

impl<R: TaskRepository> TaskService<R> {
    /// Service using the process-local time zone.
    pub fn new(repo: R) -> Self {
        Self { repo, tz: Local }
    }
}

impl<R: TaskRepository, Z: TimeZone> TaskService<R, Z> {
    pub fn with_time_zone(repo: R, tz: Z) -> Self {
        Self { repo, tz }
    }

    /// Creates a task; a parseable due date is truncated to its local day.
    ///
    /// Unparseable due dates pass through and are dropped by the repository.
    pub fn create_task(&self, owner_id: &str, task: NewTask) -> RepoResult<Task> {
        let mut task = task;
        task.title = task.title.trim().to_string();
        if let Some(instant) = task.due_date.as_ref().and_then(DateInput::to_instant) {
            task.due_date = Some(DateInput::Instant(start_of_local_day(instant, &self.tz)));
        }
        self.repo.create_task(owner_id, &task)
    }

    /// Flips the completed flag and returns the merged task.
    pub fn toggle_completed(&self, id: &DocumentId) -> RepoResult<Task> {
        let current = self
            .repo
            .get_task(id)?
            .ok_or_else(|| not_found(Collection::Tasks, id))?;
        self.repo
            .update_task(id, &TaskPatch::completed(!current.completed))
    }

    /// `toggle_completed` for a task that must belong to `owner_id`.
    pub fn toggle_completed_owned(&self, owner_id: &str, id: &DocumentId) -> RepoResult<Task> {
        let current = self.owned_task(owner_id, id)?;
        self.repo
            .update_task(id, &TaskPatch::completed(!current.completed))
    }

    pub fn update_task_owned(
        &self,
        owner_id: &str,
        id: &DocumentId,
        patch: &TaskPatch,
    ) -> RepoResult<Task> {
        self.owned_task(owner_id, id)?;
        self.repo.update_task(id, patch)
    }

    pub fn delete_task_owned(&self, owner_id: &str, id: &DocumentId) -> RepoResult<()> {
        self.owned_task(owner_id, id)?;
        self.repo.delete_task(id)
    }

    fn owned_task(&self, owner_id: &str, id: &DocumentId) -> RepoResult<Task> {
        let task = self
            .repo
            .get_task(id)?
            .ok_or_else(|| not_found(Collection::Tasks, id))?;
        check_owner(Collection::Tasks, id, &task.owner_id, owner_id)?;
        Ok(task)
    }

    pub fn list_tasks(&self, owner_id: &str) -> RepoResult<Vec<Task>> {
        self.repo.list_tasks(owner_id)
    }

    pub fn get_task(&self, id: &DocumentId) -> RepoResult<Option<Task>> {
        self.repo.get_task(id)
    }

    pub fn update_task(&self, id: &DocumentId, patch: &TaskPatch) -> RepoResult<Task> {
        self.repo.update_task(id, patch)
    }

    pub fn delete_task(&self, id: &DocumentId) -> RepoResult<()> {
        self.repo.delete_task(id)
    }

    /// Tasks due on `day` in this service's time zone.
    pub fn due_on<'a>(&self, tasks: &'a [Task], day: NaiveDate) -> Vec<&'a Task> {
        tasks_due_on(tasks, day, &self.tz)
    }

    /// Open tasks due from the start of today on, soonest first.
    pub fn upcoming<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        upcoming_tasks(tasks, Utc::now().with_timezone(&self.tz))
    }
}

/// Start of the local calendar day containing `instant`.
///
/// That is local midnight, or the first valid local time when a DST gap
/// swallows midnight.
pub fn start_of_local_day<Z: TimeZone>(instant: DateTime<Utc>, tz: &Z) -> DateTime<Utc> {
    let day = instant.with_timezone(tz).date_naive();
    first_instant_of_local_day(day, tz).unwrap_or(instant)
}

/// First existing local time of `day` in `tz`, scanned in quarter-hour steps
/// from midnight. `None` only when the zone skips the whole day.
pub fn first_instant_of_local_day<Z: TimeZone>(day: NaiveDate, tz: &Z) -> Option<DateTime<Utc>> {
    let midnight = day.and_hms_opt(0, 0, 0)?;
    (0..DAY_QUARTER_HOURS).find_map(|step| {
        let local = midnight + Duration::minutes(15 * step);
        tz.from_local_datetime(&local)
            .earliest()
            .map(|found| found.with_timezone(&Utc))
    })
}

fn local_day<Z: TimeZone>(instant: &DateTime<Utc>, tz: &Z) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Tasks whose due date falls on `day` in `tz`, in input order.
pub fn tasks_due_on<'a, Z: TimeZone>(tasks: &'a [Task], day: NaiveDate, tz: &Z) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| {
            task.due_date
                .as_ref()
                .is_some_and(|due| local_day(due, tz) == day)
        })
        .collect()
}

/// Incomplete tasks due on or after the local day of `now`, ascending by due
/// date. Ties keep input order.
pub fn upcoming_tasks<Z: TimeZone>(tasks: &[Task], now: DateTime<Z>) -> Vec<&Task> {
    let tz = now.timezone();
    let today = now.date_naive();
    let mut upcoming: Vec<&Task> = tasks
        .iter()
        .filter(|task| !task.completed)
        .filter(|task| {
            task.due_date
                .as_ref()
                .is_some_and(|due| local_day(due, &tz) >= today)
        })
        .collect();
    upcoming.sort_by_key(|task| task.due_date);
    upcoming
}

/// Distinct local days that have at least one task due.
pub fn calendar_marked_days<Z: TimeZone>(tasks: &[Task], tz: &Z) -> BTreeSet<NaiveDate> {
    tasks
        .iter()
        .filter_map(|task| task.due_date.as_ref())
        .map(|due| local_day(due, tz))
        .collect()
}
