use crate::dashboard::DashboardAggregator;
use crate::errors::{AppError, AppResult};
use crate::gateway::{NewMetricEntry, TaskDraft};
use crate::models::{DailySummary, EntryId, MetricKind, Task};
use crate::notify::{Notification, Notifier};
use serde_json::Value;
use std::sync::Arc;

/// Local edits that can be predicted without asking the server.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryEvent {
    TaskRemoved(EntryId),
}

/// Pure optimistic patch. Keeps `tasks_count` equal to `tasks.len()`.
pub fn apply_event(summary: &DailySummary, event: &SummaryEvent) -> DailySummary {
    match event {
        SummaryEvent::TaskRemoved(id) => {
            let tasks: Vec<Task> = summary
                .tasks
                .iter()
                .filter(|task| &task.id != id)
                .cloned()
                .collect();
            DailySummary {
                tasks_count: tasks.len(),
                tasks,
                ..summary.clone()
            }
        }
    }
}

/// Applies one mutation at a time against the remote resources. Failures
/// are surfaced as notifications and leave the caller's summary untouched.
#[derive(Clone)]
pub struct MutationCoordinator {
    aggregator: DashboardAggregator,
    notifier: Arc<dyn Notifier>,
}

impl MutationCoordinator {
    pub fn new(aggregator: DashboardAggregator, notifier: Arc<dyn Notifier>) -> Self {
        Self { aggregator, notifier }
    }

    /// Removes a task and patches the cached summary locally; no re-fetch.
    /// A task the server no longer has counts as removed.
    pub async fn delete_task(&self, summary: &DailySummary, id: &EntryId) -> AppResult<DailySummary> {
        match self.aggregator.gateways().tasks.remove(id).await {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                tracing::info!(task_id = %id, "task already gone remotely");
            }
            Err(error) => return Err(self.failed("Could not delete task", error)),
        }

        self.notifier.notify(Notification::success("Task deleted"));
        Ok(apply_event(summary, &SummaryEvent::TaskRemoved(id.clone())))
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> AppResult<DailySummary> {
        self.validated(draft.validate(), "Enter a task title")?;
        let entry = self
            .aggregator
            .gateways()
            .tasks
            .create(draft.to_body())
            .await
            .map_err(|error| self.failed("Could not add task", error))?;

        match entry {
            Some(entry) => tracing::info!(task_id = %entry.id, "task created"),
            None => tracing::info!("task created"),
        }
        self.notifier.notify(Notification::success("Task added"));
        self.aggregator.refresh().await
    }

    /// Flips completion by sending the whole task back.
    pub async fn toggle_task(&self, task: &Task) -> AppResult<DailySummary> {
        let mut toggled = task.clone();
        toggled.is_complete = !task.is_complete;
        self.aggregator
            .gateways()
            .tasks
            .update(&task.id, serde_json::to_value(&toggled)?)
            .await
            .map_err(|error| self.failed("Could not update task", error))?;

        self.notifier.notify(Notification::success("Task updated"));
        self.aggregator.refresh().await
    }

    /// A new entry triggers a full refresh of every metric.
    pub async fn add_entry(&self, entry: &NewMetricEntry) -> AppResult<DailySummary> {
        let kind = entry.kind();
        self.validated(entry.validate(), "Enter a valid value")?;
        let created = self
            .aggregator
            .gateways()
            .get(kind)
            .create(entry.to_body())
            .await
            .map_err(|error| self.failed(&format!("Could not record {}", kind), error))?;

        match created {
            Some(created) => tracing::info!(metric = %kind, entry_id = %created.id, "entry created"),
            None => tracing::info!(metric = %kind, "entry created"),
        }
        self.notifier
            .notify(Notification::success(format!("{} recorded", capitalize(kind.as_str()))));
        self.aggregator.refresh().await
    }

    pub async fn update_entry(&self, kind: MetricKind, id: &EntryId, patch: Value) -> AppResult<DailySummary> {
        self.aggregator
            .gateways()
            .get(kind)
            .update(id, patch)
            .await
            .map_err(|error| self.failed(&format!("Could not update {}", kind), error))?;
        self.notifier
            .notify(Notification::success(format!("{} updated", capitalize(kind.as_str()))));
        self.aggregator.refresh().await
    }

    pub async fn remove_entry(&self, kind: MetricKind, id: &EntryId) -> AppResult<DailySummary> {
        match self.aggregator.gateways().get(kind).remove(id).await {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                tracing::info!(metric = %kind, entry_id = %id, "entry already gone remotely");
            }
            Err(error) => return Err(self.failed(&format!("Could not remove {}", kind), error)),
        }
        self.notifier
            .notify(Notification::success(format!("{} removed", capitalize(kind.as_str()))));
        self.aggregator.refresh().await
    }

    fn validated(&self, result: AppResult<()>, title: &str) -> AppResult<()> {
        if let Err(error) = &result {
            self.notifier.notify(Notification::info(title).with_detail(error.to_string()));
        }
        result
    }

    fn failed(&self, title: &str, error: AppError) -> AppError {
        tracing::warn!(error = %error, "{}", title);
        self.notifier.notify(Notification::error(title, error.to_string()));
        error
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
