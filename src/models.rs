use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned identity. The remote service hands out numeric ids for
/// entries and tasks, but profile ids travel as strings once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Number(i64),
    Text(String),
}

impl EntryId {
    pub fn as_path_segment(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(number) => Self::Number(number),
            Err(_) => Self::Text(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    Water,
    Sleep,
    Meditation,
    Activity,
    Sunlight,
    Tasks,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        Self::Water,
        Self::Sleep,
        Self::Meditation,
        Self::Activity,
        Self::Sunlight,
        Self::Tasks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Sleep => "sleep",
            Self::Meditation => "meditation",
            Self::Activity => "activity",
            Self::Sunlight => "sunlight",
            Self::Tasks => "tasks",
        }
    }

    /// Resource segment on the remote API.
    pub fn resource(self) -> &'static str {
        match self {
            Self::Activity => "physical-activity",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntryId,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub water: f64,
    pub sleep: f64,
    pub meditation: f64,
    pub activity: f64,
    pub sunlight: f64,
    pub tasks_count: usize,
    pub tasks: Vec<Task>,
}

impl DailySummary {
    pub fn value_of(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Water => self.water,
            MetricKind::Sleep => self.sleep,
            MetricKind::Meditation => self.meditation,
            MetricKind::Activity => self.activity,
            MetricKind::Sunlight => self.sunlight,
            MetricKind::Tasks => self.tasks_count as f64,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.tasks_count == self.tasks.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapState {
    Loading,
    NeedsProfile,
    Ready(DailySummary),
    SubmitError(String),
}

impl BootstrapState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn summary(&self) -> Option<&DailySummary> {
        match self {
            Self::Ready(summary) => Some(summary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProfile {
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub sleep_quality: Option<f64>,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// A record returned by a create or update call. Only the id is common to
/// every metric; the rest is kept as the server sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub id: EntryId,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    #[serde(default)]
    pub week: String,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DailySummary, EntryId, MetricKind, Task};

    #[test]
    fn entry_id_accepts_numbers_and_strings() {
        let numeric: EntryId = serde_json::from_str("7").expect("numeric id");
        let text: EntryId = serde_json::from_str("\"abc-1\"").expect("text id");
        assert_eq!(numeric, EntryId::Number(7));
        assert_eq!(text, EntryId::Text("abc-1".to_string()));
        assert_eq!(EntryId::from("42"), EntryId::Number(42));
        assert_eq!(EntryId::from("42").to_string(), "42");
    }

    #[test]
    fn activity_uses_physical_activity_resource() {
        assert_eq!(MetricKind::Activity.resource(), "physical-activity");
        assert_eq!(MetricKind::Water.resource(), "water");
        assert_eq!(MetricKind::ALL.len(), 6);
    }

    #[test]
    fn task_tolerates_sparse_server_rows() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "stretch"
        }))
        .expect("task");
        assert_eq!(task.title, "stretch");
        assert!(!task.is_complete);
        assert_eq!(task.priority, 0);
        assert!(task.description.is_none());
    }

    #[test]
    fn default_summary_is_consistent() {
        let summary = DailySummary::default();
        assert!(summary.is_consistent());
        assert_eq!(summary.value_of(MetricKind::Tasks), 0.0);
    }
}
