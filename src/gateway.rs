use crate::errors::{AppError, AppResult};
use crate::models::{EntryId, MetricEntry, MetricKind, Task, WeekSummary};
use crate::transport::ApiTransport;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterToday {
    #[serde(default)]
    pub total_ml: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SleepRecord {
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub quality: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SleepToday {
    #[serde(default)]
    pub record: Option<SleepRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TotalToday {
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub items: Vec<Value>,
}

/// The `today` payload exactly as each resource shapes it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMetricResponse {
    Water(WaterToday),
    Sleep(SleepToday),
    Meditation(TotalToday),
    Activity(TotalToday),
    Sunlight(TotalToday),
    Tasks(Vec<Task>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedTodayValue {
    Amount(f64),
    Tasks(Vec<Task>),
}

impl NormalizedTodayValue {
    pub fn zero(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Tasks => Self::Tasks(Vec::new()),
            _ => Self::Amount(0.0),
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            Self::Amount(value) => *value,
            Self::Tasks(tasks) => tasks.len() as f64,
        }
    }
}

impl RawMetricResponse {
    /// A null body decodes to the resource's empty shape.
    pub fn decode(kind: MetricKind, body: Value) -> AppResult<Self> {
        let decoded = match kind {
            MetricKind::Water => Self::Water(decode_or_default(body)?),
            MetricKind::Sleep => Self::Sleep(decode_or_default(body)?),
            MetricKind::Meditation => Self::Meditation(decode_or_default(body)?),
            MetricKind::Activity => Self::Activity(decode_or_default(body)?),
            MetricKind::Sunlight => Self::Sunlight(decode_or_default(body)?),
            MetricKind::Tasks => Self::Tasks(decode_or_default(body)?),
        };
        Ok(decoded)
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Water(_) => MetricKind::Water,
            Self::Sleep(_) => MetricKind::Sleep,
            Self::Meditation(_) => MetricKind::Meditation,
            Self::Activity(_) => MetricKind::Activity,
            Self::Sunlight(_) => MetricKind::Sunlight,
            Self::Tasks(_) => MetricKind::Tasks,
        }
    }

    pub fn normalize(self) -> NormalizedTodayValue {
        match self {
            Self::Water(water) => NormalizedTodayValue::Amount(finite_or_zero(water.total_ml)),
            // quality is tracked per record but never summarized
            Self::Sleep(sleep) => NormalizedTodayValue::Amount(finite_or_zero(
                sleep.record.and_then(|record| record.hours),
            )),
            Self::Meditation(today) | Self::Activity(today) | Self::Sunlight(today) => {
                NormalizedTodayValue::Amount(finite_or_zero(today.total))
            }
            Self::Tasks(tasks) => NormalizedTodayValue::Tasks(tasks),
        }
    }
}

fn decode_or_default<T>(body: Value) -> AppResult<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if body.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(body)?)
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|value| value.is_finite()).unwrap_or(0.0)
}

/// Entry payloads accepted by the five numeric resources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewMetricEntry {
    Water { ml: f64 },
    Sleep { hours: f64, quality: f64 },
    Meditation { minutes: f64 },
    Activity { minutes: f64 },
    Sunlight { minutes: f64 },
}

pub const QUICK_SLEEP_QUALITY: f64 = 100.0;

impl NewMetricEntry {
    pub fn quick_sleep(hours: f64) -> Self {
        Self::Sleep {
            hours,
            quality: QUICK_SLEEP_QUALITY,
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Water { .. } => MetricKind::Water,
            Self::Sleep { .. } => MetricKind::Sleep,
            Self::Meditation { .. } => MetricKind::Meditation,
            Self::Activity { .. } => MetricKind::Activity,
            Self::Sunlight { .. } => MetricKind::Sunlight,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        match *self {
            Self::Water { ml } => {
                require_finite("ml", ml)?;
                if ml <= 0.0 {
                    return Err(AppError::Validation("water amount must be greater than zero".to_string()));
                }
                Ok(())
            }
            Self::Sleep { hours, quality } => {
                require_finite("hours", hours)?;
                require_finite("quality", quality)
            }
            Self::Meditation { minutes } | Self::Activity { minutes } | Self::Sunlight { minutes } => {
                require_finite("minutes", minutes)
            }
        }
    }

    pub fn to_body(&self) -> Value {
        match *self {
            Self::Water { ml } => json!({ "ml": ml }),
            Self::Sleep { hours, quality } => json!({ "hours": hours, "quality": quality }),
            Self::Meditation { minutes } | Self::Activity { minutes } | Self::Sunlight { minutes } => {
                json!({ "minutes": minutes })
            }
        }
    }
}

fn require_finite(field: &str, value: f64) -> AppResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be a number", field)))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("task title is required".to_string()));
        }
        Ok(())
    }

    /// New tasks always start incomplete with priority zero, dated today
    /// unless a date was picked.
    pub fn to_body(&self) -> Value {
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        json!({
            "title": self.title,
            "description": self.description,
            "date": date.format("%Y-%m-%d").to_string(),
            "isComplete": false,
            "priority": 0,
        })
    }
}

/// Uniform CRUD client over one remote resource family.
#[derive(Clone)]
pub struct MetricGateway {
    kind: MetricKind,
    transport: Arc<dyn ApiTransport>,
}

impl MetricGateway {
    pub fn new(kind: MetricKind, transport: Arc<dyn ApiTransport>) -> Self {
        Self { kind, transport }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}/{}", self.kind.resource(), suffix)
    }

    pub async fn fetch_raw_today(&self) -> AppResult<RawMetricResponse> {
        let body = self.transport.get(&self.path("today")).await?;
        RawMetricResponse::decode(self.kind, body)
    }

    pub async fn fetch_today(&self) -> AppResult<NormalizedTodayValue> {
        Ok(self.fetch_raw_today().await?.normalize())
    }

    pub async fn fetch_week(&self) -> AppResult<WeekSummary> {
        if self.kind == MetricKind::Tasks {
            return Err(AppError::Validation("tasks have no weekly rollup".to_string()));
        }
        let body = self.transport.get(&self.path("week")).await?;
        decode_or_default(body)
    }

    pub async fn fetch_all_tasks(&self) -> AppResult<Vec<Task>> {
        if self.kind != MetricKind::Tasks {
            return Err(AppError::Validation(format!("{} is not a task resource", self.kind)));
        }
        let body = self.transport.get(self.kind.resource()).await?;
        decode_or_default(body)
    }

    /// `None` when the server accepted the entry but echoed no usable record.
    pub async fn create(&self, fields: Value) -> AppResult<Option<MetricEntry>> {
        let body = self.transport.post(self.kind.resource(), fields).await?;
        Ok(self.decode_entry(body))
    }

    pub async fn update(&self, id: &EntryId, patch: Value) -> AppResult<Option<MetricEntry>> {
        let body = self.transport.put(&self.path(&id.as_path_segment()), patch).await?;
        Ok(self.decode_entry(body))
    }

    pub async fn remove(&self, id: &EntryId) -> AppResult<()> {
        self.transport.delete(&self.path(&id.as_path_segment())).await
    }

    fn decode_entry(&self, body: Value) -> Option<MetricEntry> {
        if body.is_null() {
            return None;
        }
        match serde_json::from_value(body) {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(metric = %self.kind, error = %error, "accepted entry has no readable record");
                None
            }
        }
    }
}

/// One gateway per resource, sharing a transport.
#[derive(Clone)]
pub struct MetricGateways {
    pub water: MetricGateway,
    pub sleep: MetricGateway,
    pub meditation: MetricGateway,
    pub activity: MetricGateway,
    pub sunlight: MetricGateway,
    pub tasks: MetricGateway,
}

impl MetricGateways {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            water: MetricGateway::new(MetricKind::Water, transport.clone()),
            sleep: MetricGateway::new(MetricKind::Sleep, transport.clone()),
            meditation: MetricGateway::new(MetricKind::Meditation, transport.clone()),
            activity: MetricGateway::new(MetricKind::Activity, transport.clone()),
            sunlight: MetricGateway::new(MetricKind::Sunlight, transport.clone()),
            tasks: MetricGateway::new(MetricKind::Tasks, transport),
        }
    }

    pub fn get(&self, kind: MetricKind) -> &MetricGateway {
        match kind {
            MetricKind::Water => &self.water,
            MetricKind::Sleep => &self.sleep,
            MetricKind::Meditation => &self.meditation,
            MetricKind::Activity => &self.activity,
            MetricKind::Sunlight => &self.sunlight,
            MetricKind::Tasks => &self.tasks,
        }
    }
}
