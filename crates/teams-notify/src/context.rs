use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

/// Theme color used when no status is known or the status is unrecognized.
pub const NEUTRAL_COLOR: &str = "0076D7";

const SUCCESS_COLOR: &str = "2EA44F";
const FAILURE_COLOR: &str = "D73A49";
const CANCELLED_COLOR: &str = "8B949E";

const UNKNOWN_STATUS: &str = "unknown";

pub type Outputs = IndexMap<String, String>;

/// Result of a job, step or upstream job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    Cancelled,
    /// Any other value (`skipped`, `neutral`, ...), kept verbatim.
    Custom(String),
}

impl Status {
    /// Rank used to pick the overall card color; higher is more severe.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Custom(_) => 1,
            Self::Cancelled => 2,
            Self::Failure => 3,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Success => SUCCESS_COLOR,
            Self::Failure => FAILURE_COLOR,
            Self::Cancelled => CANCELLED_COLOR,
            Self::Custom(_) => NEUTRAL_COLOR,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Custom(s) => s,
        }
    }

    fn unknown() -> Self {
        Self::Custom(UNKNOWN_STATUS.to_string())
    }
}

impl From<&str> for Status {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "failure" => Self::Failure,
            "cancelled" => Self::Cancelled,
            "" => Self::unknown(),
            _ => Self::Custom(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub status: Status,
    pub outputs: Outputs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Need {
    pub result: Status,
    pub outputs: Outputs,
}

/// Normalized execution state of a workflow run.
///
/// Every field is independently optional; an all-empty context is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowContext {
    pub job: Option<Job>,
    pub steps: Vec<Step>,
    pub needs: IndexMap<String, Need>,
    pub title: Option<String>,
    pub mention_emails: Option<String>,
}

impl WorkflowContext {
    /// Build a context from parsed `job`, `steps` and `needs` JSON.
    ///
    /// `job_name` is used as the job id when the job context carries none
    /// (GitHub's `job` context never does).
    pub fn from_values(job: &Value, steps: &Value, needs: &Value, job_name: Option<&str>) -> Self {
        Self {
            job: job_from_value(job, job_name),
            steps: steps_from_value(steps),
            needs: needs_from_value(needs),
            title: None,
            mention_emails: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_mention_emails(mut self, emails: Option<String>) -> Self {
        self.mention_emails = emails;
        self
    }

    /// Every status present in the context: job, then steps, then needs.
    pub fn statuses(&self) -> impl Iterator<Item = &Status> {
        self.job
            .iter()
            .map(|j| &j.status)
            .chain(self.steps.iter().map(|s| &s.status))
            .chain(self.needs.values().map(|n| &n.result))
    }
}

/// Parse a raw context input, absorbing absent or malformed JSON.
pub fn parse_context(name: &str, raw: Option<&str>) -> Value {
    let raw = match raw.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => {
            warn!("Missing {name} parameter will result in reduced functionality.");
            return Value::Object(Map::new());
        }
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => {
            debug!(context = name, shape = shape_of(&value), "Parsed context");
            value
        }
        Err(e) => {
            error!(
                context = name,
                line = e.line(),
                column = e.column(),
                length = raw.len(),
                error = %e,
                "Failed to parse context, continuing without it"
            );
            Value::Object(Map::new())
        }
    }
}

fn shape_of(value: &Value) -> String {
    match value {
        Value::Object(map) => format!("{:?}", map.keys().collect::<Vec<_>>()),
        Value::Array(items) => format!("[{} item(s)]", items.len()),
        other => other.to_string(),
    }
}

fn job_from_value(value: &Value, job_name: Option<&str>) -> Option<Job> {
    let obj = value.as_object()?;
    let id = obj.get("id").and_then(scalar_text);
    let status = obj.get("status").and_then(scalar_text);
    if id.is_none() && status.is_none() {
        return None;
    }

    Some(Job {
        id: id
            .or_else(|| job_name.map(str::to_owned))
            .unwrap_or_else(|| "job".to_string()),
        status: status.map_or_else(Status::unknown, |s| Status::from(s.as_str())),
    })
}

fn steps_from_value(value: &Value) -> Vec<Step> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let obj = item.as_object()?;
                let name = obj
                    .get("name")
                    .or_else(|| obj.get("id"))
                    .and_then(scalar_text)
                    .unwrap_or_else(|| format!("step {}", i + 1));
                Some(step_from_object(name, obj))
            })
            .collect(),
        // Native GitHub shape: { "<step id>": { "outcome", "conclusion", "outputs" } }
        Value::Object(map) => map
            .iter()
            .filter_map(|(id, item)| Some(step_from_object(id.clone(), item.as_object()?)))
            .collect(),
        _ => Vec::new(),
    }
}

fn step_from_object(name: String, obj: &Map<String, Value>) -> Step {
    let status = ["status", "conclusion", "outcome"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(scalar_text));
    Step {
        name,
        status: status.map_or_else(Status::unknown, |s| Status::from(s.as_str())),
        outputs: outputs_from(obj.get("outputs")),
    }
}

fn needs_from_value(value: &Value) -> IndexMap<String, Need> {
    let Some(map) = value.as_object() else {
        return IndexMap::new();
    };
    map.iter()
        .filter_map(|(id, item)| {
            let obj = item.as_object()?;
            let result = obj.get("result").and_then(scalar_text);
            Some((
                id.clone(),
                Need {
                    result: result.map_or_else(Status::unknown, |s| Status::from(s.as_str())),
                    outputs: outputs_from(obj.get("outputs")),
                },
            ))
        })
        .collect()
}

fn outputs_from(value: Option<&Value>) -> Outputs {
    let Some(Value::Object(map)) = value else {
        return Outputs::new();
    };
    map.iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k.clone(), s.clone())),
            other => Some((k.clone(), other.to_string())),
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
