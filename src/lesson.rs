//! Lesson data model and the completeness predicate.
//!
//! A [`Lesson`] is the acceptance target of the recovery pipeline. Every
//! field tolerates absence (`#[serde(default)]`) because candidate objects
//! flow through the pipeline in a possibly-incomplete state; the
//! [`Lesson::is_complete`] predicate decides whether a completion round is
//! still needed before the object is handed back to the caller.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::video::VideoRef;

/// The five exercise category names, in schema order.
pub const EXERCISE_CATEGORIES: [&str; 5] = [
    "recognition",
    "gap_fill",
    "transformation",
    "error_correction",
    "free_production",
];

/// A structured grammar lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Lesson {
    pub title: String,

    /// CEFR level string, e.g. `"B1/Pre-Intermediate"`.
    pub level: String,

    pub objectives: Vec<String>,
    pub prerequisites: Vec<String>,
    pub grammar: Vec<GrammarSection>,
    pub examples: Vec<ExampleGroup>,
    pub exercises: Exercises,

    /// Epoch milliseconds, stamped when generation finishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,

    /// True when this object was assembled by fragment reconstruction
    /// rather than a clean parse. Lets callers warn the user that content
    /// may be degraded or placeholder-filled.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reconstructed: bool,

    /// Which provider/model actually produced this lesson.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,

    /// Best-effort companion video, if the lookup helper found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoRef>,
}

/// One grammar topic within a lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarSection {
    pub title: String,
    pub summary: String,
    pub points: Vec<String>,
    pub patterns: Vec<String>,
    pub notes: Vec<String>,
    pub time_markers: Vec<String>,
    pub usage_contexts: Vec<String>,
    pub common_mistakes: Vec<String>,
}

/// A titled group of example sentences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExampleGroup {
    pub title: String,
    pub items: Vec<ExampleItem>,
}

/// A single example sentence with translation and note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExampleItem {
    pub en: String,
    pub vi: String,
    pub explain: String,
}

/// The five graded exercise categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Exercises {
    pub recognition: Vec<Recognition>,
    pub gap_fill: Vec<GapFill>,
    pub transformation: Vec<Transformation>,
    pub error_correction: Vec<ErrorCorrection>,
    pub free_production: Vec<FreeProduction>,
}

/// Multiple-choice recognition question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Recognition {
    pub id: String,
    pub prompt: String,
    pub choices: Vec<String>,
    /// Index into `choices`. Models sometimes quote the index, so both
    /// `0` and `"0"` are accepted.
    #[serde(deserialize_with = "index_lenient")]
    pub answer: u32,
    pub explain: String,
}

/// Accept a choice index given as a number or as a quoted number.
/// Anything else falls back to `0` rather than rejecting the question.
fn index_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0) as u32,
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Fill-in-the-blank with hint options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFill {
    pub id: String,
    pub sentence: String,
    pub blank: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explain: String,
}

/// Sentence transformation task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Transformation {
    pub id: String,
    pub source: String,
    pub instruction: String,
    pub answer: String,
    pub explain: String,
}

/// Spot-and-fix-the-error task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorCorrection {
    pub id: String,
    pub sentence: String,
    pub error_hint: String,
    pub answer: String,
    pub explain: String,
}

/// Open-ended production task with a sample answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeProduction {
    pub id: String,
    pub task: String,
    pub sample: String,
}

/// Which provider/model answered, and how long it took.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Provenance {
    pub provider: String,
    pub model: String,
    pub elapsed_ms: u64,
}

/// Result of grading a learner-written sentence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeResult {
    pub ok: bool,
    pub feedback: String,
    pub corrections: Vec<String>,
}

impl Lesson {
    /// The completeness predicate.
    ///
    /// True iff `title` and `level` are non-empty, `objectives`, `grammar`
    /// and `examples` each have at least one entry, and at least one
    /// exercise category is non-empty. Structural only -- says nothing about
    /// pedagogical quality.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.level.trim().is_empty()
            && !self.objectives.is_empty()
            && !self.grammar.is_empty()
            && !self.examples.is_empty()
            && self.exercises.has_any()
    }

    /// Lenient conversion from an already-parsed JSON object.
    ///
    /// The strict serde path rejects a whole lesson over one wrongly
    /// typed leaf. This path degrades instead: fields of the wrong shape
    /// fall back to their defaults and list items that do not fit are
    /// dropped, leaving [`Lesson::is_complete`] to decide whether a
    /// completion round has to refill them. Returns `None` only when the
    /// value is not an object at all.
    pub fn from_object(value: &Value) -> Option<Lesson> {
        if !value.is_object() {
            return None;
        }
        Some(Lesson {
            title: string_field(value, "title"),
            level: string_field(value, "level"),
            objectives: string_list(value, "objectives"),
            prerequisites: string_list(value, "prerequisites"),
            grammar: item_list(value, "grammar"),
            examples: item_list(value, "examples"),
            exercises: Exercises::normalize(value).unwrap_or_default(),
            created_at: value.get("created_at").and_then(Value::as_u64),
            reconstructed: value
                .get("reconstructed")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            provenance: None,
            video: None,
        })
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Exercises {
    /// True if at least one category has at least one item.
    pub fn has_any(&self) -> bool {
        !self.recognition.is_empty()
            || !self.gap_fill.is_empty()
            || !self.transformation.is_empty()
            || !self.error_correction.is_empty()
            || !self.free_production.is_empty()
    }

    /// Normalize a recovered value into an `Exercises` block.
    ///
    /// Accepts either a bare exercises object or one nested under an
    /// `"exercises"` key (models return both shapes). Non-array categories
    /// and items that fail to deserialize default to empty -- never an
    /// error. Returns `None` if the value is not an object at all.
    pub fn normalize(value: &Value) -> Option<Exercises> {
        let obj = match value.get("exercises") {
            Some(inner) if inner.is_object() => inner,
            _ => value,
        };
        if !obj.is_object() {
            return None;
        }
        Some(Exercises {
            recognition: item_list(obj, "recognition"),
            gap_fill: item_list(obj, "gap_fill"),
            transformation: item_list(obj, "transformation"),
            error_correction: item_list(obj, "error_correction"),
            free_production: item_list(obj, "free_production"),
        })
    }

    /// An all-empty block, the reconstructor's default.
    pub fn empty() -> Exercises {
        Exercises::default()
    }
}

/// Deserialize one array field, dropping items that don't fit.
fn item_list<T: serde::de::DeserializeOwned>(obj: &Value, key: &str) -> Vec<T> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
