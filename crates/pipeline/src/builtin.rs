//! Builtin Pipeline Backend
//!
//! Rule-based stand-ins for real model pipelines so the gateway runs end
//! to end without model weights. Unknown tasks and models fail the same
//! way a real backend would.

use crate::pipeline::{Pipeline, PipelineKey, PipelineLoader};
use crate::PipelineError;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Models the builtin backend resolves for classification tasks
const SENTIMENT_MODELS: &[&str] = &[
    "distilbert-base",
    "distilbert-base-uncased-finetuned-sst-2-english",
];

/// Models the builtin backend resolves for zero-shot classification
const ZERO_SHOT_MODELS: &[&str] = &["bart-large-mnli", "facebook/bart-large-mnli"];

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "love", "excellent", "happy", "wonderful", "best", "amazing",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "hate", "awful", "worst", "sad", "broken", "poor",
];

/// Loader for the builtin rule-based pipelines
pub struct BuiltinLoader;

impl BuiltinLoader {
    /// Create the builtin loader
    pub fn new() -> Self {
        Self
    }
}

impl Default for BuiltinLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLoader for BuiltinLoader {
    fn load(&self, key: &PipelineKey) -> Result<Box<dyn Pipeline>, PipelineError> {
        debug!("Resolving builtin pipeline for {}", key);
        match key.task() {
            "sentiment-analysis" | "text-classification" => {
                if !SENTIMENT_MODELS.contains(&key.model()) {
                    return Err(PipelineError::ModelNotFound {
                        task: key.task().to_string(),
                        model: key.model().to_string(),
                    });
                }
                Ok(Box::new(SentimentPipeline))
            }
            "zero-shot-classification" => {
                if !ZERO_SHOT_MODELS.contains(&key.model()) {
                    return Err(PipelineError::ModelNotFound {
                        task: key.task().to_string(),
                        model: key.model().to_string(),
                    });
                }
                Ok(Box::new(ZeroShotPipeline))
            }
            other => Err(PipelineError::UnsupportedTask(other.to_string())),
        }
    }
}

/// Reject option keys the pipeline does not understand
fn check_options(options: &Map<String, Value>, allowed: &[&str]) -> Result<(), PipelineError> {
    for key in options.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(PipelineError::InvalidInput(format!(
                "unknown option: {}",
                key
            )));
        }
    }
    Ok(())
}

/// Read an optional boolean option
fn bool_option(
    options: &Map<String, Value>,
    name: &str,
) -> Result<bool, PipelineError> {
    match options.get(name) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(PipelineError::InvalidInput(format!(
            "{} must be a boolean, got {}",
            name,
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lexicon-based sentiment classifier
struct SentimentPipeline;

impl SentimentPipeline {
    fn classify(text: &str, all_scores: bool) -> Value {
        let tokens = tokenize(text);
        let pos = POSITIVE_WORDS
            .iter()
            .filter(|w| tokens.contains(**w))
            .count() as f64;
        let neg = NEGATIVE_WORDS
            .iter()
            .filter(|w| tokens.contains(**w))
            .count() as f64;

        let score = (0.5 + 0.1 * (pos - neg).abs()).clamp(0.5, 0.99);
        let (label, other) = if pos >= neg {
            ("POSITIVE", "NEGATIVE")
        } else {
            ("NEGATIVE", "POSITIVE")
        };

        if all_scores {
            json!([
                { "label": label, "score": score },
                { "label": other, "score": 1.0 - score },
            ])
        } else {
            json!({ "label": label, "score": score })
        }
    }
}

impl Pipeline for SentimentPipeline {
    fn run(&self, inputs: &Value, options: &Map<String, Value>) -> Result<Value, PipelineError> {
        check_options(options, &["return_all_scores"])?;
        let all_scores = bool_option(options, "return_all_scores")?;

        match inputs {
            Value::String(text) => Ok(json!([Self::classify(text, all_scores)])),
            Value::Array(items) => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    let text = item.as_str().ok_or_else(|| {
                        PipelineError::InvalidInput(format!(
                            "batch inputs must be strings, got {}",
                            json_type(item)
                        ))
                    })?;
                    results.push(Self::classify(text, all_scores));
                }
                Ok(Value::Array(results))
            }
            other => Err(PipelineError::InvalidInput(format!(
                "expected a string or an array of strings, got {}",
                json_type(other)
            ))),
        }
    }
}

/// Token-overlap zero-shot classifier
struct ZeroShotPipeline;

impl Pipeline for ZeroShotPipeline {
    fn run(&self, inputs: &Value, options: &Map<String, Value>) -> Result<Value, PipelineError> {
        check_options(options, &["candidate_labels", "multi_label"])?;

        let labels: Vec<String> = match options.get("candidate_labels") {
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        PipelineError::InvalidInput(format!(
                            "candidate_labels must be strings, got {}",
                            json_type(v)
                        ))
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(PipelineError::InvalidInput(
                    "candidate_labels must be a non-empty array".to_string(),
                ))
            }
            None => {
                return Err(PipelineError::InvalidInput(
                    "zero-shot-classification requires the candidate_labels option".to_string(),
                ))
            }
        };
        let multi_label = bool_option(options, "multi_label")?;

        let text = inputs.as_str().ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "expected a string, got {}",
                json_type(inputs)
            ))
        })?;

        let tokens = tokenize(text);
        let weights: Vec<f64> = labels
            .iter()
            .map(|label| {
                let overlap = tokenize(label)
                    .iter()
                    .filter(|t| tokens.contains(*t))
                    .count() as f64;
                1.0 + overlap
            })
            .collect();

        let scores: Vec<f64> = if multi_label {
            weights.iter().map(|w| (w / (1.0 + w)).clamp(0.01, 0.99)).collect()
        } else {
            let total: f64 = weights.iter().sum();
            weights.iter().map(|w| w / total).collect()
        };

        let mut ranked: Vec<(String, f64)> = labels.into_iter().zip(scores).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let (labels, scores): (Vec<String>, Vec<f64>) = ranked.into_iter().unzip();

        Ok(json!({ "sequence": text, "labels": labels, "scores": scores }))
    }
}
