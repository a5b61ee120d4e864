//! Evaluation results written by the runner.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ResultError;

/// Status values that mean the evaluation finished successfully.
const SUCCESS_STATUSES: [&str; 7] = [
    "completed",
    "complete",
    "success",
    "succeeded",
    "passed",
    "pass",
    "ok",
];

fn unknown_status() -> String {
    "unknown".to_string()
}

/// Contents of `score.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Outcome reported by the green agent.
    #[serde(default = "unknown_status")]
    pub status: String,
    /// Numeric score, if the benchmark produces one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Free-text explanation of the score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Benchmark-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Any other fields the runner wrote.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EvaluationResult {
    /// Loads a result file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ResultError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ResultError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parses result JSON.
    pub fn from_json_str(content: &str) -> Result<Self, ResultError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Returns true if the status reports a successful run.
    pub fn is_success(&self) -> bool {
        let status = self.status.trim().to_ascii_lowercase();
        SUCCESS_STATUSES.contains(&status.as_str())
    }

    /// Checks the run succeeded and, when given, that the score meets `min_score`.
    pub fn check(&self, min_score: Option<f64>) -> Result<(), ResultError> {
        if !self.is_success() {
            return Err(ResultError::Unsuccessful(self.status.clone()));
        }
        if let Some(min) = min_score {
            if !min.is_finite() {
                return Err(ResultError::InvalidThreshold(min));
            }
            let score = self.score.ok_or(ResultError::MissingScore(min))?;
            if score < min {
                return Err(ResultError::ScoreBelowThreshold { score, min });
            }
        }
        Ok(())
    }

    /// Renders a Markdown summary for a result submission.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Evaluation Result\n\n");
        out.push_str("| Field | Value |\n");
        out.push_str("|-------|-------|\n");
        out.push_str(&format!("| Status | {} |\n", self.status));
        match self.score {
            Some(score) => out.push_str(&format!("| Score | {} |\n", score)),
            None => out.push_str("| Score | n/a |\n"),
        }

        if let Some(ref reasoning) = self.reasoning {
            out.push_str("\n### Reasoning\n\n");
            out.push_str(reasoning.trim());
            out.push('\n');
        }

        if let Some(ref details) = self.details {
            let pretty =
                serde_json::to_string_pretty(details).unwrap_or_else(|_| details.to_string());
            out.push_str("\n### Details\n\n```json\n");
            out.push_str(&pretty);
            out.push_str("\n```\n");
        }

        out
    }
}
