//! Consistency memory bank.
//!
//! A compact rolling summary of established canon (plot milestones, character
//! states, world rules) that gets re-injected into every prompt so the model
//! stays consistent across a long project. The bank is replaced wholesale
//! after each summarization round; the merge validates each field
//! independently, so a malformed summarization response never corrupts it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Established canon carried between turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsistencyMemory {
    /// Plot milestones, in story order.
    pub plot_points: Vec<String>,
    /// Free-text summary of where every character stands.
    pub character_states: String,
    /// Rules the world has committed to.
    pub world_rules: Vec<String>,
}

impl ConsistencyMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field carries anything.
    pub fn is_empty(&self) -> bool {
        self.plot_points.is_empty()
            && self.character_states.is_empty()
            && self.world_rules.is_empty()
    }

    /// Prepend the consistency reference block to an outgoing prompt.
    ///
    /// Empty memory returns the prompt unchanged; any non-empty field brings
    /// the whole block in.
    pub fn augment_prompt(&self, prompt: &str) -> String {
        if self.is_empty() {
            return prompt.to_string();
        }

        format!(
            "[CONSISTENCY REFERENCE]\n- PLOT: {}\n- CHARACTERS: {}\n- WORLD RULES: {}\n---\n{}",
            self.plot_points.join(" | "),
            self.character_states,
            self.world_rules.join(" | "),
            prompt
        )
    }

    /// Merge a summarization payload, field by field.
    ///
    /// Each field is validated independently: `plotPoints` and `worldRules`
    /// must be arrays of strings, `characterStates` must be a string. A field
    /// that is missing or has the wrong shape keeps its previous value; the
    /// other fields still update.
    pub fn merged_with(&self, update: &Value) -> ConsistencyMemory {
        ConsistencyMemory {
            plot_points: string_list(update.get("plotPoints"))
                .unwrap_or_else(|| self.plot_points.clone()),
            character_states: update
                .get("characterStates")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| self.character_states.clone()),
            world_rules: string_list(update.get("worldRules"))
                .unwrap_or_else(|| self.world_rules.clone()),
        }
    }
}

/// A JSON array validates as a string list only if every element is a string.
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Extract JSON from a response that might have markdown code blocks.
pub(crate) fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}
