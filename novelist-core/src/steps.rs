//! The 9-step novel-creation workflow.
//!
//! Steps advance when the model's reply carries a "Step N" marker line (the
//! system instruction tells it to end every reply with one). Detection is a
//! pure function over the reply text; nothing else moves the step
//! automatically.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEEP_MODEL: &str = "gemini-2.5-pro";

lazy_static! {
    static ref STEP_MARKER: Regex = Regex::new(r"(?i)step\s+(\d+)").expect("valid step pattern");
}

/// One stage of the guided creation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CreatorStep {
    Configuration = 1,
    CoreSetting = 2,
    ArchitectureAnalysis = 3,
    OutlinePerfection = 4,
    CharacterDesign = 5,
    DetailedOutline = 6,
    VolumePlanning = 7,
    ChapterWriting = 8,
    ReviewAndPolish = 9,
}

impl CreatorStep {
    /// All steps in workflow order.
    pub fn all() -> [CreatorStep; 9] {
        [
            CreatorStep::Configuration,
            CreatorStep::CoreSetting,
            CreatorStep::ArchitectureAnalysis,
            CreatorStep::OutlinePerfection,
            CreatorStep::CharacterDesign,
            CreatorStep::DetailedOutline,
            CreatorStep::VolumePlanning,
            CreatorStep::ChapterWriting,
            CreatorStep::ReviewAndPolish,
        ]
    }

    /// The step's position in the workflow, 1 through 9.
    pub fn number(&self) -> u32 {
        *self as u32
    }

    /// Look up a step by its 1-based number.
    pub fn from_number(n: u32) -> Option<CreatorStep> {
        Self::all().into_iter().find(|step| step.number() == n)
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            CreatorStep::Configuration => "Configuration & Mode",
            CreatorStep::CoreSetting => "Core Settings",
            CreatorStep::ArchitectureAnalysis => "Architecture Analysis",
            CreatorStep::OutlinePerfection => "Outline Perfection",
            CreatorStep::CharacterDesign => "Character Design",
            CreatorStep::DetailedOutline => "Detailed Expansion",
            CreatorStep::VolumePlanning => "Volume Planning",
            CreatorStep::ChapterWriting => "Chapter Writing",
            CreatorStep::ReviewAndPolish => "Review & Polish",
        }
    }

    /// Short description of what happens in this step.
    pub fn detail(&self) -> &'static str {
        match self {
            CreatorStep::Configuration => "Verify AI Config & DeepThinking Mode",
            CreatorStep::CoreSetting => "Genre, Audience, Core Hook",
            CreatorStep::ArchitectureAnalysis => "Selling Points, Logic, Protagonist Goals",
            CreatorStep::OutlinePerfection => "Logic Check, Consistency, Plot Holes",
            CreatorStep::CharacterDesign => "6-8 Characters (Bio, Motivation, Flaws)",
            CreatorStep::DetailedOutline => "Word Structure, Pacing",
            CreatorStep::VolumePlanning => "Vol 1 Goals, Titles, Plot Drivers",
            CreatorStep::ChapterWriting => "Drafting",
            CreatorStep::ReviewAndPolish => "Quality Assurance & Editing",
        }
    }

    /// Model used for turns in this step. The drafting steps get the deeper
    /// model; the planning steps use the fast one.
    pub fn preferred_model(&self) -> &'static str {
        if self.number() >= 8 {
            DEEP_MODEL
        } else {
            DEFAULT_MODEL
        }
    }
}

impl fmt::Display for CreatorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} - {}", self.number(), self.name())
    }
}

/// Find a workflow transition in a model reply.
///
/// Matches "Step N" case-insensitively anywhere in the text (first match
/// wins) and returns the new step only when N is in range and differs from
/// `current`. Out-of-range markers and markerless text change nothing.
pub fn detect_step(response_text: &str, current: CreatorStep) -> Option<CreatorStep> {
    let captures = STEP_MARKER.captures(response_text)?;
    let n: u32 = captures.get(1)?.as_str().parse().ok()?;

    match CreatorStep::from_number(n) {
        Some(step) if step != current => Some(step),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_numbers_roundtrip() {
        for step in CreatorStep::all() {
            assert_eq!(CreatorStep::from_number(step.number()), Some(step));
        }
        assert_eq!(CreatorStep::from_number(0), None);
        assert_eq!(CreatorStep::from_number(10), None);
    }

    #[test]
    fn test_step_display() {
        assert_eq!(
            CreatorStep::CharacterDesign.to_string(),
            "Step 5 - Character Design"
        );
    }

    #[test]
    fn test_preferred_model_split() {
        assert_eq!(CreatorStep::Configuration.preferred_model(), "gemini-2.5-flash");
        assert_eq!(CreatorStep::VolumePlanning.preferred_model(), "gemini-2.5-flash");
        assert_eq!(CreatorStep::ChapterWriting.preferred_model(), "gemini-2.5-pro");
        assert_eq!(CreatorStep::ReviewAndPolish.preferred_model(), "gemini-2.5-pro");
    }

    #[test]
    fn test_detect_step_advances() {
        let text = "Great, moving on.\n\n---\n**Current Phase**: [Step 5 - Character Design]. Shall we proceed?";
        assert_eq!(
            detect_step(text, CreatorStep::OutlinePerfection),
            Some(CreatorStep::CharacterDesign)
        );
    }

    #[test]
    fn test_detect_step_anywhere_in_text() {
        assert_eq!(
            detect_step("We are now in step 5 of the process", CreatorStep::Configuration),
            Some(CreatorStep::CharacterDesign)
        );
    }

    #[test]
    fn test_detect_step_same_step_is_noop() {
        assert_eq!(
            detect_step("Still on Step 5 here.", CreatorStep::CharacterDesign),
            None
        );
    }

    #[test]
    fn test_detect_step_out_of_range() {
        assert_eq!(detect_step("Step 10 next!", CreatorStep::Configuration), None);
        assert_eq!(detect_step("Step 0 reset", CreatorStep::CharacterDesign), None);
        assert_eq!(
            detect_step("Step 99999999999999999999", CreatorStep::Configuration),
            None
        );
    }

    #[test]
    fn test_detect_step_backward_and_skip_allowed() {
        assert_eq!(
            detect_step("Back to Step 2 for a rework.", CreatorStep::ChapterWriting),
            Some(CreatorStep::CoreSetting)
        );
        assert_eq!(
            detect_step("Auto-classifying to Step 4.", CreatorStep::Configuration),
            Some(CreatorStep::OutlinePerfection)
        );
    }

    #[test]
    fn test_detect_step_first_match_wins() {
        assert_eq!(
            detect_step("Step 3 now, Step 7 later.", CreatorStep::Configuration),
            Some(CreatorStep::ArchitectureAnalysis)
        );
    }

    #[test]
    fn test_detect_step_no_marker() {
        assert_eq!(detect_step("Just prose, no marker.", CreatorStep::Configuration), None);
        assert_eq!(detect_step("", CreatorStep::Configuration), None);
    }
}
