//! Testing utilities for the creation workflow.
//!
//! This module provides tools for integration testing:
//! - scripted replies that run the real turn pipeline without API calls
//! - `TestHarness` for multi-turn workflow scenarios
//! - Assertion helpers for verifying session state

use crate::session::{CreatorSession, SessionConfig, Turn};
use crate::settings::Language;
use crate::steps::CreatorStep;
use std::collections::VecDeque;

/// Test harness for running workflow scenarios.
///
/// Replies are scripted instead of fetched, but everything else is the real
/// session pipeline: transcript append, step-marker detection, step tagging.
pub struct TestHarness {
    /// The session under test.
    pub session: CreatorSession,
    /// Scripted replies, consumed in order.
    replies: VecDeque<String>,
}

impl TestHarness {
    /// Create a harness around a fresh English session.
    pub fn new() -> Self {
        Self {
            session: CreatorSession::new(SessionConfig::new()),
            replies: VecDeque::new(),
        }
    }

    /// Create a harness with a specific interface language.
    pub fn with_language(language: Language) -> Self {
        Self {
            session: CreatorSession::new(SessionConfig::new().with_language(language)),
            replies: VecDeque::new(),
        }
    }

    /// Queue a scripted model reply.
    pub fn expect_reply(&mut self, text: impl Into<String>) -> &mut Self {
        self.replies.push_back(text.into());
        self
    }

    /// Send user input and get the resulting turn.
    ///
    /// The reply comes from the script queue; turns past the end of the
    /// script get a fixed placeholder.
    pub fn input(&mut self, text: &str) -> Turn {
        self.session.record_user(text);

        let reply = self
            .replies
            .pop_front()
            .unwrap_or_else(|| "The assistant has no more scripted replies.".to_string());

        self.session.apply_reply(reply)
    }

    /// Current workflow step.
    pub fn step(&self) -> CreatorStep {
        self.session.step()
    }

    /// Number of messages in the transcript, greeting included.
    pub fn transcript_len(&self) -> usize {
        self.session.messages().len()
    }

    /// The most recent model reply, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.session.last_reply()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the session is at the expected workflow step.
#[track_caller]
pub fn assert_step(harness: &TestHarness, step: CreatorStep) {
    assert_eq!(
        harness.step(),
        step,
        "Expected workflow at {step}, got {}",
        harness.step()
    );
}

/// Assert the most recent model reply contains a fragment.
#[track_caller]
pub fn assert_reply_contains(harness: &TestHarness, fragment: &str) {
    let reply = harness.last_reply().unwrap_or_default();
    assert!(
        reply.contains(fragment),
        "Expected last reply to contain '{fragment}', got: {reply}"
    );
}

/// Assert the transcript has the expected number of messages.
#[track_caller]
pub fn assert_transcript_len(harness: &TestHarness, expected: usize) {
    assert_eq!(
        harness.transcript_len(),
        expected,
        "Expected {expected} transcript messages, got {}",
        harness.transcript_len()
    );
}
