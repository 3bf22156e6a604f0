//! Conversation controller for the guided creation workflow.
//!
//! A [`CreatorSession`] owns the transcript, the current workflow step, the
//! novel settings, and the consistency memory bank. Each user turn goes
//! through a fixed pipeline: append the user message, send the augmented
//! prompt, append the reply, scan it for a step marker, and (in the drafting
//! steps) refresh the memory bank from it.

use crate::assistant::{is_sentinel, ClientConfig, ConsistencyMemory, ModelClient};
use crate::message::{Message, Role};
use crate::settings::{Language, NovelSettings, SettingField};
use crate::steps::{detect_step, CreatorStep};
use thiserror::Error;

/// Errors that reject a session operation up front.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("input is empty")]
    EmptyInput,

    #[error("setting value is empty")]
    EmptySetting,
}

/// Configuration for a new session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Interface language for directives, notices, and the greeting.
    pub language: Language,
    /// Initial novel settings; defaults to the language's defaults.
    pub settings: Option<NovelSettings>,
    /// Endpoint credentials for the model client.
    pub client: ClientConfig,
    /// Fixed model, overriding the per-step choice.
    pub model: Option<String>,
    /// Disable the automatic memory refresh in the drafting steps.
    pub disable_auto_memory: bool,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_settings(mut self, settings: NovelSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.client.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client.base_url = base_url.into();
        self
    }

    /// Pin every turn to one model instead of the per-step choice.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_auto_memory(mut self, enabled: bool) -> Self {
        self.disable_auto_memory = !enabled;
        self
    }
}

/// Outcome of one completed chat turn.
#[derive(Debug, Clone)]
pub struct Turn {
    /// The model's reply text (possibly a sentinel).
    pub reply: String,
    /// Workflow step after marker detection.
    pub step: CreatorStep,
    /// Whether this turn moved the workflow.
    pub step_changed: bool,
    /// Whether a memory summarization pass ran for this turn.
    pub memory_refreshed: bool,
}

/// Conversation controller. One per novel-in-progress.
///
/// All mutation goes through `&mut self`, so a session can never have two
/// chat calls in flight.
pub struct CreatorSession {
    client: ModelClient,
    messages: Vec<Message>,
    step: CreatorStep,
    settings: NovelSettings,
    language: Language,
    memory: ConsistencyMemory,
    model_override: Option<String>,
    auto_memory: bool,
    draft: String,
}

impl CreatorSession {
    /// Create a session with the localized greeting already in the
    /// transcript, at the Configuration step.
    pub fn new(config: SessionConfig) -> Self {
        let language = config.language;
        let settings = config
            .settings
            .unwrap_or_else(|| NovelSettings::default_for(language));
        let greeting = Message::model(language.greeting()).at_step(CreatorStep::Configuration);

        Self {
            client: ModelClient::new(config.client),
            messages: vec![greeting],
            step: CreatorStep::Configuration,
            settings,
            language,
            memory: ConsistencyMemory::new(),
            model_override: config.model,
            auto_memory: !config.disable_auto_memory,
            draft: String::new(),
        }
    }

    // ========================================================================
    // Chat turns
    // ========================================================================

    /// Send one user turn through the workflow pipeline.
    ///
    /// Failures on the wire come back inside the [`Turn`] as sentinel reply
    /// text; the only error here is empty input. The step never moves on a
    /// sentinel reply.
    pub async fn send(&mut self, input: &str) -> Result<Turn, SessionError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        // History for the wire excludes the message being sent.
        let history = self.messages.clone();
        self.record_user(text);

        // Raw text plus the per-turn directive with step and settings.
        let directive = self.language.turn_directive(self.step, &self.settings);
        let augmented = format!("{text}{directive}");
        let model = self.model_for_turn().to_string();

        let pre_step = self.step;
        let reply = self
            .client
            .send_message(&augmented, &model, &history, Some(&self.memory))
            .await;

        let mut turn = self.apply_reply(reply);

        // Drafting output feeds the memory bank. Gated on the step the turn
        // ran in, not the one its marker moved to.
        if self.auto_memory
            && !is_sentinel(&turn.reply)
            && matches!(
                pre_step,
                CreatorStep::ChapterWriting | CreatorStep::ReviewAndPolish
            )
        {
            self.memory = self
                .client
                .summarize_for_memory(&turn.reply, &self.memory)
                .await;
            turn.memory_refreshed = true;
        }

        Ok(turn)
    }

    /// Send the staged draft as a user turn. The draft is cleared once sent;
    /// an empty draft is rejected and left in place.
    pub async fn send_draft(&mut self) -> Result<Turn, SessionError> {
        if self.draft.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let draft = std::mem::take(&mut self.draft);
        self.send(&draft).await
    }

    /// Nudge the workflow forward with the localized continue phrase. Leaves
    /// any staged draft untouched.
    pub async fn send_continue(&mut self) -> Result<Turn, SessionError> {
        let text = self.language.continue_text();
        self.send(text).await
    }

    // ========================================================================
    // Session operations
    // ========================================================================

    /// Change one novel setting and append a localized system notice.
    /// Empty values are rejected.
    pub fn update_setting(
        &mut self,
        field: SettingField,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptySetting);
        }

        self.settings.set(field, trimmed);
        let notice = self.language.setting_updated_notice(field, trimmed);
        self.messages.push(Message::system(notice).at_step(self.step));
        Ok(())
    }

    /// Replace the endpoint configuration and append a localized notice.
    /// Takes effect from the next call.
    pub fn update_config(&mut self, api_key: impl Into<String>, base_url: impl Into<String>) {
        self.client.update_config(api_key, base_url);
        let notice = self.language.config_updated_notice();
        self.messages.push(Message::system(notice).at_step(self.step));
    }

    /// Move the workflow marker directly. Appends nothing.
    pub fn jump_to_step(&mut self, step: CreatorStep) {
        self.step = step;
    }

    /// Switch the language used for subsequent directives and notices. The
    /// existing transcript keeps its text.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Run a manual memory summarization pass over `content`. Returns true
    /// when the memory bank changed.
    pub async fn refresh_memory(&mut self, content: &str) -> bool {
        let updated = self.client.summarize_for_memory(content, &self.memory).await;
        let changed = updated != self.memory;
        self.memory = updated;
        changed
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn step(&self) -> CreatorStep {
        self.step
    }

    pub fn memory(&self) -> &ConsistencyMemory {
        &self.memory
    }

    pub fn settings(&self) -> &NovelSettings {
        &self.settings
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Stage text for [`send_draft`](Self::send_draft).
    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// The most recent model reply, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Model)
            .map(|message| message.content.as_str())
    }

    /// The model client's most recent absorbed failure, for diagnostics.
    pub fn last_failure(&self) -> Option<&str> {
        self.client.last_failure()
    }

    // ========================================================================
    // Turn internals, shared with the scripted test harness
    // ========================================================================

    pub(crate) fn record_user(&mut self, text: &str) {
        self.messages.push(Message::user(text).at_step(self.step));
    }

    /// Append a reply and apply the step-marker transition. Failure sentinels
    /// never move the step, even when the upstream message mentions one.
    pub(crate) fn apply_reply(&mut self, reply: String) -> Turn {
        self.messages
            .push(Message::model(reply.as_str()).at_step(self.step));

        let detected = if is_sentinel(&reply) {
            None
        } else {
            detect_step(&reply, self.step)
        };
        if let Some(next) = detected {
            self.step = next;
        }

        Turn {
            reply,
            step: self.step,
            step_changed: detected.is_some(),
            memory_refreshed: false,
        }
    }

    fn model_for_turn(&self) -> &str {
        self.model_override
            .as_deref()
            .unwrap_or(self.step.preferred_model())
    }
}

impl Default for CreatorSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_seeds_greeting() {
        let session = CreatorSession::default();

        assert_eq!(session.step(), CreatorStep::Configuration);
        assert_eq!(session.messages().len(), 1);

        let greeting = &session.messages()[0];
        assert_eq!(greeting.role, Role::Model);
        assert!(greeting.content.contains("9-Step Creation Logic"));
        assert_eq!(greeting.step, Some(CreatorStep::Configuration));
    }

    #[test]
    fn test_chinese_session_seeds_chinese_greeting() {
        let session = CreatorSession::new(SessionConfig::new().with_language(Language::Zh));

        assert!(session.messages()[0].content.contains("9 步创作逻辑"));
        assert_eq!(session.settings().target_audience, "22-35岁女性");
    }

    #[tokio::test]
    async fn test_send_rejects_empty_input() {
        let mut session = CreatorSession::default();

        let result = session.send("   \n  ").await;
        assert!(matches!(result, Err(SessionError::EmptyInput)));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.step(), CreatorStep::Configuration);
    }

    #[tokio::test]
    async fn test_send_draft_rejects_empty_draft() {
        let mut session = CreatorSession::default();
        session.set_draft("   ");

        let result = session.send_draft().await;
        assert!(matches!(result, Err(SessionError::EmptyInput)));
        assert_eq!(session.draft(), "   ");
    }

    #[test]
    fn test_jump_to_step_appends_nothing() {
        let mut session = CreatorSession::default();
        session.jump_to_step(CreatorStep::CharacterDesign);

        assert_eq!(session.step(), CreatorStep::CharacterDesign);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_update_setting_appends_notice() {
        let mut session = CreatorSession::default();
        session
            .update_setting(SettingField::TotalWordCount, "800k")
            .unwrap();

        assert_eq!(session.settings().total_word_count, "800k");
        let notice = session.messages().last().unwrap();
        assert_eq!(notice.role, Role::System);
        assert_eq!(
            notice.content,
            "[System Update] Total Word Count changed to: 800k"
        );
    }

    #[test]
    fn test_update_setting_rejects_empty_value() {
        let mut session = CreatorSession::default();

        let result = session.update_setting(SettingField::TargetAudience, "  ");
        assert!(matches!(result, Err(SessionError::EmptySetting)));
        assert_eq!(session.settings().target_audience, "22-35F");
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_update_setting_localized_notice() {
        let mut session = CreatorSession::new(SessionConfig::new().with_language(Language::Zh));
        session
            .update_setting(SettingField::ChapterWordCount, "3000")
            .unwrap();

        let notice = session.messages().last().unwrap();
        assert_eq!(notice.content, "[系统更新] 单章字数 已修改为: 3000");
    }

    #[test]
    fn test_update_config_appends_notice() {
        let mut session = CreatorSession::default();
        session.update_config("sk-new", "https://relay.example.com");

        let notice = session.messages().last().unwrap();
        assert_eq!(notice.role, Role::System);
        assert_eq!(notice.content, "Configuration updated.");
    }

    #[test]
    fn test_apply_reply_moves_step_on_marker() {
        let mut session = CreatorSession::default();
        session.record_user("Configured. Let's begin.");

        let turn = session.apply_reply(
            "Great. \n\n--- \n**Current Phase**: [Step 2 - Core Settings]. Shall we proceed?"
                .to_string(),
        );

        assert!(turn.step_changed);
        assert_eq!(turn.step, CreatorStep::CoreSetting);
        assert_eq!(session.step(), CreatorStep::CoreSetting);
        assert_eq!(session.messages().len(), 3);
    }

    #[test]
    fn test_apply_reply_without_marker_keeps_step() {
        let mut session = CreatorSession::default();
        session.jump_to_step(CreatorStep::OutlinePerfection);

        let turn = session.apply_reply("Here are three plot holes I found.".to_string());

        assert!(!turn.step_changed);
        assert_eq!(session.step(), CreatorStep::OutlinePerfection);
    }

    #[test]
    fn test_sentinel_reply_keeps_step() {
        let mut session = CreatorSession::default();
        session.jump_to_step(CreatorStep::ChapterWriting);

        let turn = session.apply_reply("[API Error 500] internal".to_string());

        assert!(!turn.step_changed);
        assert_eq!(session.step(), CreatorStep::ChapterWriting);
        assert_eq!(session.last_reply(), Some("[API Error 500] internal"));
    }

    #[test]
    fn test_messages_tagged_with_current_step() {
        let mut session = CreatorSession::default();
        session.jump_to_step(CreatorStep::VolumePlanning);
        session.record_user("Plan volume one.");

        let last = session.messages().last().unwrap();
        assert_eq!(last.step, Some(CreatorStep::VolumePlanning));
    }

    #[test]
    fn test_last_reply_skips_system_notices() {
        let mut session = CreatorSession::default();
        session.record_user("hello");
        session.apply_reply("world".to_string());
        session.update_config("key", "https://relay.example.com");

        assert_eq!(session.last_reply(), Some("world"));
    }

    #[test]
    fn test_draft_staging() {
        let mut session = CreatorSession::default();
        assert!(session.draft().is_empty());

        session.set_draft("Chapter 1: rain over the harbor.");
        assert_eq!(session.draft(), "Chapter 1: rain over the harbor.");
    }
}
