//! Novel settings and language selection.
//!
//! Settings are free-text strings the user can edit at any time; they are
//! interpolated into every outgoing prompt so the model respects the target
//! audience and word counts. The language picks the per-turn directive, the
//! localized notices, and the defaults.

use crate::steps::CreatorStep;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User-tunable parameters for the novel being written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovelSettings {
    pub target_audience: String,
    pub total_word_count: String,
    pub chapter_word_count: String,
}

impl NovelSettings {
    /// Language-appropriate defaults.
    pub fn default_for(language: Language) -> Self {
        match language {
            Language::En => Self {
                target_audience: "22-35F".to_string(),
                total_word_count: "500k".to_string(),
                chapter_word_count: "2300".to_string(),
            },
            Language::Zh => Self {
                target_audience: "22-35岁女性".to_string(),
                total_word_count: "50万".to_string(),
                chapter_word_count: "2300".to_string(),
            },
        }
    }

    /// The structured block injected into every turn so the model keeps the
    /// configured parameters in view.
    pub fn context_block(&self) -> String {
        format!(
            "[System Config: Target Audience: {}, Total Words: {}, Chapter Words: {}]",
            self.target_audience, self.total_word_count, self.chapter_word_count
        )
    }

    pub fn get(&self, field: SettingField) -> &str {
        match field {
            SettingField::TargetAudience => &self.target_audience,
            SettingField::TotalWordCount => &self.total_word_count,
            SettingField::ChapterWordCount => &self.chapter_word_count,
        }
    }

    pub fn set(&mut self, field: SettingField, value: impl Into<String>) {
        let value = value.into();
        match field {
            SettingField::TargetAudience => self.target_audience = value,
            SettingField::TotalWordCount => self.total_word_count = value,
            SettingField::ChapterWordCount => self.chapter_word_count = value,
        }
    }
}

impl Default for NovelSettings {
    fn default() -> Self {
        Self::default_for(Language::En)
    }
}

/// One editable field of [`NovelSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingField {
    TargetAudience,
    TotalWordCount,
    ChapterWordCount,
}

impl SettingField {
    /// Localized label used in system notices.
    pub fn label(&self, language: Language) -> &'static str {
        match (self, language) {
            (SettingField::TargetAudience, Language::En) => "Target Audience",
            (SettingField::TotalWordCount, Language::En) => "Total Word Count",
            (SettingField::ChapterWordCount, Language::En) => "Chapter Word Count",
            (SettingField::TargetAudience, Language::Zh) => "目标受众",
            (SettingField::TotalWordCount, Language::Zh) => "总字数",
            (SettingField::ChapterWordCount, Language::Zh) => "单章字数",
        }
    }
}

/// Conversation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// The greeting that seeds a fresh transcript.
    pub fn greeting(&self) -> &'static str {
        match self {
            Language::En => include_str!("assistant/prompts/greeting_en.txt"),
            Language::Zh => include_str!("assistant/prompts/greeting_zh.txt"),
        }
    }

    /// Text sent by the "continue" quick trigger.
    pub fn continue_text(&self) -> &'static str {
        match self {
            Language::En => "Start",
            Language::Zh => "开始",
        }
    }

    /// The per-turn system directive appended to the user's text. Carries the
    /// current step and the settings block; the Chinese variant additionally
    /// pins the reply language.
    pub fn turn_directive(&self, step: CreatorStep, settings: &NovelSettings) -> String {
        match self {
            Language::En => format!(
                "\n\n[System: Current Step {}. {}]",
                step.number(),
                settings.context_block()
            ),
            Language::Zh => format!(
                "\n\n[System: 当前阶段 {}。请注意：必须严格全中文回复，禁止包含英文（除非是必要的代码或不可翻译的术语）。{}]",
                step.number(),
                settings.context_block()
            ),
        }
    }

    /// Notice appended after a configuration update.
    pub fn config_updated_notice(&self) -> &'static str {
        match self {
            Language::En => "Configuration updated.",
            Language::Zh => "配置已更新。",
        }
    }

    /// Notice appended after a settings edit.
    pub fn setting_updated_notice(&self, field: SettingField, value: &str) -> String {
        match self {
            Language::En => format!(
                "[System Update] {} changed to: {}",
                field.label(*self),
                value
            ),
            Language::Zh => format!("[系统更新] {} 已修改为: {}", field.label(*self), value),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Zh => write!(f, "zh"),
        }
    }
}
