//! Localized message templates.
//!
//! Phases never build user-facing text themselves; they ask a [`Localizer`]
//! to render a [`MessageKey`] with named parameters in the group's language.

use crate::error::{NudgeError, Result};
use std::collections::HashMap;

/// Messages the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Pre-deadline warning. Params: `standupers`, `minutes`.
    WarnNonReporters,
    /// Deadline missed. Params: `standupers`.
    NotifyNonReporters,
    /// Escalation reminder for one standuper. Params: `standuper`.
    RemindNonReporter,
}

impl MessageKey {
    pub fn id(self) -> &'static str {
        match self {
            Self::WarnNonReporters => "warn_non_reporters",
            Self::NotifyNonReporters => "notify_non_reporters",
            Self::RemindNonReporter => "remind_non_reporter",
        }
    }
}

/// Renders message templates in a target language.
pub trait Localizer: Send + Sync {
    /// Render `key` in `language`, substituting `params`.
    ///
    /// Implementations fall back to their default language when `language`
    /// is empty or unknown.
    fn render(&self, key: MessageKey, language: &str, params: &[(&str, &str)]) -> Result<String>;
}

/// Built-in English/Russian catalog with optional per-language overrides.
#[derive(Debug, Clone)]
pub struct Catalog {
    default_language: String,
    overrides: HashMap<(String, MessageKey), String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new("en")
    }
}

impl Catalog {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: primary_subtag(default_language),
            overrides: HashMap::new(),
        }
    }

    /// Replace the template for `key` in `language`.
    pub fn with_template(
        mut self,
        language: &str,
        key: MessageKey,
        template: impl Into<String>,
    ) -> Self {
        self.overrides
            .insert((primary_subtag(language), key), template.into());
        self
    }

    fn template(&self, key: MessageKey, language: &str) -> Option<&str> {
        self.overrides
            .get(&(language.to_owned(), key))
            .map(String::as_str)
            .or_else(|| builtin_template(language, key))
    }
}

impl Localizer for Catalog {
    fn render(&self, key: MessageKey, language: &str, params: &[(&str, &str)]) -> Result<String> {
        let language = primary_subtag(language);
        let template = self
            .template(key, &language)
            .or_else(|| self.template(key, &self.default_language))
            .ok_or_else(|| {
                NudgeError::Localization(format!(
                    "no template `{}` for `{language}` or default `{}`",
                    key.id(),
                    self.default_language
                ))
            })?;
        Ok(substitute(template, params))
    }
}

fn builtin_template(language: &str, key: MessageKey) -> Option<&'static str> {
    let template = match (language, key) {
        ("en", MessageKey::WarnNonReporters) => {
            "Attention, {standupers}! {minutes} minutes till deadline, submit standups ASAP."
        }
        ("en", MessageKey::NotifyNonReporters) => {
            "Attention, {standupers}! You have just missed the deadline! Submit standups ASAP!"
        }
        ("en", MessageKey::RemindNonReporter) => {
            "Attention, {standuper}! You still haven't written a standup! Write a standup!"
        }
        ("ru", MessageKey::WarnNonReporters) => {
            "Внимание, {standupers}! До дедлайна осталось {minutes} минут, сдайте стендапы как можно скорее."
        }
        ("ru", MessageKey::NotifyNonReporters) => {
            "Внимание, {standupers}! Вы только что пропустили дедлайн! Сдайте стендапы как можно скорее!"
        }
        ("ru", MessageKey::RemindNonReporter) => {
            "Внимание, {standuper}! Вы всё ещё не написали стендап! Напишите стендап!"
        }
        _ => return None,
    };
    Some(template)
}

fn primary_subtag(language: &str) -> String {
    language
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Replace `{name}` placeholders. Unknown placeholders are left as-is.
fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_owned(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
}
