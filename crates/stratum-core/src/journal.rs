//! Per-component journal stream settings.
//!
//! Component sub-dictionaries may carry `journal.<operation>` or
//! `journal.<operation>.<stream>` entries that tune that component's
//! diagnostic output. The original framework routed these into its own
//! stream hierarchy; here they map onto the `log` facade, and applying the
//! settings records them at debug level so a capturing logger can verify
//! what a component asked for.

use crate::dictionary::{Dictionary, Value};

/// Recognised journal operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JournalOperation {
    /// Enable or disable a stream.
    Enable,
    /// Enable or disable a stream and all its children.
    EnableBranch,
    /// Verbosity level. Higher is more verbose: 1 maps to info, 2 to
    /// debug, 3 and above to trace.
    Level,
    /// Restrict output to one rank. Accepted for compatibility; this
    /// runtime is single-process, so it only records.
    Rank,
    /// Flush the stream after every print.
    Flush,
}

impl JournalOperation {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "enable" => Some(Self::Enable),
            "enable-branch" => Some(Self::EnableBranch),
            "level" => Some(Self::Level),
            "rank" => Some(Self::Rank),
            "flush" => Some(Self::Flush),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::EnableBranch => "enable-branch",
            Self::Level => "level",
            Self::Rank => "rank",
            Self::Flush => "flush",
        }
    }
}

/// One parsed journal entry.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamSetting {
    /// What to change.
    pub operation: JournalOperation,
    /// Stream name, or `None` for the component's default stream.
    pub stream: Option<String>,
    /// The configured value, uninterpreted.
    pub value: Value,
}

/// The journal settings found in one component's sub-dictionary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JournalSettings {
    settings: Vec<StreamSetting>,
}

impl JournalSettings {
    /// Scan a component sub-dictionary for `journal.*` keys.
    ///
    /// Unknown operations are skipped with a warning; other keys are left
    /// alone.
    pub fn from_dictionary(dict: &Dictionary) -> Self {
        let mut settings = Vec::new();
        for (key, value) in dict.iter() {
            let Some(rest) = key.strip_prefix("journal.") else {
                continue;
            };
            let (op_token, stream) = match rest.split_once('.') {
                Some((op, stream)) => (op, Some(stream.to_owned())),
                None => (rest, None),
            };
            match JournalOperation::parse(op_token) {
                Some(operation) => settings.push(StreamSetting {
                    operation,
                    stream,
                    value: value.clone(),
                }),
                None => {
                    log::warn!("unknown journal operation '{op_token}' in key '{key}'");
                }
            }
        }
        Self { settings }
    }

    /// Number of parsed settings.
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Whether no journal keys were present.
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// The parsed settings, in dictionary order.
    pub fn settings(&self) -> &[StreamSetting] {
        &self.settings
    }

    /// Whether the component's default stream is enabled. `None` when no
    /// enable entry was given.
    pub fn enabled(&self) -> Option<bool> {
        self.settings
            .iter()
            .rev()
            .find(|s| {
                matches!(
                    s.operation,
                    JournalOperation::Enable | JournalOperation::EnableBranch
                ) && s.stream.is_none()
            })
            .and_then(|s| s.value.as_bool())
    }

    /// The configured verbosity for `stream` mapped onto a `log` level.
    pub fn level_for(&self, stream: Option<&str>) -> Option<log::Level> {
        self.settings
            .iter()
            .rev()
            .find(|s| s.operation == JournalOperation::Level && s.stream.as_deref() == stream)
            .and_then(|s| s.value.as_uint())
            .map(|level| match level {
                0 => log::Level::Warn,
                1 => log::Level::Info,
                2 => log::Level::Debug,
                _ => log::Level::Trace,
            })
    }

    /// Record the settings for a component so capturing loggers see them.
    pub fn apply(&self, component_name: &str) {
        for setting in &self.settings {
            let stream = setting.stream.as_deref().unwrap_or("<default>");
            log::debug!(
                "journal: {component_name}: {} {stream} = {:?}",
                setting.operation.as_str(),
                setting.value
            );
        }
    }
}
