//! Parser configuration.

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Options for [`parse_component`](crate::parse_component).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserOptions {
    /// Path of the file being parsed. A path whose extension is not `vue`
    /// is parsed as a plain script.
    pub file_path: Option<PathBuf>,
    pub template: TemplateOptions,
}

impl ParserOptions {
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Whether the source is a component rather than a plain script.
    pub fn is_component(&self) -> bool {
        match &self.file_path {
            None => true,
            Some(path) => path.extension().is_some_and(|ext| ext == "vue"),
        }
    }
}

/// Template syntax options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateOptions {
    /// Opening and closing interpolation delimiters.
    pub interpolation: (String, String),
    /// Prefix that marks an attribute as a directive.
    pub directive_prefix: String,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            interpolation: ("{{".to_string(), "}}".to_string()),
            directive_prefix: "v-".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("interpolation delimiters must not be empty")]
    EmptyDelimiter,
    #[error("directive prefix must not be empty")]
    EmptyPrefix,
    #[error("invalid template syntax pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiled template syntax: interpolation and directive-name patterns.
#[derive(Debug, Clone)]
pub struct Syntax {
    interpolation: Regex,
    directive: Regex,
    open: usize,
    close: usize,
    prefix: String,
}

impl Syntax {
    pub fn new(options: &TemplateOptions) -> Result<Self, OptionsError> {
        let (open, close) = &options.interpolation;
        if open.is_empty() || close.is_empty() {
            return Err(OptionsError::EmptyDelimiter);
        }
        if options.directive_prefix.is_empty() {
            return Err(OptionsError::EmptyPrefix);
        }

        let interpolation = Regex::new(&format!(
            r"{}[\s\S]+?{}",
            regex::escape(open),
            regex::escape(close)
        ))?;
        let directive = Regex::new(&format!(
            r"^(?:{}|[:@]).*[^.:@]$",
            regex::escape(&options.directive_prefix)
        ))?;

        Ok(Self {
            interpolation,
            directive,
            open: open.len(),
            close: close.len(),
            prefix: options.directive_prefix.clone(),
        })
    }

    /// Interpolation placeholders in `text`, as byte ranges relative to it.
    pub fn interpolations<'t>(&'t self, text: &'t str) -> impl Iterator<Item = (usize, usize)> + 't {
        self.interpolation.find_iter(text).map(|m| (m.start(), m.end()))
    }

    /// Byte lengths of the opening and closing delimiters.
    pub fn delimiter_sizes(&self) -> (usize, usize) {
        (self.open, self.close)
    }

    pub fn is_directive(&self, name: &str) -> bool {
        self.directive.is_match(name)
    }

    pub fn directive_prefix(&self) -> &str {
        &self.prefix
    }
}
