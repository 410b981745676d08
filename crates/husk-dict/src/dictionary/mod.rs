//! Dictionary identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pre-trained dictionary a file should be compressed with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DictionaryId {
    MinifiedJs,
    React,
    Vue,
    Json,
    Svg,
    Html,
    #[serde(rename = "typescript")]
    TypeScript,
    #[serde(rename = "javascript")]
    JavaScript,
    Css,
    Python,
    Markdown,
    #[default]
    Generic,
}

impl DictionaryId {
    pub const ALL: [DictionaryId; 12] = [
        DictionaryId::MinifiedJs,
        DictionaryId::React,
        DictionaryId::Vue,
        DictionaryId::Json,
        DictionaryId::Svg,
        DictionaryId::Html,
        DictionaryId::TypeScript,
        DictionaryId::JavaScript,
        DictionaryId::Css,
        DictionaryId::Python,
        DictionaryId::Markdown,
        DictionaryId::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DictionaryId::MinifiedJs => "minified-js",
            DictionaryId::React => "react",
            DictionaryId::Vue => "vue",
            DictionaryId::Json => "json",
            DictionaryId::Svg => "svg",
            DictionaryId::Html => "html",
            DictionaryId::TypeScript => "typescript",
            DictionaryId::JavaScript => "javascript",
            DictionaryId::Css => "css",
            DictionaryId::Python => "python",
            DictionaryId::Markdown => "markdown",
            DictionaryId::Generic => "generic",
        }
    }
}

impl fmt::Display for DictionaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DictionaryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DictionaryId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| format!("unknown dictionary '{}'", s))
    }
}
