//! Extension table and ordered content rules
//!
//! Content rules are evaluated top to bottom and the first one that fires
//! wins. Minified JS and the framework rules sit above the plain language
//! rules, and every JS/TS rule sits above Python, whose `import`/`from`
//! syntax overlaps with ES modules.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::dictionary::DictionaryId;

/// Suffix lookup, longest suffixes first
pub const EXTENSIONS: &[(&str, DictionaryId)] = &[
    (".min.js", DictionaryId::MinifiedJs),
    (".min.mjs", DictionaryId::MinifiedJs),
    (".min.cjs", DictionaryId::MinifiedJs),
    (".d.ts", DictionaryId::TypeScript),
    (".jsx", DictionaryId::React),
    (".tsx", DictionaryId::React),
    (".vue", DictionaryId::Vue),
    (".json", DictionaryId::Json),
    (".map", DictionaryId::Json),
    (".svg", DictionaryId::Svg),
    (".html", DictionaryId::Html),
    (".htm", DictionaryId::Html),
    (".ts", DictionaryId::TypeScript),
    (".mts", DictionaryId::TypeScript),
    (".cts", DictionaryId::TypeScript),
    (".js", DictionaryId::JavaScript),
    (".mjs", DictionaryId::JavaScript),
    (".cjs", DictionaryId::JavaScript),
    (".css", DictionaryId::Css),
    (".py", DictionaryId::Python),
    (".md", DictionaryId::Markdown),
    (".markdown", DictionaryId::Markdown),
];

/// Match a file name against the extension table
pub fn lookup_extension(file_name: &str) -> Option<DictionaryId> {
    let lower = file_name.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix) && lower.len() > suffix.len())
        .map(|(_, id)| *id)
}

/// A regex and what it adds to its rule's score
#[derive(Debug)]
pub struct Pattern {
    pub regex: Regex,
    pub weight: u32,
}

#[derive(Debug)]
pub enum Matcher {
    /// Structural check that is not a pattern count
    Predicate(fn(&str) -> bool),
    /// Sum of weights of matching patterns must reach `min_score`
    Scored { patterns: Vec<Pattern>, min_score: u32 },
}

#[derive(Debug)]
pub struct Rule {
    pub id: DictionaryId,
    pub matcher: Matcher,
}

impl Rule {
    fn scored(id: DictionaryId, min_score: u32, sources: &[(&str, u32)]) -> Self {
        let patterns = sources
            .iter()
            .filter_map(|(source, weight)| match Regex::new(source) {
                Ok(regex) => Some(Pattern { regex, weight: *weight }),
                Err(e) => {
                    warn!("dropping invalid {} pattern {}: {}", id, source, e);
                    None
                },
            })
            .collect();
        Self {
            id,
            matcher: Matcher::Scored { patterns, min_score },
        }
    }

    /// Score of `content` under this rule; predicates score 1 or 0
    pub fn score(&self, content: &str) -> u32 {
        match &self.matcher {
            Matcher::Predicate(check) => u32::from(check(content)),
            Matcher::Scored { patterns, .. } => patterns
                .iter()
                .filter(|p| p.regex.is_match(content))
                .map(|p| p.weight)
                .sum(),
        }
    }

    pub fn matches(&self, content: &str) -> bool {
        match &self.matcher {
            Matcher::Predicate(check) => check(content),
            Matcher::Scored { min_score, .. } => self.score(content) >= *min_score,
        }
    }
}

/// The ordered content rules
pub static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            id: DictionaryId::MinifiedJs,
            matcher: Matcher::Predicate(looks_minified),
        },
        Rule::scored(
            DictionaryId::React,
            3,
            &[
                (r#"from\s+['"]react(-dom)?(/[\w-]+)?['"]"#, 3),
                (r#"require\(\s*['"]react['"]\s*\)"#, 3),
                (r"React\.(createElement|Component|Fragment)", 3),
                (r"\buse(State|Effect|Ref|Memo|Callback|Context|Reducer)\s*\(", 2),
                (r"\bclassName=", 2),
                (r"<[A-Z][A-Za-z0-9]*(\s+[\w-]+=|\s*/?>)", 1),
            ],
        ),
        Rule::scored(
            DictionaryId::Vue,
            3,
            &[
                (r"<template[\s>]", 3),
                (r#"from\s+['"]vue['"]"#, 3),
                (r"<script\s+setup", 2),
                (r"\bv-(if|else|for|model|bind|on|show)\b", 2),
                (r"\bdefineComponent\s*\(", 2),
                (r"\$(emit|refs|props)\b", 1),
            ],
        ),
        Rule {
            id: DictionaryId::Json,
            matcher: Matcher::Predicate(looks_like_json),
        },
        Rule::scored(
            DictionaryId::Svg,
            3,
            &[
                (r"<svg[\s>]", 3),
                (r#"xmlns="http://www\.w3\.org/2000/svg""#, 3),
                (r"<(path|circle|rect|polygon|polyline|g)[\s>/]", 1),
                (r#"\bviewBox=""#, 1),
            ],
        ),
        Rule::scored(
            DictionaryId::Html,
            3,
            &[
                (r"(?i)<!doctype\s+html", 3),
                (r"(?i)<html[\s>]", 3),
                (r"(?i)<(head|body)[\s>]", 2),
                (r"(?i)<(div|meta|link|title|span|p)[\s>]", 1),
            ],
        ),
        Rule::scored(
            DictionaryId::TypeScript,
            3,
            &[
                (r"\bimport\s+type\b", 2),
                (r"\binterface\s+\w+(\s+extends\s+[\w.<>, ]+)?\s*\{", 2),
                (r"(?m)^\s*(export\s+)?type\s+\w+(<[^>]*>)?\s*=", 2),
                (r"\benum\s+\w+\s*\{", 2),
                (r"[\w)]\s*:\s*(string|number|boolean|void|any|unknown|never)\b", 2),
                (r"\b(public|private|protected|readonly)\s+\w+\s*[:;(=]", 1),
                (r"\bas\s+const\b", 1),
                (r"\bdeclare\s+(module|const|function|global)\b", 2),
            ],
        ),
        Rule::scored(
            DictionaryId::JavaScript,
            2,
            &[
                (r#"(?m)^\s*import\s+[\w*{}\s,$]+\s+from\s+['"]"#, 2),
                (r#"(?m)^\s*import\s+['"]"#, 2),
                (r"(?m)^\s*export\s+(default|const|let|function|class|async|\{)", 2),
                (r#"\brequire\(\s*['"]"#, 2),
                (r"\bmodule\.exports\b|\bexports\.\w+\s*=", 2),
                (r"\b(const|let|var)\s+[\w${}\[\], ]+\s*=", 1),
                (r"\bfunction\s*[\w$]*\s*\(", 1),
                (r"=>", 1),
                (r"\bconsole\.\w+\(", 1),
            ],
        ),
        Rule::scored(
            DictionaryId::Css,
            3,
            &[
                (r"(?m)^\s*[.#]?[\w-]+(\s*[,>+~]?\s*[.#:]?[\w-]+)*\s*\{", 1),
                (r"(?m)^\s*[\w-]+\s*:\s*[^;{}]+;", 1),
                (r"@media\b", 2),
                (r"@(import|font-face|keyframes|charset)\b", 2),
                (r"\b(color|margin|padding|display|font-size|background)\s*:", 1),
            ],
        ),
        Rule::scored(
            DictionaryId::Python,
            3,
            &[
                (r"(?m)^\s*def\s+\w+\s*\(.*\)\s*(->\s*[\w\[\], .]+)?:\s*$", 2),
                (r"(?m)^\s*class\s+\w+(\(.*\))?:\s*$", 2),
                (r"(?m)^\s*(from\s+[\w.]+\s+)?import\s+[\w.]+(\s+as\s+\w+)?\s*$", 1),
                (r"\bself\.\w+", 1),
                (r#"__name__\s*==\s*['"]__main__['"]"#, 2),
                (r"(?m)^\s*elif\b", 2),
                (r"\bprint\(", 1),
            ],
        ),
        Rule::scored(
            DictionaryId::Markdown,
            3,
            &[
                (r"(?m)^#{1,6}\s+\S", 2),
                (r"(?m)^```", 2),
                (r"(?m)^\s*[-*+]\s+\S", 1),
                (r"\[[^\]\n]+\]\([^)\n]+\)", 1),
                (r"(?m)^>\s", 1),
            ],
        ),
    ]
});

/// Ids of the content rules in evaluation order
pub fn rule_order() -> Vec<DictionaryId> {
    RULES.iter().map(|rule| rule.id).collect()
}

const MINIFIED_MIN_LEN: usize = 500;
const MINIFIED_MIN_LINE: usize = 250;

static JS_TOKEN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"function\s*\(|=>|\breturn\b|\bvar\s|[;,]\w+=").ok());

fn looks_minified(content: &str) -> bool {
    if content.len() < MINIFIED_MIN_LEN {
        return false;
    }
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return false;
    }
    let average = content.len() / lines.len();
    let whitespace = content.chars().filter(|c| c.is_whitespace()).count();

    average >= MINIFIED_MIN_LINE
        && whitespace * 10 < content.len()
        && JS_TOKEN.as_ref().map(|re| re.is_match(content)).unwrap_or(false)
}

fn looks_like_json(content: &str) -> bool {
    let trimmed = content.trim();
    let framed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    framed && serde_json::from_str::<serde::de::IgnoredAny>(trimmed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        let expected = [
            (DictionaryId::React, 6),
            (DictionaryId::Vue, 6),
            (DictionaryId::Svg, 4),
            (DictionaryId::Html, 4),
            (DictionaryId::TypeScript, 8),
            (DictionaryId::JavaScript, 9),
            (DictionaryId::Css, 5),
            (DictionaryId::Python, 7),
            (DictionaryId::Markdown, 5),
        ];
        for (id, count) in expected {
            let rule = RULES.iter().find(|r| r.id == id).unwrap();
            match &rule.matcher {
                Matcher::Scored { patterns, .. } => assert_eq!(patterns.len(), count, "{id}"),
                Matcher::Predicate(_) => panic!("{id} should be scored"),
            }
        }
        assert!(JS_TOKEN.is_some());
    }

    #[test]
    fn test_rule_order() {
        assert_eq!(
            rule_order(),
            vec![
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
            ]
        );
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(lookup_extension("app.min.js"), Some(DictionaryId::MinifiedJs));
        assert_eq!(lookup_extension("app.js"), Some(DictionaryId::JavaScript));
        assert_eq!(lookup_extension("index.d.ts"), Some(DictionaryId::TypeScript));
        assert_eq!(lookup_extension("Button.TSX"), Some(DictionaryId::React));
        assert_eq!(lookup_extension("bundle.js.map"), Some(DictionaryId::Json));
        assert_eq!(lookup_extension("LICENSE"), None);
        assert_eq!(lookup_extension(".js"), None);
    }

    #[test]
    fn test_min_score_threshold() {
        let react = RULES.iter().find(|r| r.id == DictionaryId::React).unwrap();
        // A lone capitalized tag is not enough.
        assert_eq!(react.score("<Foo />"), 1);
        assert!(!react.matches("<Foo />"));
        assert!(react.matches("import React from 'react';"));
    }

    #[test]
    fn test_minified_predicate() {
        let minified = "var a=function(b){return b+1},c=a(2);".repeat(40);
        assert!(looks_minified(&minified));

        let pretty = "function add(a, b) {\n  return a + b;\n}\n".repeat(40);
        assert!(!looks_minified(&pretty));
        assert!(!looks_minified("var a=1;"));
    }

    #[test]
    fn test_json_predicate() {
        assert!(looks_like_json(r#"{"name": "husk", "private": true}"#));
        assert!(looks_like_json("[1, 2, 3]"));
        assert!(!looks_like_json("{ name: 'not json' }"));
        assert!(!looks_like_json("plain text"));
    }
}
