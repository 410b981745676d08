use super::*;

use proptest::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_detects_each_category() {
    let cases = [
        (
            "import React, { useState } from 'react';\nexport function App() {\n  const [n] = useState(0);\n  return <div className=\"app\">{n}</div>;\n}\n",
            DictionaryId::React,
        ),
        (
            "<template>\n  <div v-if=\"ok\">{{ msg }}</div>\n</template>\n<script setup>\nimport { ref } from 'vue'\n</script>\n",
            DictionaryId::Vue,
        ),
        (r#"{"name": "husk", "version": "1.0.0", "private": true}"#, DictionaryId::Json),
        (
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M0 0h24v24H0z"/></svg>"#,
            DictionaryId::Svg,
        ),
        (
            "<!DOCTYPE html>\n<html><head><title>x</title></head><body></body></html>\n",
            DictionaryId::Html,
        ),
        (
            "export interface User {\n  id: number;\n  name: string;\n}\nexport type Id = string;\n",
            DictionaryId::TypeScript,
        ),
        (
            "const path = require('path');\nmodule.exports = function resolve(p) { return path.join(__dirname, p); };\n",
            DictionaryId::JavaScript,
        ),
        (
            ".button {\n  color: red;\n  padding: 4px;\n}\n@media (max-width: 600px) { .button { display: none; } }\n",
            DictionaryId::Css,
        ),
        (
            "import os\n\nclass Greeter:\n    def greet(self, name):\n        print(name)\n\nif __name__ == '__main__':\n    Greeter().greet('x')\n",
            DictionaryId::Python,
        ),
        (
            "# Title\n\nSome text with a [link](https://example.com).\n\n- item one\n- item two\n",
            DictionaryId::Markdown,
        ),
    ];

    for (content, expected) in cases {
        assert_eq!(detect(content), expected, "content: {content}");
    }
}

#[test]
fn test_unknown_content_is_generic() {
    assert_eq!(detect("lorem ipsum dolor sit amet"), DictionaryId::Generic);
    assert_eq!(detect(""), DictionaryId::Generic);
    assert_eq!(detect("   \n\t"), DictionaryId::Generic);
}

#[test]
fn test_minified_beats_javascript() {
    let bundle = "var a=function(b){return b+1},c=a(2);".repeat(40);
    assert_eq!(detect(&bundle), DictionaryId::MinifiedJs);
}

#[test]
fn test_esm_import_is_not_python() {
    let snippet = "import x from 'y'\ndef f():\n    return x\n";
    assert_eq!(detect(snippet), DictionaryId::JavaScript);
}

#[test]
fn test_detect_named_prefers_extension() {
    assert_eq!(detect_named("notes.md", "const a = require('a');"), DictionaryId::Markdown);
    assert_eq!(detect_named("Makefile", "const a = require('a');"), DictionaryId::JavaScript);
}

#[test]
fn test_detect_path() {
    let temp = tempdir().unwrap();

    let minified = temp.path().join("app.min.js");
    fs::write(&minified, "not even read").unwrap();
    assert_eq!(detect_path(&minified), DictionaryId::MinifiedJs);

    let script = temp.path().join("cli");
    fs::write(&script, "#!/usr/bin/env node\nconst x = require('x');\n").unwrap();
    assert_eq!(detect_path(&script), DictionaryId::JavaScript);

    assert_eq!(detect_path(&temp.path().join("missing")), DictionaryId::Generic);
}

#[test]
fn test_detect_package_picks_dominant_bytes() {
    let temp = tempdir().unwrap();
    let dir = temp.path();
    fs::create_dir_all(dir.join("lib")).unwrap();
    fs::write(dir.join("package.json"), "{}".repeat(5000)).unwrap();
    fs::write(dir.join("lib/index.js"), "x".repeat(1000)).unwrap();
    fs::write(dir.join("index.d.ts"), "x".repeat(100)).unwrap();
    fs::write(dir.join("README.md"), "x".repeat(200)).unwrap();
    fs::write(dir.join("LICENSE"), "x".repeat(9000)).unwrap();

    assert_eq!(detect_package(dir), DictionaryId::JavaScript);
}

#[test]
fn test_detect_package_empty_is_generic() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("package.json"), "{}").unwrap();
    assert_eq!(detect_package(temp.path()), DictionaryId::Generic);
}

#[test]
fn test_truncate_respects_char_boundaries() {
    let text = "é".repeat(10);
    let cut = truncate(&text, 5);
    assert_eq!(cut.len(), 4);
    assert_eq!(truncate("short", 100), "short");
}

proptest! {
    #[test]
    fn detect_never_panics(content in ".{0,400}") {
        let _ = detect(&content);
    }

    #[test]
    fn esm_import_never_python(name in "[a-z]{1,8}", body in "[a-z ():\n]{0,40}") {
        let snippet = format!("import {name} from '{name}'\ndef f():\n{body}");
        prop_assert_ne!(detect(&snippet), DictionaryId::Python);
    }
}
