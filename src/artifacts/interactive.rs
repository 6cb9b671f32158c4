//! Quiz and flashcard artifacts.
//!
//! Both arrive as a self-contained HTML app with the content embedded as
//! JSON, usually HTML-escaped inside a `data-app-data` attribute.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};

const KIND: &str = "interactive";

/// Fallback attributes tried after `data-app-data` and the script tag.
const FALLBACK_ATTRIBUTES: [&str; 3] = ["data-state", "data-config", "data-initial-state"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractiveFormat {
    #[default]
    Json,
    Markdown,
    Html,
}

impl FromStr for InteractiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            other => Err(Error::InvalidArgument(format!(
                "invalid output format {other:?}; use json, markdown or html"
            ))),
        }
    }
}

fn attribute_pattern(name: &str) -> Regex {
    Regex::new(&format!(r#"(?s){name}="([^"]*(?:\\"[^"]*)*)""#)).unwrap()
}

/// Pull the embedded app JSON out of an interactive artifact page.
pub fn extract_app_data(html: &str) -> Result<Value> {
    static APP_DATA: OnceLock<Regex> = OnceLock::new();
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    static FALLBACKS: OnceLock<Vec<Regex>> = OnceLock::new();

    let app_data = APP_DATA.get_or_init(|| attribute_pattern("data-app-data"));
    if let Some(m) = app_data.captures(html).and_then(|c| c.get(1)) {
        match serde_json::from_str(&html_unescape(m.as_str())) {
            Ok(data) => return Ok(data),
            Err(e) => debug!(error = %e, "data-app-data attribute is not JSON"),
        }
    }

    let script = SCRIPT.get_or_init(|| {
        Regex::new(r#"(?s)<script[^>]+id=["']application-data["'][^>]*>(.*?)</script>"#).unwrap()
    });
    if let Some(m) = script.captures(html).and_then(|c| c.get(1)) {
        match serde_json::from_str(m.as_str()) {
            Ok(data) => return Ok(data),
            Err(e) => debug!(error = %e, "application-data script is not JSON"),
        }
    }

    let fallbacks = FALLBACKS.get_or_init(|| {
        FALLBACK_ATTRIBUTES
            .iter()
            .map(|name| attribute_pattern(name))
            .collect()
    });
    for pattern in fallbacks {
        if let Some(m) = pattern.captures(html).and_then(|c| c.get(1)) {
            if let Ok(data) = serde_json::from_str(&html_unescape(m.as_str())) {
                return Ok(data);
            }
        }
    }

    Err(Error::structure(
        KIND,
        "html",
        "no embedded app data (tried data-app-data, script#application-data, data-state, data-config, data-initial-state)",
    ))
}

/// Decode HTML character references: the named ones attribute values use
/// plus decimal and hex numeric references.
pub fn html_unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "quot" => Some('"'),
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn entries<'a>(app_data: &'a Value, key: &str) -> &'a [Value] {
    app_data
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn quiz_markdown(title: &str, questions: &[Value]) -> String {
    let mut lines = vec![format!("# {title}"), String::new()];
    for (i, q) in questions.iter().enumerate() {
        lines.push(format!("## Question {}", i + 1));
        lines.push(str_field(q, "question").to_string());
        lines.push(String::new());
        for opt in entries(q, "answerOptions") {
            let marker = if opt.get("isCorrect").and_then(Value::as_bool) == Some(true) {
                "[x]"
            } else {
                "[ ]"
            };
            lines.push(format!("- {marker} {}", str_field(opt, "text")));
        }
        let hint = str_field(q, "hint");
        if !hint.is_empty() {
            lines.push(String::new());
            lines.push(format!("**Hint:** {hint}"));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

fn flashcards_markdown(title: &str, cards: &[Value]) -> String {
    let mut lines = vec![format!("# {title}"), String::new()];
    for (i, card) in cards.iter().enumerate() {
        lines.push(format!("## Card {}", i + 1));
        lines.push(String::new());
        lines.push(format!("**Front:** {}", str_field(card, "f")));
        lines.push(String::new());
        lines.push(format!("**Back:** {}", str_field(card, "b")));
        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Render extracted app data. `html` is returned verbatim for
/// [`InteractiveFormat::Html`].
pub fn format_interactive(
    app_data: &Value,
    title: &str,
    format: InteractiveFormat,
    html: &str,
    is_quiz: bool,
) -> Result<String> {
    if format == InteractiveFormat::Html {
        return Ok(html.to_string());
    }
    if is_quiz {
        let questions = entries(app_data, "quiz");
        return match format {
            InteractiveFormat::Markdown => Ok(quiz_markdown(title, questions)),
            _ => Ok(serde_json::to_string_pretty(
                &json!({ "title": title, "questions": questions }),
            )?),
        };
    }
    let cards = entries(app_data, "flashcards");
    match format {
        InteractiveFormat::Markdown => Ok(flashcards_markdown(title, cards)),
        _ => {
            let normalized: Vec<Value> = cards
                .iter()
                .map(|c| json!({ "front": str_field(c, "f"), "back": str_field(c, "b") }))
                .collect();
            Ok(serde_json::to_string_pretty(
                &json!({ "title": title, "cards": normalized }),
            )?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIZ_PAGE: &str = r#"<html><body><div id="app" data-app-data="{&quot;quiz&quot;:[{&quot;question&quot;:&quot;2 &amp; 2?&quot;,&quot;answerOptions&quot;:[{&quot;text&quot;:&quot;4&quot;,&quot;isCorrect&quot;:true},{&quot;text&quot;:&quot;5&quot;,&quot;isCorrect&quot;:false}],&quot;hint&quot;:&quot;Add&quot;}]}"></div></body></html>"#;

    #[test]
    fn unescape_entities() {
        assert_eq!(html_unescape("a &lt;b&gt; &#39;c&#x27; &amp;amp; & d"), "a <b> 'c' &amp; & d");
        assert_eq!(html_unescape("&unknown; &"), "&unknown; &");
    }

    #[test]
    fn extracts_attribute_data() {
        let data = extract_app_data(QUIZ_PAGE).unwrap();
        assert_eq!(data["quiz"][0]["question"], "2 & 2?");
    }

    #[test]
    fn falls_back_to_script_tag() {
        let page = r#"<div data-app-data="not json"></div><script type="application/json" id="application-data">{"flashcards":[{"f":"Q","b":"A"}]}</script>"#;
        let data = extract_app_data(page).unwrap();
        assert_eq!(data["flashcards"][0]["b"], "A");
    }

    #[test]
    fn falls_back_to_state_attribute() {
        let page = r#"<div data-initial-state="{&quot;quiz&quot;:[]}"></div>"#;
        assert_eq!(extract_app_data(page).unwrap(), json!({"quiz": []}));
        assert!(extract_app_data("<html></html>").is_err());
    }

    #[test]
    fn quiz_markdown_marks_correct_answer() {
        let data = extract_app_data(QUIZ_PAGE).unwrap();
        let md = format_interactive(&data, "Quiz", InteractiveFormat::Markdown, QUIZ_PAGE, true)
            .unwrap();
        assert!(md.starts_with("# Quiz\n\n## Question 1\n2 & 2?"));
        assert!(md.contains("- [x] 4\n- [ ] 5"));
        assert!(md.contains("**Hint:** Add"));
    }

    #[test]
    fn flashcards_json_is_normalized() {
        let data = json!({"flashcards": [{"f": "front", "b": "back"}]});
        let out = format_interactive(&data, "Deck", InteractiveFormat::Json, "", false).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["cards"][0], json!({"front": "front", "back": "back"}));
    }

    #[test]
    fn html_passthrough_and_format_parsing() {
        let out = format_interactive(&json!({}), "t", InteractiveFormat::Html, "<p>x</p>", true)
            .unwrap();
        assert_eq!(out, "<p>x</p>");
        assert_eq!("MD".parse::<InteractiveFormat>().unwrap(), InteractiveFormat::Markdown);
        assert!("pdf".parse::<InteractiveFormat>().is_err());
    }
}
