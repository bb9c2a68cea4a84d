//! Custom-Text Extractor: pulls user-specified text (quotes, names, engravings,
//! numbers, instructions) out of a prompt, and checks that generated prompts
//! still carry it.
//!
//! Matching is plain regex + case-insensitive substring containment. Paraphrases
//! produce false negatives and coincidental substrings produce false positives;
//! both are expected.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Double quotes (straight and curly) and curly single quotes. Straight single
/// quotes are skipped because apostrophes collide with them.
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["“”]([^"“”]+)["“”]|‘([^‘’]+)’"#).expect("invalid quoted-text regex")
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:named|name|for|to)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)")
        .expect("invalid name regex")
});

static QUOTED_ENGRAVING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:engraved|engraving|inscribed|inscription)(?:\s+(?:with|of|reading|that says))?\s*:?\s*["“‘]([^"”’]+)["”’]"#,
    )
    .expect("invalid engraving regex")
});

static PLAIN_ENGRAVING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:engraved|inscribed)\s+with\s+(?:the\s+)?([A-Za-z0-9][A-Za-z0-9 &'-]*?)\s*(?:[,.;!]|$|\bon\b|\binside\b)")
        .expect("invalid engraving regex")
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:[./-]\d+)*\b").expect("invalid number regex"));

static SENTENCE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?\n]+").expect("invalid sentence regex"));

const INSTRUCTION_MARKERS: &[&str] = &["must", "please", "make sure", "exactly", "important"];

/// Words the name pattern picks up that are never names.
const NAME_STOPWORDS: &[&str] = &["The", "My", "Her", "His", "Our", "Their", "A", "An", "Me"];

/// User-specified content recovered from a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignElements {
    pub custom_text: Vec<String>,
    pub names: Vec<String>,
    pub engravings: Vec<String>,
    pub numbers: Vec<String>,
    pub special_instructions: Vec<String>,
}

impl DesignElements {
    pub fn is_empty(&self) -> bool {
        self.custom_text.is_empty()
            && self.names.is_empty()
            && self.engravings.is_empty()
            && self.numbers.is_empty()
            && self.special_instructions.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub missing_elements: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Quoted strings in `text`, in order of appearance.
pub fn extract_quoted(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for cap in QUOTED_RE.captures_iter(text) {
        if let Some(m) = cap.get(1).or_else(|| cap.get(2)) {
            push_unique(&mut out, m.as_str());
        }
    }
    out
}

/// Extracts quoted text, names, engravings, numbers and special instructions.
pub fn extract_custom_elements(prompt: &str) -> DesignElements {
    let mut elements = DesignElements {
        custom_text: extract_quoted(prompt),
        ..Default::default()
    };

    for cap in NAME_RE.captures_iter(prompt) {
        let name = &cap[1];
        let first = name.split_whitespace().next().unwrap_or(name);
        if !NAME_STOPWORDS.contains(&first) {
            push_unique(&mut elements.names, name);
        }
    }

    for cap in QUOTED_ENGRAVING_RE.captures_iter(prompt) {
        push_unique(&mut elements.engravings, &cap[1]);
    }
    for cap in PLAIN_ENGRAVING_RE.captures_iter(prompt) {
        push_unique(&mut elements.engravings, &cap[1]);
    }

    for m in NUMBER_RE.find_iter(prompt) {
        push_unique(&mut elements.numbers, m.as_str());
    }

    for sentence in SENTENCE_SPLIT_RE.split(prompt) {
        let lower = sentence.to_lowercase();
        if INSTRUCTION_MARKERS.iter().any(|m| lower.contains(m)) {
            push_unique(&mut elements.special_instructions, sentence);
        }
    }

    elements
}

fn contains_ci(haystack_lower: &str, needle: &str) -> bool {
    haystack_lower.contains(&needle.to_lowercase())
}

/// Checks `elements` against `text`. Missing quoted text, names and engravings
/// are errors; missing numbers are warnings.
fn check_elements(elements: &DesignElements, text: &str, label: &str) -> PromptValidation {
    let lower = text.to_lowercase();
    let mut result = PromptValidation::default();

    for item in &elements.custom_text {
        if !contains_ci(&lower, item) {
            result
                .errors
                .push(format!("Custom text \"{item}\" is missing from the {label}"));
            result.missing_elements.push(item.clone());
        }
    }
    for name in &elements.names {
        if !contains_ci(&lower, name) {
            result
                .errors
                .push(format!("Name \"{name}\" is missing from the {label}"));
            result.missing_elements.push(name.clone());
        }
    }
    for engraving in &elements.engravings {
        if elements.custom_text.contains(engraving) {
            continue;
        }
        if !contains_ci(&lower, engraving) {
            result
                .errors
                .push(format!("Engraving \"{engraving}\" is missing from the {label}"));
            result.missing_elements.push(engraving.clone());
        }
    }
    for number in &elements.numbers {
        if !lower.contains(number.as_str()) {
            result.warnings.push(format!(
                "Number \"{number}\" could not be confirmed in the {label}"
            ));
        }
    }

    result.is_valid = result.errors.is_empty();
    result
}

/// Checks that the prompt sent to the image model carries the user's custom content.
pub fn validate_prompt_inclusion(user_prompt: &str, generated_prompt: &str) -> PromptValidation {
    let elements = extract_custom_elements(user_prompt);
    check_elements(&elements, generated_prompt, "generated prompt")
}

/// Checks the image model's rewritten prompt against the elements of the original request.
pub fn validate_revised_prompt(
    original_elements: &DesignElements,
    revised_prompt: &str,
) -> PromptValidation {
    check_elements(original_elements, revised_prompt, "revised prompt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_quoted_and_name() {
        let e = extract_custom_elements("engraved \"Forever\" for Sarah");
        assert_eq!(e.custom_text, vec!["Forever".to_string()]);
        assert!(e.names.contains(&"Sarah".to_string()));
        assert_eq!(e.engravings, vec!["Forever".to_string()]);
    }

    #[test]
    fn test_curly_quotes() {
        let e = extract_custom_elements("pendant reading “Always Yours”");
        assert_eq!(e.custom_text, vec!["Always Yours".to_string()]);
    }

    #[test]
    fn test_apostrophe_is_not_a_quote() {
        let e = extract_custom_elements("my daughter's birthstone ring, she's turning 16");
        assert!(e.custom_text.is_empty());
        assert_eq!(e.numbers, vec!["16".to_string()]);
    }

    #[test]
    fn test_named_pattern() {
        let e = extract_custom_elements("a locket for my dog named Biscuit");
        assert_eq!(e.names, vec!["Biscuit".to_string()]);
    }

    #[test]
    fn test_plain_engraving() {
        let e = extract_custom_elements("band engraved with the initials JM, in gold");
        assert_eq!(e.engravings, vec!["initials JM".to_string()]);
    }

    #[test]
    fn test_dates_are_numbers() {
        let e = extract_custom_elements("engrave 06/15/2019 inside");
        assert_eq!(e.numbers, vec!["06/15/2019".to_string()]);
    }

    #[test]
    fn test_special_instructions() {
        let e = extract_custom_elements("Gold ring. The stone must be oval. Nothing else");
        assert_eq!(e.special_instructions, vec!["The stone must be oval".to_string()]);
    }

    #[test]
    fn test_inclusion_passes_when_present() {
        let r = validate_prompt_inclusion(
            "engraved \"Forever\" for Sarah",
            "A gold band engraved with FOREVER, a gift for Sarah",
        );
        assert!(r.is_valid);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn test_inclusion_fails_when_quote_missing() {
        let r = validate_prompt_inclusion("engraved \"Forever\" for Sarah", "A gold band for Sarah");
        assert!(!r.is_valid);
        assert_eq!(r.missing_elements, vec!["Forever".to_string()]);
    }

    #[test]
    fn test_missing_number_is_warning_only() {
        let r = validate_prompt_inclusion("ring with 3 stones", "ring with three stones");
        assert!(r.is_valid);
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn test_revised_prompt_missing_name() {
        let elements = extract_custom_elements("necklace named Luna");
        let r = validate_revised_prompt(&elements, "an elegant silver necklace");
        assert!(!r.is_valid);
        assert!(r.errors[0].contains("Luna"));
        assert!(r.errors[0].contains("revised prompt"));
    }

    #[test]
    fn test_empty_elements_always_valid() {
        let r = validate_revised_prompt(&DesignElements::default(), "");
        assert!(r.is_valid);
        assert!(DesignElements::default().is_empty());
    }
}
