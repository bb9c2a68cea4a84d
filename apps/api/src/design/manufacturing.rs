//! Manufacturing Rule Checker: table-driven checks that a described piece can be made.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Phrases describing physically impossible constructions.
pub const FORBIDDEN_TECHNIQUES: &[&str] = &[
    "floating",
    "anti-gravity",
    "levitating",
    "suspended in air",
    "invisible metal",
    "liquid metal",
    "self-assembling",
    "holographic",
    "glowing without stones",
    "impossibly thin",
    "zero-gravity",
];

/// Techniques that can be made but extend lead time.
pub const SLOW_TECHNIQUES: &[&str] = &[
    "filigree",
    "granulation",
    "micro pave",
    "enamel",
    "hand engraving",
    "cloisonne",
];

/// Largest stone, in carats, the workshop will set for each type.
const MAX_CARAT: &[(&str, f64)] = &[
    ("diamond", 5.0),
    ("sapphire", 10.0),
    ("ruby", 5.0),
    ("emerald", 8.0),
    ("amethyst", 30.0),
    ("topaz", 30.0),
    ("opal", 15.0),
    ("aquamarine", 20.0),
];

/// Score additions per matched keyword for `calculate_complexity`.
const COMPLEXITY_KEYWORDS: &[(&str, u8)] = &[
    ("intricate", 2),
    ("filigree", 2),
    ("ornate", 2),
    ("granulation", 2),
    ("pave", 2),
    ("detailed", 1),
    ("halo", 1),
    ("engrav", 1),
    ("twisted", 1),
    ("braided", 1),
    ("openwork", 1),
    ("enamel", 1),
    ("layered", 1),
    ("multiple stones", 1),
];

pub const MIN_COMPLEXITY: u8 = 1;
pub const MAX_COMPLEXITY: u8 = 8;
pub const MIN_PRODUCTION_DAYS: u32 = 7;
pub const MAX_PRODUCTION_DAYS: u32 = 28;

pub const PRODUCTION_SUFFIX: &str =
    "Designed for real-world manufacturing with physically achievable settings and proportions.";

static CARAT_STONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+(?:\.\d+)?)\s*(?:-\s*)?(?:carats?|cts?)\s+(diamond|sapphire|ruby|emerald|amethyst|topaz|opal|aquamarine)",
    )
    .expect("invalid carat/stone regex")
});

static FORBIDDEN_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FORBIDDEN_TECHNIQUES
        .iter()
        .map(|phrase| {
            Regex::new(&format!(r"(?i){}", regex::escape(phrase)))
                .expect("invalid forbidden-technique regex")
        })
        .collect()
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

static DANGLING_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;])|([,;])\s*([,.;])").expect("invalid punct regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Checks a prompt against the forbidden-technique list, per-stone carat limits,
/// and the slow-technique list. Issues make the design invalid; warnings do not.
pub fn validate_design_for_production(prompt: &str) -> ProductionValidation {
    let text = prompt.to_lowercase();
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    for phrase in FORBIDDEN_TECHNIQUES {
        if text.contains(phrase) {
            issues.push(format!(
                "'{phrase}' cannot be physically manufactured"
            ));
        }
    }

    for cap in CARAT_STONE_RE.captures_iter(&text) {
        let Ok(carat) = cap[1].parse::<f64>() else {
            continue;
        };
        let stone = &cap[2];
        if let Some((_, max)) = MAX_CARAT.iter().find(|(name, _)| *name == stone) {
            if carat > *max {
                issues.push(format!(
                    "{carat} carat {stone} exceeds the {max} carat maximum for {stone}"
                ));
            }
        }
    }

    for technique in SLOW_TECHNIQUES {
        if text.contains(technique) {
            warnings.push(format!(
                "'{technique}' is labor-intensive and extends production time"
            ));
        }
    }

    ProductionValidation {
        is_valid: issues.is_empty(),
        issues,
        warnings,
    }
}

/// Strips forbidden phrases and appends the manufacturability suffix.
pub fn sanitize_prompt_for_production(prompt: &str) -> String {
    let mut text = prompt.to_string();
    for re in FORBIDDEN_RES.iter() {
        text = re.replace_all(&text, "").into_owned();
    }

    let text = WHITESPACE_RE.replace_all(text.trim(), " ");
    let text = DANGLING_PUNCT_RE.replace_all(&text, |caps: &Captures| {
        // Keep only the punctuation that ends the run.
        caps.get(1)
            .or_else(|| caps.get(3))
            .map_or_else(String::new, |m| m.as_str().to_string())
    });
    let mut text = text.trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace()).to_string();

    if !text.contains(PRODUCTION_SUFFIX) {
        if !text.is_empty() && !text.ends_with('.') {
            text.push('.');
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(PRODUCTION_SUFFIX);
    }
    text
}

/// Integer complexity score in `MIN_COMPLEXITY..=MAX_COMPLEXITY`.
pub fn calculate_complexity(prompt: &str) -> u8 {
    let text = prompt.to_lowercase();
    let score = COMPLEXITY_KEYWORDS
        .iter()
        .filter(|(kw, _)| text.contains(kw))
        .fold(MIN_COMPLEXITY, |acc, (_, add)| acc.saturating_add(*add));
    score.min(MAX_COMPLEXITY)
}

/// Linear interpolation from `MIN_PRODUCTION_DAYS` at score 1 to `MAX_PRODUCTION_DAYS` at 8.
pub fn estimate_production_days(complexity: u8) -> u32 {
    let score = complexity.clamp(MIN_COMPLEXITY, MAX_COMPLEXITY);
    let span = MAX_PRODUCTION_DAYS - MIN_PRODUCTION_DAYS;
    let steps = u32::from(MAX_COMPLEXITY - MIN_COMPLEXITY);
    MIN_PRODUCTION_DAYS + span * u32::from(score - MIN_COMPLEXITY) / steps
}
