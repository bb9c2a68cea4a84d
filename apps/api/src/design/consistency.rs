//! Cross-View Consistency Checker: diffs the design attributes mentioned in two
//! independently revised image prompts.
//!
//! Each view is reduced to fixed attribute categories, then compared category by
//! category. A critical mismatch makes the pair inconsistent; a warning mismatch
//! only lowers the score:
//!
//!   score = round(70 × critical pass rate + 30 × overall pass rate)

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::design::custom_text::extract_quoted;

const CRITICAL_WEIGHT: f64 = 70.0;
const OVERALL_WEIGHT: f64 = 30.0;

const METAL_TYPES: &[&str] = &["gold", "silver", "platinum", "palladium", "titanium", "sterling"];

const GEMSTONES: &[&str] = &[
    "diamond",
    "sapphire",
    "ruby",
    "emerald",
    "pearl",
    "amethyst",
    "topaz",
    "opal",
    "aquamarine",
    "garnet",
    "morganite",
];

const COLOR_ADJECTIVES: &[&str] = &[
    "polished", "matte", "brushed", "hammered", "oxidized", "satin", "glossy", "antique",
];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("single", 1),
    ("two", 2),
    ("double", 2),
    ("three", 3),
    ("triple", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
];

static METAL_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(rose|white|yellow|black|champagne|green)\s+gold|(silver|platinum))\b")
        .expect("invalid metal colour regex")
});

static GEMSTONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = GEMSTONES
        .iter()
        .map(|g| match g.strip_suffix('y') {
            Some(stem) => format!("{stem}(?:y|ies)"),
            None => format!("{g}(?:s|es)?"),
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b({alternatives})\b")).expect("invalid gemstone regex")
});

/// Singular stone name for a regex hit ("rubies" -> "ruby", "topazes" -> "topaz").
fn singular_gemstone(hit: &str) -> String {
    GEMSTONES
        .iter()
        .find(|g| {
            hit.starts_with(g.strip_suffix('y').unwrap_or(g))
        })
        .map(|g| g.to_string())
        .unwrap_or_else(|| hit.to_string())
}

static NUMBER_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\b",
    )
    .expect("invalid number token regex")
});

static CHAIN_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+|one|single|two|double|three|triple|four|five|six|seven|eight|nine|ten|eleven|twelve)[\s-]+(?:(?:layered|delicate|thin|fine|separate|interlinked|parallel)\s+)?(?:chains?|strands?)\b",
    )
    .expect("invalid chain count regex")
});

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    Critical,
    Warning,
}

/// One compared attribute category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub element: String,
    pub view1: String,
    pub view2: String,
    pub matches: bool,
    pub severity: CheckSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyValidation {
    pub is_consistent: bool,
    /// 0 – 100
    pub consistency_score: u8,
    pub checks: Vec<ConsistencyCheck>,
    pub critical_issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Attributes extracted from a single revised prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewAttributes {
    pub metal_colors: BTreeSet<String>,
    pub metal_types: BTreeSet<String>,
    pub gemstones: BTreeSet<String>,
    /// Sorted, duplicates kept: "two stones and two chains" ≠ "two stones".
    pub numbers: Vec<u32>,
    pub custom_text: BTreeSet<String>,
    pub chain_count: Option<u32>,
    pub color_adjectives: BTreeSet<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

fn number_value(token: &str) -> Option<u32> {
    token.parse::<u32>().ok().or_else(|| {
        NUMBER_WORDS
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, n)| *n)
    })
}

/// Metal colour phrases ("rose gold", "silver", ...) mentioned in `text`.
pub fn extract_metal_colors(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    METAL_COLOR_RE
        .captures_iter(&lower)
        .map(|cap| match (cap.get(1), cap.get(2)) {
            (Some(tone), _) => format!("{} gold", tone.as_str()),
            (None, Some(metal)) => metal.as_str().to_string(),
            (None, None) => String::new(),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Reduces one revised prompt to its comparable attributes.
pub fn extract_view_attributes(text: &str) -> ViewAttributes {
    let lower = text.to_lowercase();

    let metal_types = METAL_TYPES
        .iter()
        .filter(|m| lower.contains(*m))
        .map(|m| m.to_string())
        .collect();

    let gemstones = GEMSTONE_RE
        .captures_iter(&lower)
        .map(|cap| singular_gemstone(&cap[1]))
        .collect();

    let mut numbers: Vec<u32> = NUMBER_TOKEN_RE
        .captures_iter(&lower)
        .filter_map(|cap| number_value(&cap[1]))
        .collect();
    numbers.sort_unstable();

    let custom_text = extract_quoted(text)
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();

    let chain_count = CHAIN_COUNT_RE
        .captures(&lower)
        .and_then(|cap| number_value(&cap[1]));

    let color_adjectives = COLOR_ADJECTIVES
        .iter()
        .filter(|c| lower.contains(*c))
        .map(|c| c.to_string())
        .collect();

    ViewAttributes {
        metal_colors: extract_metal_colors(text),
        metal_types,
        gemstones,
        numbers,
        custom_text,
        chain_count,
        color_adjectives,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Comparison
// ────────────────────────────────────────────────────────────────────────────

fn describe_set(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        "none".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn describe_numbers(numbers: &[u32]) -> String {
    if numbers.is_empty() {
        "none".to_string()
    } else {
        numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn describe_count(count: Option<u32>) -> String {
    count.map_or_else(|| "unspecified".to_string(), |c| c.to_string())
}

fn set_check(
    element: &str,
    a: &BTreeSet<String>,
    b: &BTreeSet<String>,
    severity: CheckSeverity,
) -> ConsistencyCheck {
    ConsistencyCheck {
        element: element.to_string(),
        view1: describe_set(a),
        view2: describe_set(b),
        matches: a == b,
        severity,
    }
}

/// Compares two revised prompts for the same design, plus the user's original vision.
///
/// Custom text quoted in `user_vision` must appear in both views; each such
/// phrase adds one critical check.
pub fn validate_consistency(
    view1_prompt: &str,
    view2_prompt: &str,
    user_vision: &str,
) -> ConsistencyValidation {
    let v1 = extract_view_attributes(view1_prompt);
    let v2 = extract_view_attributes(view2_prompt);

    let mut checks = vec![
        set_check(
            "metal color",
            &v1.metal_colors,
            &v2.metal_colors,
            CheckSeverity::Critical,
        ),
        set_check(
            "custom text",
            &v1.custom_text,
            &v2.custom_text,
            CheckSeverity::Critical,
        ),
        ConsistencyCheck {
            element: "chain count".to_string(),
            view1: describe_count(v1.chain_count),
            view2: describe_count(v2.chain_count),
            matches: v1.chain_count == v2.chain_count,
            severity: CheckSeverity::Critical,
        },
        set_check(
            "gemstone types",
            &v1.gemstones,
            &v2.gemstones,
            CheckSeverity::Critical,
        ),
        set_check(
            "metal type",
            &v1.metal_types,
            &v2.metal_types,
            CheckSeverity::Warning,
        ),
        set_check(
            "color adjectives",
            &v1.color_adjectives,
            &v2.color_adjectives,
            CheckSeverity::Warning,
        ),
        ConsistencyCheck {
            element: "numeric details".to_string(),
            view1: describe_numbers(&v1.numbers),
            view2: describe_numbers(&v2.numbers),
            matches: v1.numbers == v2.numbers,
            severity: CheckSeverity::Warning,
        },
    ];

    let view1_lower = view1_prompt.to_lowercase();
    let view2_lower = view2_prompt.to_lowercase();
    for phrase in extract_quoted(user_vision) {
        let needle = phrase.to_lowercase();
        let in1 = view1_lower.contains(&needle);
        let in2 = view2_lower.contains(&needle);
        checks.push(ConsistencyCheck {
            element: format!("requested text \"{phrase}\""),
            view1: if in1 { "present" } else { "missing" }.to_string(),
            view2: if in2 { "present" } else { "missing" }.to_string(),
            matches: in1 && in2,
            severity: CheckSeverity::Critical,
        });
    }

    summarize(checks)
}

fn summarize(checks: Vec<ConsistencyCheck>) -> ConsistencyValidation {
    let mut critical_issues = Vec::new();
    let mut warnings = Vec::new();

    for check in checks.iter().filter(|c| !c.matches) {
        let message = format!(
            "{} differs between views: view 1 has {}, view 2 has {}",
            check.element, check.view1, check.view2
        );
        match check.severity {
            CheckSeverity::Critical => critical_issues.push(message),
            CheckSeverity::Warning => warnings.push(message),
        }
    }

    let critical_total = checks
        .iter()
        .filter(|c| c.severity == CheckSeverity::Critical)
        .count();
    let critical_passed = checks
        .iter()
        .filter(|c| c.severity == CheckSeverity::Critical && c.matches)
        .count();
    let overall_passed = checks.iter().filter(|c| c.matches).count();

    let critical_rate = pass_rate(critical_passed, critical_total);
    let overall_rate = pass_rate(overall_passed, checks.len());
    let score = (CRITICAL_WEIGHT * critical_rate + OVERALL_WEIGHT * overall_rate).round();

    ConsistencyValidation {
        is_consistent: critical_issues.is_empty(),
        consistency_score: score.clamp(0.0, 100.0) as u8,
        checks,
        critical_issues,
        warnings,
    }
}

fn pass_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        passed as f64 / total as f64
    }
}
