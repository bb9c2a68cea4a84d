//! Jewelry Attribute Parser: keyword extraction of jewelry attributes from a free-text prompt.
//!
//! Pure substring matching against fixed keyword tables. First match wins,
//! and every attribute has a default, so parsing never fails (it can only be wrong).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JewelryType {
    Ring,
    Necklace,
    Bracelet,
    Earrings,
    Pendant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Gold,
    Silver,
    Platinum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GemstoneType {
    Diamond,
    Sapphire,
    Ruby,
    Emerald,
    Pearl,
    Amethyst,
    Topaz,
    Opal,
    Aquamarine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    Small,
    Medium,
    Large,
}

/// Attributes recovered from one prompt. Recreated on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JewelrySpecs {
    pub jewelry_type: JewelryType,
    pub material: Material,
    pub karat: Option<u8>,
    pub has_gemstones: bool,
    pub gemstone_carat: Option<f64>,
    pub gemstone_type: Option<GemstoneType>,
    pub complexity: Complexity,
    pub size: Size,
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword tables (checked in order; first hit wins)
// ────────────────────────────────────────────────────────────────────────────

// Matched as whole words (optionally plural), so "studded" is not "stud"
// and "earrings" is not "ring".
const TYPE_KEYWORDS: &[(JewelryType, &[&str])] = &[
    (JewelryType::Necklace, &["necklace", "chain", "choker"]),
    (JewelryType::Pendant, &["pendant", "locket"]),
    (JewelryType::Bracelet, &["bracelet", "bangle", "cuff"]),
    (JewelryType::Earrings, &["earring", "stud", "hoop"]),
    (JewelryType::Ring, &["ring", "band"]),
];

const MATERIAL_KEYWORDS: &[(Material, &[&str])] = &[
    (Material::Platinum, &["platinum"]),
    (Material::Gold, &["gold"]),
    (Material::Silver, &["silver", "sterling"]),
];

pub const GEMSTONE_KEYWORDS: &[(GemstoneType, &str)] = &[
    (GemstoneType::Diamond, "diamond"),
    (GemstoneType::Sapphire, "sapphire"),
    (GemstoneType::Ruby, "ruby"),
    (GemstoneType::Emerald, "emerald"),
    (GemstoneType::Pearl, "pearl"),
    (GemstoneType::Amethyst, "amethyst"),
    (GemstoneType::Topaz, "topaz"),
    (GemstoneType::Opal, "opal"),
    (GemstoneType::Aquamarine, "aquamarine"),
];

const COMPLEX_KEYWORDS: &[&str] = &["intricate", "ornate", "filigree", "detailed"];
const SIMPLE_KEYWORDS: &[&str] = &["simple", "minimal", "plain", "classic"];

const SMALL_KEYWORDS: &[&str] = &["delicate", "dainty", "thin", "small"];
const LARGE_KEYWORDS: &[&str] = &["statement", "chunky", "bold", "large"];

const VALID_KARATS: &[u8] = &[10, 14, 18, 22, 24];
const DEFAULT_KARAT: u8 = 14;
const DEFAULT_CARAT: f64 = 1.0;
const DEFAULT_PEARL_CARAT: f64 = 0.5;

static KARAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s*(?:k|kt|karat)\b").expect("invalid karat regex"));

static CARAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:\.\d+)?)\s*(?:ct|cts|carats?)\b").expect("invalid carat regex")
});

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

/// Extracts jewelry attributes from a free-text prompt. Always returns a complete set of specs.
pub fn parse_jewelry_specs(prompt: &str) -> JewelrySpecs {
    let text = prompt.to_lowercase();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let jewelry_type = TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| has_word(&words, k)))
        .map(|(t, _)| *t)
        .unwrap_or(JewelryType::Ring);

    let material = MATERIAL_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(m, _)| *m)
        .unwrap_or(Material::Gold);

    let karat = match material {
        Material::Gold => Some(parse_karat(&text)),
        _ => None,
    };

    let gemstone_type = GEMSTONE_KEYWORDS
        .iter()
        .find(|(_, word)| text.contains(word))
        .map(|(g, _)| *g);

    let gemstone_carat = gemstone_type.map(|gem| {
        CARAT_RE
            .captures(&text)
            .and_then(|c| c[1].parse::<f64>().ok())
            .filter(|c| *c > 0.0)
            .unwrap_or(match gem {
                GemstoneType::Pearl => DEFAULT_PEARL_CARAT,
                _ => DEFAULT_CARAT,
            })
    });

    let complexity = if COMPLEX_KEYWORDS.iter().any(|w| text.contains(w)) {
        Complexity::Complex
    } else if SIMPLE_KEYWORDS.iter().any(|w| text.contains(w)) {
        Complexity::Simple
    } else {
        Complexity::Moderate
    };

    let size = if SMALL_KEYWORDS.iter().any(|w| text.contains(w)) {
        Size::Small
    } else if LARGE_KEYWORDS.iter().any(|w| text.contains(w)) {
        Size::Large
    } else {
        Size::Medium
    };

    JewelrySpecs {
        jewelry_type,
        material,
        karat,
        has_gemstones: gemstone_type.is_some(),
        gemstone_carat,
        gemstone_type,
        complexity,
        size,
    }
}

fn has_word(words: &[&str], keyword: &str) -> bool {
    words
        .iter()
        .any(|w| *w == keyword || w.strip_suffix('s') == Some(keyword))
}

fn parse_karat(text: &str) -> u8 {
    KARAT_RE
        .captures(text)
        .and_then(|c| c[1].parse::<u8>().ok())
        .filter(|k| VALID_KARATS.contains(k))
        .unwrap_or(DEFAULT_KARAT)
}

impl JewelryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JewelryType::Ring => "ring",
            JewelryType::Necklace => "necklace",
            JewelryType::Bracelet => "bracelet",
            JewelryType::Earrings => "earrings",
            JewelryType::Pendant => "pendant",
        }
    }
}

impl Material {
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Gold => "gold",
            Material::Silver => "silver",
            Material::Platinum => "platinum",
        }
    }
}

impl GemstoneType {
    pub fn as_str(&self) -> &'static str {
        GEMSTONE_KEYWORDS
            .iter()
            .find(|(g, _)| g == self)
            .map(|(_, word)| *word)
            .unwrap_or("gemstone")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gold_ring_with_diamond() {
        let specs = parse_jewelry_specs("14k gold ring with 1 carat diamond");
        assert_eq!(specs.jewelry_type, JewelryType::Ring);
        assert_eq!(specs.material, Material::Gold);
        assert_eq!(specs.karat, Some(14));
        assert!(specs.has_gemstones);
        assert_eq!(specs.gemstone_type, Some(GemstoneType::Diamond));
        assert_eq!(specs.gemstone_carat, Some(1.0));
    }

    #[test]
    fn test_defaults_when_nothing_matches() {
        let specs = parse_jewelry_specs("a lovely gift for my mother");
        assert_eq!(specs.jewelry_type, JewelryType::Ring);
        assert_eq!(specs.material, Material::Gold);
        assert_eq!(specs.karat, Some(14));
        assert!(!specs.has_gemstones);
        assert_eq!(specs.gemstone_carat, None);
        assert_eq!(specs.complexity, Complexity::Moderate);
        assert_eq!(specs.size, Size::Medium);
    }

    #[test]
    fn test_earrings_win_over_ring_substring() {
        let specs = parse_jewelry_specs("Pair of sapphire earrings");
        assert_eq!(specs.jewelry_type, JewelryType::Earrings);
        assert_eq!(specs.gemstone_type, Some(GemstoneType::Sapphire));
    }

    #[test]
    fn test_studded_ring_is_a_ring() {
        let specs = parse_jewelry_specs("diamond-studded 14k gold ring");
        assert_eq!(specs.jewelry_type, JewelryType::Ring);
        assert_eq!(parse_jewelry_specs("pearl studs").jewelry_type, JewelryType::Earrings);
    }

    #[test]
    fn test_type_keywords_match_whole_words() {
        assert_eq!(
            parse_jewelry_specs("gold bangles for my husband").jewelry_type,
            JewelryType::Bracelet
        );
        assert_eq!(
            parse_jewelry_specs("matching silver bands").jewelry_type,
            JewelryType::Ring
        );
        assert_eq!(
            parse_jewelry_specs("a wedding ring for my husband").jewelry_type,
            JewelryType::Ring
        );
    }

    #[test]
    fn test_platinum_has_no_karat() {
        let specs = parse_jewelry_specs("Platinum band, simple and plain");
        assert_eq!(specs.material, Material::Platinum);
        assert_eq!(specs.karat, None);
        assert_eq!(specs.complexity, Complexity::Simple);
    }

    #[test]
    fn test_invalid_karat_falls_back() {
        let specs = parse_jewelry_specs("a 15k gold pendant");
        assert_eq!(specs.karat, Some(14));
        assert_eq!(specs.jewelry_type, JewelryType::Pendant);
    }

    #[test]
    fn test_18_karat_spelled_out() {
        let specs = parse_jewelry_specs("an 18 karat yellow gold bracelet");
        assert_eq!(specs.karat, Some(18));
        assert_eq!(specs.jewelry_type, JewelryType::Bracelet);
    }

    #[test]
    fn test_explicit_carat_captured() {
        let specs = parse_jewelry_specs("ring with a 2.5ct emerald");
        assert_eq!(specs.gemstone_carat, Some(2.5));
        assert_eq!(specs.gemstone_type, Some(GemstoneType::Emerald));
    }

    #[test]
    fn test_pearl_default_carat() {
        let specs = parse_jewelry_specs("sterling pearl necklace");
        assert_eq!(specs.material, Material::Silver);
        assert_eq!(specs.jewelry_type, JewelryType::Necklace);
        assert_eq!(specs.gemstone_carat, Some(0.5));
    }

    #[test]
    fn test_complex_wins_over_simple() {
        let specs = parse_jewelry_specs("classic but intricate filigree cuff");
        assert_eq!(specs.complexity, Complexity::Complex);
    }

    #[test]
    fn test_size_keywords() {
        assert_eq!(parse_jewelry_specs("dainty chain").size, Size::Small);
        assert_eq!(parse_jewelry_specs("chunky statement bangle").size, Size::Large);
    }

    #[test]
    fn test_specs_serialize_snake_case() {
        let specs = parse_jewelry_specs("rose gold ring");
        let json = serde_json::to_value(&specs).unwrap();
        assert_eq!(json["jewelry_type"], "ring");
        assert_eq!(json["material"], "gold");
    }
}
