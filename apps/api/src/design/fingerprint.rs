//! Design fingerprint: one identifier plus the derived attributes of a prompt,
//! shared by every view generated for it so the renders depict the same piece.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::design::consistency::extract_metal_colors;
use crate::design::custom_text::{extract_custom_elements, DesignElements};
use crate::design::specs::{parse_jewelry_specs, Complexity, JewelrySpecs, Material, Size};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignFingerprint {
    pub id: Uuid,
    pub specs: JewelrySpecs,
    pub elements: DesignElements,
    pub metal_color: Option<String>,
    /// Attribute sentence repeated verbatim in each view prompt.
    pub canonical_description: String,
}

impl DesignFingerprint {
    pub fn from_prompt(prompt: &str) -> Self {
        let specs = parse_jewelry_specs(prompt);
        let elements = extract_custom_elements(prompt);
        let metal_color = extract_metal_colors(prompt).into_iter().next();
        let canonical_description = describe(&specs, metal_color.as_deref(), &elements);

        Self {
            id: Uuid::new_v4(),
            specs,
            elements,
            metal_color,
            canonical_description,
        }
    }
}

fn describe(specs: &JewelrySpecs, metal_color: Option<&str>, elements: &DesignElements) -> String {
    let size = match specs.size {
        Size::Small => "delicate",
        Size::Medium => "medium-sized",
        Size::Large => "statement",
    };

    let metal = match (specs.material, metal_color, specs.karat) {
        (Material::Gold, Some(color), Some(k)) if color.ends_with("gold") => format!("{k}k {color}"),
        (Material::Gold, _, Some(k)) => format!("{k}k yellow gold"),
        (material, _, _) => material.as_str().to_string(),
    };

    let detailing = match specs.complexity {
        Complexity::Simple => "clean minimal detailing",
        Complexity::Moderate => "balanced detailing",
        Complexity::Complex => "intricate detailing",
    };

    let mut parts = vec![format!(
        "a {size} {metal} {} with {detailing}",
        specs.jewelry_type.as_str()
    )];

    if let (Some(gem), Some(carat)) = (specs.gemstone_type, specs.gemstone_carat) {
        parts.push(format!("featuring a {carat} carat {}", gem.as_str()));
    }

    for text in &elements.custom_text {
        parts.push(format!("bearing the exact text \"{text}\""));
    }

    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_carries_metal_color_and_stone() {
        let fp = DesignFingerprint::from_prompt("18k rose gold ring with 1 carat diamond");
        assert_eq!(fp.metal_color.as_deref(), Some("rose gold"));
        assert!(fp.canonical_description.contains("18k rose gold ring"));
        assert!(fp.canonical_description.contains("1 carat diamond"));
    }

    #[test]
    fn test_fingerprint_repeats_custom_text() {
        let fp = DesignFingerprint::from_prompt("silver pendant engraved \"Luna\"");
        assert!(fp.canonical_description.contains("\"Luna\""));
        assert!(fp.canonical_description.contains("silver pendant"));
    }

    #[test]
    fn test_fingerprints_have_distinct_ids() {
        let a = DesignFingerprint::from_prompt("gold ring");
        let b = DesignFingerprint::from_prompt("gold ring");
        assert_ne!(a.id, b.id);
        assert_eq!(a.canonical_description, b.canonical_description);
    }
}
