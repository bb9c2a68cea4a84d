// Prompt constants and builders for design generation.
// Image prompts go to DALL-E 3; the specification prompt goes to GPT-4o.

use serde::{Deserialize, Serialize};

use crate::design::fingerprint::DesignFingerprint;

/// Camera angles, rendered in this order. Requests for N views take the first N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewAngle {
    Front,
    Side,
    Top,
    Detail,
}

pub const VIEW_ORDER: [ViewAngle; 4] = [
    ViewAngle::Front,
    ViewAngle::Side,
    ViewAngle::Top,
    ViewAngle::Detail,
];

impl ViewAngle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewAngle::Front => "front",
            ViewAngle::Side => "side",
            ViewAngle::Top => "top",
            ViewAngle::Detail => "detail",
        }
    }

    fn camera(&self) -> &'static str {
        match self {
            ViewAngle::Front => "front view, centered, straight-on at eye level",
            ViewAngle::Side => "side profile view showing the setting height and band thickness",
            ViewAngle::Top => "top-down view looking directly onto the piece",
            ViewAngle::Detail => "macro close-up of the focal detail and any engraving",
        }
    }
}

/// Image prompt template. Replace `{camera}`, `{canonical}`, `{user_prompt}`.
pub const VIEW_PROMPT_TEMPLATE: &str = "Professional jewelry product photograph, {camera}. \
    The piece: {canonical}. \
    Customer request: {user_prompt} \
    Pure white seamless background, soft studio lighting, photorealistic, sharp focus. \
    This is one of several views of the exact same piece; keep metal color, stones, \
    proportions and any text identical.";

/// System prompt for manufacturing specification generation.
pub const SPEC_SYSTEM: &str = "You are a master bench jeweler and CAD technician. \
    Write concise manufacturing specifications a workshop can build from. \
    Use plain text with short labelled sections. \
    Never describe techniques that cannot be physically produced.";

/// Specification prompt template. Replace `{canonical}`, `{user_prompt}`, `{production_days}`.
pub const SPEC_PROMPT_TEMPLATE: &str = r#"Write manufacturing specifications for this custom piece.

Design summary: {canonical}
Customer request: {user_prompt}
Planned production time: {production_days} working days

Include these sections:
- Metal and alloy (karat, color, finish)
- Dimensions and estimated weight
- Stone setting (type, size, setting style), or "None"
- Engraving or custom text, reproduced exactly, or "None"
- Construction steps in order
- Quality checks before shipping"#;

/// Returned in place of specifications when the text model fails.
pub const SPEC_FALLBACK: &str = "Detailed manufacturing specifications are being prepared by \
    our design team and will be attached to your design within one business day.";

pub fn build_view_prompt(fingerprint: &DesignFingerprint, user_prompt: &str, view: ViewAngle) -> String {
    VIEW_PROMPT_TEMPLATE
        .replace("{camera}", view.camera())
        .replace("{canonical}", &fingerprint.canonical_description)
        .replace("{user_prompt}", user_prompt.trim())
}

pub fn build_spec_prompt(
    fingerprint: &DesignFingerprint,
    user_prompt: &str,
    production_days: u32,
) -> String {
    SPEC_PROMPT_TEMPLATE
        .replace("{canonical}", &fingerprint.canonical_description)
        .replace("{user_prompt}", user_prompt.trim())
        .replace("{production_days}", &production_days.to_string())
}
