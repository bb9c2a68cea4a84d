pub mod consistency;
pub mod custom_text;
pub mod fingerprint;
pub mod generator;
pub mod handlers;
pub mod manufacturing;
pub mod pricing;
pub mod prompts;
pub mod specs;
