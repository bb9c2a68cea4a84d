//! Pricing Estimator: turns parsed specs into a cost breakdown.
//!
//! Metal prices come from a pluggable `SpotPriceSource` (carried in `AppState` as
//! `Arc<dyn SpotPriceSource>`). Every other input is a static table, so for a given
//! set of specs and spot prices the result is fully deterministic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::design::specs::{Complexity, GemstoneType, JewelrySpecs, JewelryType, Material, Size};
use crate::errors::AppError;

pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;
pub const LABOR_RATE_PER_HOUR: f64 = 75.0;
pub const RETAIL_MARKUP: f64 = 2.2;
pub const PEARL_UNIT_COST: f64 = 25.0;

const SILVER_PURITY: f64 = 0.925;
const PLATINUM_PURITY: f64 = 0.95;

// ────────────────────────────────────────────────────────────────────────────
// Spot prices
// ────────────────────────────────────────────────────────────────────────────

/// Metal prices in USD per troy ounce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotPrices {
    pub gold: f64,
    pub silver: f64,
    pub platinum: f64,
}

impl Default for SpotPrices {
    fn default() -> Self {
        Self {
            gold: 2000.0,
            silver: 25.0,
            platinum: 950.0,
        }
    }
}

impl SpotPrices {
    pub fn per_ounce(&self, material: Material) -> f64 {
        match material {
            Material::Gold => self.gold,
            Material::Silver => self.silver,
            Material::Platinum => self.platinum,
        }
    }
}

/// Where metal prices come from. Swap the implementation without touching callers.
#[async_trait]
pub trait SpotPriceSource: Send + Sync {
    async fn fetch(&self) -> Result<SpotPrices, AppError>;
}

/// Fixed mocked prices. The default source; there is no live market feed.
pub struct StaticSpotPrices(pub SpotPrices);

impl Default for StaticSpotPrices {
    fn default() -> Self {
        Self(SpotPrices::default())
    }
}

#[async_trait]
impl SpotPriceSource for StaticSpotPrices {
    async fn fetch(&self) -> Result<SpotPrices, AppError> {
        Ok(self.0)
    }
}

/// Fetches spot prices, falling back to the static defaults if the source fails.
/// Returns the prices and whether the fallback was used.
pub async fn resolve_spot_prices(source: &dyn SpotPriceSource) -> (SpotPrices, bool) {
    match source.fetch().await {
        Ok(prices) => (prices, false),
        Err(e) => {
            warn!("Spot price fetch failed, using static defaults: {e}");
            (SpotPrices::default(), true)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

/// Intermediate figures behind the totals, returned for transparency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceDetail {
    pub metal_weight_grams: f64,
    pub metal_price_per_gram: f64,
    pub metal_purity: f64,
    pub labor_hours: f64,
    pub labor_rate: f64,
    pub gemstone_unit_price: Option<f64>,
    pub gemstone_units: Option<f64>,
    pub markup: f64,
    pub used_fallback_prices: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub material_cost: f64,
    pub labor_cost: f64,
    pub gemstone_cost: f64,
    pub subtotal: f64,
    pub margin: f64,
    pub final_price: f64,
    pub breakdown: PriceDetail,
}

// ────────────────────────────────────────────────────────────────────────────
// Tables
// ────────────────────────────────────────────────────────────────────────────

/// Base metal weight in grams.
fn base_weight_grams(jewelry_type: JewelryType, size: Size) -> f64 {
    match (jewelry_type, size) {
        (JewelryType::Ring, Size::Small) => 3.0,
        (JewelryType::Ring, Size::Medium) => 5.0,
        (JewelryType::Ring, Size::Large) => 8.0,
        (JewelryType::Necklace, Size::Small) => 8.0,
        (JewelryType::Necklace, Size::Medium) => 15.0,
        (JewelryType::Necklace, Size::Large) => 25.0,
        (JewelryType::Bracelet, Size::Small) => 10.0,
        (JewelryType::Bracelet, Size::Medium) => 18.0,
        (JewelryType::Bracelet, Size::Large) => 30.0,
        (JewelryType::Earrings, Size::Small) => 2.0,
        (JewelryType::Earrings, Size::Medium) => 4.0,
        (JewelryType::Earrings, Size::Large) => 7.0,
        (JewelryType::Pendant, Size::Small) => 2.0,
        (JewelryType::Pendant, Size::Medium) => 4.0,
        (JewelryType::Pendant, Size::Large) => 7.0,
    }
}

/// Bench hours before the complexity multiplier.
fn base_labor_hours(jewelry_type: JewelryType, complexity: Complexity) -> f64 {
    match (jewelry_type, complexity) {
        (JewelryType::Ring, Complexity::Simple) => 3.0,
        (JewelryType::Ring, Complexity::Moderate) => 5.0,
        (JewelryType::Ring, Complexity::Complex) => 9.0,
        (JewelryType::Necklace, Complexity::Simple) => 4.0,
        (JewelryType::Necklace, Complexity::Moderate) => 7.0,
        (JewelryType::Necklace, Complexity::Complex) => 12.0,
        (JewelryType::Bracelet, Complexity::Simple) => 4.0,
        (JewelryType::Bracelet, Complexity::Moderate) => 6.0,
        (JewelryType::Bracelet, Complexity::Complex) => 10.0,
        (JewelryType::Earrings, Complexity::Simple) => 3.0,
        (JewelryType::Earrings, Complexity::Moderate) => 5.0,
        (JewelryType::Earrings, Complexity::Complex) => 8.0,
        (JewelryType::Pendant, Complexity::Simple) => 2.0,
        (JewelryType::Pendant, Complexity::Moderate) => 4.0,
        (JewelryType::Pendant, Complexity::Complex) => 7.0,
    }
}

/// Ornate work takes disproportionately longer at the bench.
fn complexity_labor_multiplier(complexity: Complexity) -> f64 {
    match complexity {
        Complexity::Simple => 1.0,
        Complexity::Moderate => 1.3,
        Complexity::Complex => 1.7,
    }
}

pub fn gemstone_price_per_carat(gem: GemstoneType) -> f64 {
    match gem {
        GemstoneType::Diamond => 5000.0,
        GemstoneType::Sapphire => 1000.0,
        GemstoneType::Ruby => 1500.0,
        GemstoneType::Emerald => 1200.0,
        GemstoneType::Pearl => 300.0,
        GemstoneType::Amethyst => 50.0,
        GemstoneType::Topaz => 40.0,
        GemstoneType::Opal => 150.0,
        GemstoneType::Aquamarine => 200.0,
    }
}

/// Strand length in pearls for a pearl necklace.
fn pearl_count(size: Size) -> f64 {
    match size {
        Size::Small => 30.0,
        Size::Medium => 45.0,
        Size::Large => 60.0,
    }
}

fn metal_purity(specs: &JewelrySpecs) -> f64 {
    match specs.material {
        Material::Gold => f64::from(specs.karat.unwrap_or(14)) / 24.0,
        Material::Silver => SILVER_PURITY,
        Material::Platinum => PLATINUM_PURITY,
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ────────────────────────────────────────────────────────────────────────────
// Estimation
// ────────────────────────────────────────────────────────────────────────────

/// Computes the full cost breakdown for parsed specs at the given spot prices.
pub fn calculate_jewelry_price(specs: &JewelrySpecs, spot: &SpotPrices) -> PricingBreakdown {
    let weight = base_weight_grams(specs.jewelry_type, specs.size);
    let price_per_gram = spot.per_ounce(specs.material) / GRAMS_PER_TROY_OUNCE;
    let purity = metal_purity(specs);
    let material_cost = weight * price_per_gram * purity;

    let labor_hours = base_labor_hours(specs.jewelry_type, specs.complexity)
        * complexity_labor_multiplier(specs.complexity);
    let labor_cost = labor_hours * LABOR_RATE_PER_HOUR;

    let (gemstone_cost, unit_price, units) = match (specs.gemstone_type, specs.has_gemstones) {
        (Some(GemstoneType::Pearl), true) if specs.jewelry_type == JewelryType::Necklace => {
            let count = pearl_count(specs.size);
            (count * PEARL_UNIT_COST, Some(PEARL_UNIT_COST), Some(count))
        }
        (Some(gem), true) => {
            let carat = specs.gemstone_carat.unwrap_or(0.0).max(0.0);
            let per_carat = gemstone_price_per_carat(gem);
            (carat * per_carat, Some(per_carat), Some(carat))
        }
        _ => (0.0, None, None),
    };

    let subtotal = material_cost + labor_cost + gemstone_cost;
    let final_price = subtotal * RETAIL_MARKUP;

    PricingBreakdown {
        material_cost: round_cents(material_cost),
        labor_cost: round_cents(labor_cost),
        gemstone_cost: round_cents(gemstone_cost),
        subtotal: round_cents(subtotal),
        margin: round_cents(final_price - subtotal),
        final_price: round_cents(final_price),
        breakdown: PriceDetail {
            metal_weight_grams: round_cents(weight),
            metal_price_per_gram: round_cents(price_per_gram),
            metal_purity: purity,
            labor_hours,
            labor_rate: LABOR_RATE_PER_HOUR,
            gemstone_unit_price: unit_price,
            gemstone_units: units,
            markup: RETAIL_MARKUP,
            used_fallback_prices: false,
        },
    }
}

/// Resolves spot prices from `source` and prices `specs`, recording whether the fallback was hit.
pub async fn estimate_price(specs: &JewelrySpecs, source: &dyn SpotPriceSource) -> PricingBreakdown {
    let (spot, used_fallback) = resolve_spot_prices(source).await;
    let mut pricing = calculate_jewelry_price(specs, &spot);
    pricing.breakdown.used_fallback_prices = used_fallback;
    pricing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::specs::parse_jewelry_specs;

    struct FailingSource;

    #[async_trait]
    impl SpotPriceSource for FailingSource {
        async fn fetch(&self) -> Result<SpotPrices, AppError> {
            Err(AppError::Internal(anyhow::anyhow!("price feed offline")))
        }
    }

    #[test]
    fn test_markup_is_2_2x_subtotal() {
        let specs = parse_jewelry_specs("14k gold ring with 1 carat diamond");
        let p = calculate_jewelry_price(&specs, &SpotPrices::default());
        assert!((p.final_price - p.subtotal * RETAIL_MARKUP).abs() < 0.05);
        assert!((p.margin - (p.final_price - p.subtotal)).abs() < 0.05);
    }

    #[test]
    fn test_diamond_cost_is_carat_times_table() {
        let specs = parse_jewelry_specs("14k gold ring with 1 carat diamond");
        let p = calculate_jewelry_price(&specs, &SpotPrices::default());
        assert_eq!(p.gemstone_cost, 5000.0);
        assert_eq!(p.breakdown.gemstone_units, Some(1.0));
    }

    #[test]
    fn test_monotonic_in_gemstone_carat() {
        let mut specs = parse_jewelry_specs("platinum ring with sapphire");
        let spot = SpotPrices::default();
        let mut last = 0.0;
        for carat in [0.1, 0.5, 1.0, 1.5, 2.0, 3.5, 10.0] {
            specs.gemstone_carat = Some(carat);
            let price = calculate_jewelry_price(&specs, &spot).final_price;
            assert!(price >= last, "carat {carat} priced {price} < {last}");
            last = price;
        }
    }

    #[test]
    fn test_pearl_necklace_uses_strand_count() {
        let specs = parse_jewelry_specs("classic pearl necklace");
        let p = calculate_jewelry_price(&specs, &SpotPrices::default());
        assert_eq!(p.breakdown.gemstone_units, Some(45.0));
        assert_eq!(p.gemstone_cost, 45.0 * PEARL_UNIT_COST);
    }

    #[test]
    fn test_no_gemstone_zero_gem_cost() {
        let specs = parse_jewelry_specs("simple silver band");
        let p = calculate_jewelry_price(&specs, &SpotPrices::default());
        assert_eq!(p.gemstone_cost, 0.0);
        assert!(p.breakdown.gemstone_unit_price.is_none());
    }

    #[test]
    fn test_higher_karat_costs_more_metal() {
        let spot = SpotPrices::default();
        let k14 = calculate_jewelry_price(&parse_jewelry_specs("14k gold ring"), &spot);
        let k18 = calculate_jewelry_price(&parse_jewelry_specs("18k gold ring"), &spot);
        assert!(k18.material_cost > k14.material_cost);
    }

    #[test]
    fn test_material_cost_uses_per_gram_conversion() {
        // medium ring: 5g; 2000/31.1035 per gram; 14/24 purity
        let specs = parse_jewelry_specs("14k gold ring");
        let p = calculate_jewelry_price(&specs, &SpotPrices::default());
        let expected = 5.0 * (2000.0 / GRAMS_PER_TROY_OUNCE) * (14.0 / 24.0);
        assert!((p.material_cost - expected).abs() < 0.01);
    }

    #[test]
    fn test_complex_ring_labor_hours() {
        // complex ring: 9 bench hours * 1.7; size only moves the weight table
        let specs = parse_jewelry_specs("intricate 14k gold ring");
        assert_eq!(specs.complexity, Complexity::Complex);
        let p = calculate_jewelry_price(&specs, &SpotPrices::default());
        assert!((p.breakdown.labor_hours - 15.3).abs() < 1e-9);
        assert!((p.labor_cost - 15.3 * LABOR_RATE_PER_HOUR).abs() < 0.01);
        assert_eq!(p.breakdown.metal_weight_grams, 5.0);
    }

    #[test]
    fn test_size_changes_weight_not_labor() {
        let spot = SpotPrices::default();
        let small = calculate_jewelry_price(&parse_jewelry_specs("dainty gold ring"), &spot);
        let large = calculate_jewelry_price(&parse_jewelry_specs("chunky gold ring"), &spot);
        assert_eq!(small.breakdown.metal_weight_grams, 3.0);
        assert_eq!(large.breakdown.metal_weight_grams, 8.0);
    }

    #[tokio::test]
    async fn test_static_source_no_fallback() {
        let specs = parse_jewelry_specs("gold pendant");
        let p = estimate_price(&specs, &StaticSpotPrices::default()).await;
        assert!(!p.breakdown.used_fallback_prices);
    }

    #[tokio::test]
    async fn test_failing_source_falls_back_to_defaults() {
        let specs = parse_jewelry_specs("gold pendant");
        let p = estimate_price(&specs, &FailingSource).await;
        assert!(p.breakdown.used_fallback_prices);
        let expected = calculate_jewelry_price(&specs, &SpotPrices::default());
        assert_eq!(p.final_price, expected.final_price);
    }
}
