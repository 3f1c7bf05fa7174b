//! Synthetic cart-abandonment population generator.
//!
//! Produces a reproducible mock dataset with business-realistic structure:
//! log-normal order values, engagement correlated with spend, profitability
//! correlated with both, and a long-tailed order-recency distribution with a
//! never-ordered tail. Seeded so identical configs yield identical
//! populations; all randomness in the system lives here, never in the
//! segmentation core.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use retention_core::config::GeneratorConfig;
use retention_core::types::UserRecord;

/// Abandon recency is uniform over the last `ABANDON_SPREAD_DAYS` days, so a
/// 7-day Universe window leaves a realistic out-of-window remainder.
const ABANDON_SPREAD_DAYS: u32 = 10;

/// Order-recency values at or past this many days mean "never ordered".
const NEVER_ORDERED_CUTOFF: f64 = 365.0;

pub struct PopulationGenerator {
    users: usize,
    seed: u64,
}

impl PopulationGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            users: config.users,
            seed: config.seed,
        }
    }

    /// Generate the full population.
    pub fn generate(&self) -> Vec<UserRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let population: Vec<UserRecord> = (0..self.users)
            .map(|i| {
                // Log-normal AOV clipped to a plausible retail range.
                let aov = (6.5 + 1.2 * standard_normal(&mut rng))
                    .exp()
                    .clamp(10.0, 10_000.0);

                // Engagement tracks log-spend with noise.
                let engagement = ((aov.ln() - 3.0) / 5.0 + 0.3 * standard_normal(&mut rng))
                    .clamp(0.0, 1.0);

                // Profitability tracks both engagement and spend.
                let profitability = (engagement * 0.6
                    + aov.ln() / 10.0
                    + 0.2 * standard_normal(&mut rng))
                .clamp(0.0, 1.0);

                let days_since_order = exponential(&mut rng, 30.0);
                let days_since_last_order = if days_since_order >= NEVER_ORDERED_CUTOFF {
                    None
                } else {
                    Some(days_since_order as u32)
                };

                UserRecord {
                    user_id: format!("user_{i:05}"),
                    cart_abandon_days_ago: rng.gen_range(0..ABANDON_SPREAD_DAYS),
                    days_since_last_order,
                    avg_order_value: (aov * 100.0).round() / 100.0,
                    sessions_last_30d: poisson(&mut rng, 8.0),
                    num_cart_items: poisson(&mut rng, 3.0) + 1,
                    engagement_score: (engagement * 1000.0).round() / 1000.0,
                    profitability_score: (profitability * 1000.0).round() / 1000.0,
                }
            })
            .collect();

        info!(
            users = population.len(),
            seed = self.seed,
            "synthetic population generated"
        );
        population
    }
}

/// Standard normal via Box-Muller.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Exponential with the given scale (mean) via inverse transform.
fn exponential<R: Rng>(rng: &mut R, scale: f64) -> f64 {
    let u: f64 = rng.gen::<f64>().max(1e-15);
    -scale * u.ln()
}

/// Poisson sample via Knuth's product-of-uniforms method. Fine for the
/// small lambdas used here.
fn poisson<R: Rng>(rng: &mut R, lambda: f64) -> u32 {
    let limit = (-lambda).exp();
    let mut k = 0u32;
    let mut product: f64 = rng.gen();
    while product > limit {
        k += 1;
        product *= rng.gen::<f64>();
    }
    k
}
