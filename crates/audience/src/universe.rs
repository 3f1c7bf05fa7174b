//! Universe definition — the subset of the population eligible for
//! segmentation.

use tracing::info;

use retention_core::config::UniverseConfig;
use retention_core::types::UserRecord;

/// Filter the population down to members who abandoned a cart inside the
/// configured window. An empty result is reported by the threshold
/// calculator, which refuses to run over an empty Universe.
pub fn define_universe(population: &[UserRecord], config: &UniverseConfig) -> Vec<UserRecord> {
    let universe: Vec<UserRecord> = population
        .iter()
        .filter(|u| u.cart_abandon_days_ago <= config.abandon_window_days)
        .cloned()
        .collect();

    info!(
        population = population.len(),
        universe = universe.len(),
        window_days = config.abandon_window_days,
        "universe defined"
    );
    universe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: usize, abandon_days: u32) -> UserRecord {
        UserRecord {
            user_id: format!("user_{id:05}"),
            cart_abandon_days_ago: abandon_days,
            days_since_last_order: Some(12),
            avg_order_value: 120.0,
            sessions_last_30d: 4,
            num_cart_items: 2,
            engagement_score: 0.5,
            profitability_score: 0.5,
        }
    }

    #[test]
    fn test_window_is_inclusive() {
        let population: Vec<UserRecord> = (0..10).map(|i| user(i, i as u32)).collect();
        let universe = define_universe(&population, &UniverseConfig::default());
        assert_eq!(universe.len(), 8); // days 0..=7
        assert!(universe.iter().all(|u| u.cart_abandon_days_ago <= 7));
    }

    #[test]
    fn test_out_of_window_population_yields_empty_universe() {
        let population: Vec<UserRecord> = (0..10).map(|i| user(i, 30)).collect();
        let universe = define_universe(&population, &UniverseConfig::default());
        assert!(universe.is_empty());
    }
}
