//! Rule and predicate types for segment assignment.
//!
//! A rule set is an ordered list of named predicates, the last of which must
//! be the unconditional catch-all. Predicates compare user features against
//! percentile cut points, so the same rule set adapts to any Universe's
//! distribution.

use serde::{Deserialize, Serialize};

use retention_core::error::{RetentionError, RetentionResult};
use retention_core::types::{segment_names, Feature, UserRecord};

use crate::thresholds::ThresholdSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePredicate {
    /// feature >= cut(feature, percentile)
    FeatureAtLeast { feature: Feature, percentile: u8 },
    /// feature < cut(feature, percentile)
    FeatureBelow { feature: Feature, percentile: u8 },
    /// Last order placed within `days` days; never-ordered users never match.
    OrderedWithinDays { days: u32 },
    /// Conjunction of sub-predicates.
    All(Vec<RulePredicate>),
    /// Matches every remaining user. Only valid as the final rule.
    CatchAll,
}

impl RulePredicate {
    pub fn evaluate(&self, user: &UserRecord, thresholds: &ThresholdSet) -> bool {
        match self {
            Self::FeatureAtLeast {
                feature,
                percentile,
            } => thresholds
                .value(*feature, *percentile)
                .map_or(false, |cut| user.feature(*feature) >= cut),
            Self::FeatureBelow {
                feature,
                percentile,
            } => thresholds
                .value(*feature, *percentile)
                .map_or(false, |cut| user.feature(*feature) < cut),
            Self::OrderedWithinDays { days } => user
                .days_since_last_order
                .map_or(false, |since| since <= *days),
            Self::All(parts) => parts.iter().all(|p| p.evaluate(user, thresholds)),
            Self::CatchAll => true,
        }
    }

    /// Collect the (feature, percentile) pairs this predicate needs.
    fn collect_cuts(&self, out: &mut Vec<(Feature, u8)>) {
        match self {
            Self::FeatureAtLeast {
                feature,
                percentile,
            }
            | Self::FeatureBelow {
                feature,
                percentile,
            } => {
                if !out.contains(&(*feature, *percentile)) {
                    out.push((*feature, *percentile));
                }
            }
            Self::All(parts) => {
                for p in parts {
                    p.collect_cuts(out);
                }
            }
            Self::OrderedWithinDays { .. } | Self::CatchAll => {}
        }
    }

    /// Human-readable form with the resolved cut values filled in.
    pub fn describe(&self, thresholds: &ThresholdSet) -> String {
        match self {
            Self::FeatureAtLeast {
                feature,
                percentile,
            } => match thresholds.value(*feature, *percentile) {
                Some(cut) => format!("{feature} >= {cut:.3}"),
                None => format!("{feature} >= p{percentile}"),
            },
            Self::FeatureBelow {
                feature,
                percentile,
            } => match thresholds.value(*feature, *percentile) {
                Some(cut) => format!("{feature} < {cut:.3}"),
                None => format!("{feature} < p{percentile}"),
            },
            Self::OrderedWithinDays { days } => format!("last order within {days} days"),
            Self::All(parts) => parts
                .iter()
                .map(|p| p.describe(thresholds))
                .collect::<Vec<_>>()
                .join(" & "),
            Self::CatchAll => "all remaining users".to_string(),
        }
    }
}

/// One named position in the evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub priority: u32,
    pub predicate: RulePredicate,
}

/// Ordered, validated rule list ending in the catch-all.
///
/// Externally supplied rule lists deserialize as `Vec<Rule>` and go through
/// [`RuleSet::new`], which enforces the catch-all invariant.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validate ordering constraints: at least one rule, exactly one
    /// catch-all in final position, unique segment names.
    pub fn new(rules: Vec<Rule>) -> RetentionResult<Self> {
        let Some(last) = rules.last() else {
            return Err(RetentionError::Config("rule set is empty".to_string()));
        };
        if !matches!(last.predicate, RulePredicate::CatchAll) {
            return Err(RetentionError::Config(
                "final rule must be the unconditional catch-all".to_string(),
            ));
        }
        let catch_alls = rules
            .iter()
            .filter(|r| matches!(r.predicate, RulePredicate::CatchAll))
            .count();
        if catch_alls != 1 {
            return Err(RetentionError::Config(format!(
                "rule set must contain exactly one catch-all, found {catch_alls}"
            )));
        }
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.name == rule.name) {
                return Err(RetentionError::Config(format!(
                    "duplicate segment name in rule set: {}",
                    rule.name
                )));
            }
        }
        Ok(Self { rules })
    }

    /// The default six-rule cart-abandoner hierarchy.
    ///
    /// Priority order: AOV, then engagement, then profitability, then order
    /// recency, then the catch-all bucket.
    pub fn default_cart_abandoner(recent_order_days: u32) -> Self {
        use Feature::*;
        use RulePredicate::*;

        let rules = vec![
            Rule {
                name: segment_names::HIGH_AOV_PREMIUM.to_string(),
                priority: 1,
                predicate: FeatureAtLeast {
                    feature: AvgOrderValue,
                    percentile: 75,
                },
            },
            Rule {
                name: segment_names::MED_AOV_HIGH_ENGAGEMENT.to_string(),
                priority: 2,
                predicate: All(vec![
                    FeatureAtLeast {
                        feature: AvgOrderValue,
                        percentile: 40,
                    },
                    FeatureBelow {
                        feature: AvgOrderValue,
                        percentile: 75,
                    },
                    FeatureAtLeast {
                        feature: EngagementScore,
                        percentile: 70,
                    },
                ]),
            },
            Rule {
                name: segment_names::MED_AOV_MED_ENG_HIGH_PROFIT.to_string(),
                priority: 3,
                predicate: All(vec![
                    FeatureAtLeast {
                        feature: AvgOrderValue,
                        percentile: 40,
                    },
                    FeatureBelow {
                        feature: AvgOrderValue,
                        percentile: 75,
                    },
                    FeatureAtLeast {
                        feature: EngagementScore,
                        percentile: 40,
                    },
                    FeatureBelow {
                        feature: EngagementScore,
                        percentile: 70,
                    },
                    FeatureAtLeast {
                        feature: ProfitabilityScore,
                        percentile: 70,
                    },
                ]),
            },
            Rule {
                name: segment_names::LOW_AOV_HIGH_ENGAGEMENT.to_string(),
                priority: 4,
                predicate: All(vec![
                    FeatureBelow {
                        feature: AvgOrderValue,
                        percentile: 40,
                    },
                    FeatureAtLeast {
                        feature: EngagementScore,
                        percentile: 70,
                    },
                ]),
            },
            Rule {
                name: segment_names::RECENT_CUSTOMERS.to_string(),
                priority: 5,
                predicate: OrderedWithinDays {
                    days: recent_order_days,
                },
            },
            Rule {
                name: segment_names::OTHER_BUCKET.to_string(),
                priority: 999,
                predicate: CatchAll,
            },
        ];

        // The default hierarchy always satisfies the ordering constraints.
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// All (feature, percentile) cut points the rule set evaluates against.
    pub fn required_cuts(&self) -> Vec<(Feature, u8)> {
        let mut cuts = Vec::new();
        for rule in &self.rules {
            rule.predicate.collect_cuts(&mut cuts);
        }
        cuts
    }

    pub fn catch_all_name(&self) -> &str {
        // new() guarantees the final rule is the catch-all
        &self.rules.last().unwrap().name
    }
}

/// Fluent construction of custom rule sets.
pub struct RuleSetBuilder {
    rules: Vec<Rule>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rule(mut self, name: impl Into<String>, predicate: RulePredicate) -> Self {
        let priority = self.rules.len() as u32 + 1;
        self.rules.push(Rule {
            name: name.into(),
            priority,
            predicate,
        });
        self
    }

    /// Append the unconditional catch-all and finalize.
    pub fn catch_all(mut self, name: impl Into<String>) -> RetentionResult<RuleSet> {
        self.rules.push(Rule {
            name: name.into(),
            priority: 999,
            predicate: RulePredicate::CatchAll,
        });
        RuleSet::new(self.rules)
    }
}

impl Default for RuleSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
