use crate::config::PriceAlertConfig;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// USD prices keyed by upper-case asset symbol.
pub type PriceSnapshot = HashMap<String, f64>;

pub trait Rule: Send + Sync + Debug {
    fn check(&self, prices: &PriceSnapshot) -> Option<(String, Severity)>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Inactive,
    Triggered,
    Waiting,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceAlertRule {
    pub asset: String,
    pub condition: AlertCondition,
    pub price: f64,
    pub active: bool,
    pub severity: Severity,
}

impl PriceAlertRule {
    pub fn new(asset: &str, condition: AlertCondition, price: f64, severity: Severity) -> Self {
        Self {
            asset: asset.to_uppercase(),
            condition,
            price,
            active: true,
            severity,
        }
    }

    pub fn status(&self, current: f64) -> AlertStatus {
        if !self.active {
            return AlertStatus::Inactive;
        }
        let triggered = match self.condition {
            AlertCondition::Above => current >= self.price,
            AlertCondition::Below => current <= self.price,
        };
        if triggered {
            AlertStatus::Triggered
        } else {
            AlertStatus::Waiting
        }
    }

    /// How close `current` is to the target, 0-100.
    pub fn progress(&self, current: f64) -> f64 {
        if self.price <= 0.0 {
            return 0.0;
        }
        let raw = match self.condition {
            AlertCondition::Above => current / self.price * 100.0,
            AlertCondition::Below => (self.price - current) / self.price * 100.0,
        };
        raw.clamp(0.0, 100.0)
    }
}

impl From<&PriceAlertConfig> for PriceAlertRule {
    fn from(cfg: &PriceAlertConfig) -> Self {
        let mut rule = Self::new(&cfg.asset, cfg.condition, cfg.price, Severity::Medium);
        rule.active = cfg.active;
        rule
    }
}

impl Rule for PriceAlertRule {
    fn check(&self, prices: &PriceSnapshot) -> Option<(String, Severity)> {
        let current = *prices.get(&self.asset)?;
        if self.status(current) != AlertStatus::Triggered {
            return None;
        }
        let direction = match self.condition {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
        };
        Some((
            format!(
                "{} is {} ${:.3} (now ${:.3})",
                self.asset, direction, self.price, current
            ),
            self.severity,
        ))
    }
}

#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_config(alerts: &[PriceAlertConfig]) -> Self {
        let mut engine = Self::new();
        for alert in alerts {
            engine.add_rule(Box::new(PriceAlertRule::from(alert)));
        }
        engine
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn process(&self, prices: &PriceSnapshot) -> Vec<(String, Severity)> {
        let mut alerts = Vec::new();
        for rule in &self.rules {
            if let Some(result) = rule.check(prices) {
                alerts.push(result);
            }
        }
        alerts
    }
}
