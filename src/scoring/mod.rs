//! Composite wallet scoring: five 0-100 sub-scores, a weighted overall
//! score, a letter grade and threshold-driven feedback.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const SECURITY_WEIGHT: f64 = 0.25;
pub const DIVERSIFICATION_WEIGHT: f64 = 0.20;
pub const ACTIVITY_WEIGHT: f64 = 0.20;
pub const PROFITABILITY_WEIGHT: f64 = 0.20;
pub const CONSISTENCY_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct WalletStats {
    /// AVAX.
    pub balance: f64,
    pub transaction_count: u64,
    pub risk_score: f64,
    pub diversification_score: f64,
    pub activity_score: f64,
    /// Realized plus unrealized, same unit as `balance`.
    pub profit_loss: f64,
    pub age_days: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    F,
    D,
    DPlus,
    C,
    CPlus,
    B,
    BPlus,
    A,
    APlus,
}

impl Grade {
    pub fn from_score(overall: f64) -> Self {
        match overall {
            s if s >= 90.0 => Grade::APlus,
            s if s >= 80.0 => Grade::A,
            s if s >= 70.0 => Grade::BPlus,
            s if s >= 60.0 => Grade::B,
            s if s >= 50.0 => Grade::CPlus,
            s if s >= 40.0 => Grade::C,
            s if s >= 30.0 => Grade::DPlus,
            s if s >= 20.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WalletScore {
    pub overall: f64,
    pub security: f64,
    pub diversification: f64,
    pub activity: f64,
    pub profitability: f64,
    pub consistency: f64,
    pub grade: Grade,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

impl WalletScore {
    pub fn rating(&self) -> &'static str {
        match self.overall {
            s if s >= 80.0 => "Excellent",
            s if s >= 60.0 => "Good",
            s if s >= 40.0 => "Average",
            _ => "Poor",
        }
    }
}

/// Maps a -100%..+100% return onto 0..100, saturating at both ends.
/// A non-positive balance saturates on the sign of `profit_loss`.
pub fn profitability(profit_loss: f64, balance: f64) -> f64 {
    if balance <= 0.0 {
        return match profit_loss {
            p if p > 0.0 => 100.0,
            p if p < 0.0 => 0.0,
            _ => 50.0,
        };
    }
    ((profit_loss / balance + 1.0) * 50.0).clamp(0.0, 100.0)
}

pub fn consistency(transaction_count: u64, age_days: u64) -> f64 {
    (transaction_count as f64 / age_days.max(1) as f64 * 10.0).min(100.0)
}

pub fn calculate_wallet_score(stats: &WalletStats) -> WalletScore {
    let security = (100.0 - stats.risk_score).max(0.0);
    let diversification = stats.diversification_score;
    let activity = stats.activity_score;
    let profitability = profitability(stats.profit_loss, stats.balance);
    let consistency = consistency(stats.transaction_count, stats.age_days);

    let overall = security * SECURITY_WEIGHT
        + diversification * DIVERSIFICATION_WEIGHT
        + activity * ACTIVITY_WEIGHT
        + profitability * PROFITABILITY_WEIGHT
        + consistency * CONSISTENCY_WEIGHT;

    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut recommendations = Vec::new();

    let note = |list: &mut Vec<String>, hit: bool, text: &str| {
        if hit {
            list.push(text.to_string());
        }
    };

    note(&mut strengths, security >= 80.0, "Excellent security practices");
    note(&mut strengths, diversification >= 70.0, "Well-diversified portfolio");
    note(&mut strengths, activity >= 80.0, "High engagement with DeFi");
    note(&mut strengths, profitability >= 60.0, "Strong profit performance");
    note(&mut strengths, consistency >= 70.0, "Consistent trading activity");

    note(&mut weaknesses, security < 40.0, "High-risk security profile");
    note(&mut weaknesses, diversification < 30.0, "Over-concentrated holdings");
    note(&mut weaknesses, activity < 30.0, "Low blockchain engagement");
    note(&mut weaknesses, profitability < 20.0, "Poor profit performance");
    note(&mut weaknesses, consistency < 20.0, "Irregular activity patterns");

    note(&mut recommendations, diversification < 50.0, "Consider diversifying into different asset classes");
    note(&mut recommendations, security < 60.0, "Review and improve security practices");
    note(&mut recommendations, activity < 40.0, "Explore more DeFi opportunities");
    note(&mut recommendations, profitability < 40.0, "Review investment strategy and risk management");
    note(&mut recommendations, consistency < 30.0, "Develop a more consistent trading schedule");

    WalletScore {
        overall,
        security,
        diversification,
        activity,
        profitability,
        consistency,
        grade: Grade::from_score(overall),
        strengths,
        weaknesses,
        recommendations,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Insight {
    pub title: &'static str,
    /// 1 or 2.
    pub leader: u8,
    pub message: String,
}

/// Side-by-side summary of two wallets. Ties go to the second wallet.
pub fn compare_wallets(first: &WalletStats, second: &WalletStats) -> Vec<Insight> {
    let (value_leader, value_lead) = if first.balance > second.balance {
        (1, percent_ahead(first.balance, second.balance))
    } else {
        (2, percent_ahead(second.balance, first.balance))
    };
    let (risk_leader, low, high) = if first.risk_score < second.risk_score {
        (1, first.risk_score, second.risk_score)
    } else {
        (2, second.risk_score, first.risk_score)
    };
    let (activity_leader, more, less) = if first.activity_score > second.activity_score {
        (1, first.activity_score, second.activity_score)
    } else {
        (2, second.activity_score, first.activity_score)
    };
    let other = |leader: u8| if leader == 1 { 2 } else { 1 };

    vec![
        Insight {
            title: "Higher Portfolio Value",
            leader: value_leader,
            message: format!(
                "Wallet {} has a {:.1}% higher portfolio value than Wallet {}.",
                value_leader,
                value_lead,
                other(value_leader)
            ),
        },
        Insight {
            title: "Better Risk Management",
            leader: risk_leader,
            message: format!(
                "Wallet {} demonstrates better risk management with a lower risk score ({:.0} vs {:.0}).",
                risk_leader, low, high
            ),
        },
        Insight {
            title: "Higher Activity",
            leader: activity_leader,
            message: format!(
                "Wallet {} shows {:.0}% activity score compared to Wallet {}'s {:.0}%, indicating more frequent usage.",
                activity_leader,
                more,
                other(activity_leader),
                less
            ),
        },
    ]
}

fn percent_ahead(larger: f64, smaller: f64) -> f64 {
    if smaller <= 0.0 {
        return 0.0;
    }
    (larger / smaller - 1.0) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> WalletStats {
        WalletStats {
            balance: 1_000.0,
            transaction_count: 100,
            risk_score: 30.0,
            diversification_score: 60.0,
            activity_score: 70.0,
            profit_loss: 0.0,
            age_days: 50,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total = SECURITY_WEIGHT
            + DIVERSIFICATION_WEIGHT
            + ACTIVITY_WEIGHT
            + PROFITABILITY_WEIGHT
            + CONSISTENCY_WEIGHT;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_break_even_is_midpoint() {
        for balance in [0.01, 1.0, 1_000.0, 1e12] {
            assert_eq!(profitability(0.0, balance), 50.0);
        }
    }

    #[test]
    fn test_profitability_saturates() {
        assert_eq!(profitability(1_000.0, 1_000.0), 100.0);
        assert_eq!(profitability(5_000.0, 1_000.0), 100.0);
        assert_eq!(profitability(-1_000.0, 1_000.0), 0.0);
        assert_eq!(profitability(-5_000.0, 1_000.0), 0.0);
        assert_eq!(profitability(500.0, 1_000.0), 75.0);
    }

    #[test]
    fn test_profitability_without_balance() {
        assert_eq!(profitability(0.0, 0.0), 50.0);
        assert_eq!(profitability(10.0, 0.0), 100.0);
        assert_eq!(profitability(-10.0, 0.0), 0.0);
    }

    #[test]
    fn test_consistency() {
        assert_eq!(consistency(100, 50), 20.0);
        assert_eq!(consistency(5, 0), 50.0);
        assert_eq!(consistency(10_000, 10), 100.0);
    }

    #[test]
    fn test_overall_stays_in_range() {
        let steps = [0.0, 25.0, 50.0, 75.0, 100.0];
        for risk in steps {
            for div in steps {
                for act in steps {
                    for pl in [-2_000.0, 0.0, 2_000.0] {
                        for tx in [0, 10, 10_000] {
                            let score = calculate_wallet_score(&WalletStats {
                                balance: 1_000.0,
                                transaction_count: tx,
                                risk_score: risk,
                                diversification_score: div,
                                activity_score: act,
                                profit_loss: pl,
                                age_days: 30,
                            });
                            assert!((0.0..=100.0).contains(&score.overall), "{score:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_score(90.0), Grade::APlus);
        assert_eq!(Grade::from_score(89.9), Grade::A);
        assert_eq!(Grade::from_score(19.99), Grade::F);
        assert_eq!(Grade::from_score(20.0), Grade::D);
        assert_eq!(Grade::from_score(55.0).to_string(), "C+");
    }

    #[test]
    fn test_grade_is_monotonic() {
        let mut previous = Grade::from_score(0.0);
        let mut score = 0.0;
        while score <= 100.0 {
            let grade = Grade::from_score(score);
            assert!(grade >= previous, "grade dropped at {score}");
            previous = grade;
            score += 0.5;
        }
        for boundary in [20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0] {
            assert!(Grade::from_score(boundary) > Grade::from_score(boundary - 0.01));
        }
    }

    #[test]
    fn test_score_composition() {
        let score = calculate_wallet_score(&stats());
        assert_eq!(score.security, 70.0);
        assert_eq!(score.profitability, 50.0);
        assert_eq!(score.consistency, 20.0);
        // 17.5 + 12 + 14 + 10 + 3
        assert!((score.overall - 56.5).abs() < 1e-9);
        assert_eq!(score.grade, Grade::CPlus);
        assert_eq!(score.rating(), "Average");
    }

    #[test]
    fn test_feedback_thresholds() {
        let score = calculate_wallet_score(&stats());
        assert!(score.strengths.is_empty());
        assert!(score.weaknesses.is_empty());
        assert_eq!(score.recommendations, vec!["Develop a more consistent trading schedule"]);

        let risky = calculate_wallet_score(&WalletStats {
            risk_score: 90.0,
            diversification_score: 10.0,
            ..stats()
        });
        assert!(risky.weaknesses.contains(&"High-risk security profile".to_string()));
        assert!(risky.weaknesses.contains(&"Over-concentrated holdings".to_string()));
        assert!(risky
            .recommendations
            .contains(&"Review and improve security practices".to_string()));
        assert!(risky
            .recommendations
            .contains(&"Consider diversifying into different asset classes".to_string()));
    }

    #[test]
    fn test_security_never_negative() {
        let score = calculate_wallet_score(&WalletStats {
            risk_score: 150.0,
            ..stats()
        });
        assert_eq!(score.security, 0.0);
    }

    #[test]
    fn test_grade_serializes_as_letter() {
        let score = calculate_wallet_score(&stats());
        let json = serde_json::to_value(&score).unwrap();
        assert_eq!(json["grade"], "C+");
    }

    #[test]
    fn test_compare_wallets() {
        let first = WalletStats {
            balance: 2_000.0,
            risk_score: 20.0,
            activity_score: 40.0,
            ..stats()
        };
        let second = WalletStats {
            balance: 1_000.0,
            risk_score: 50.0,
            activity_score: 80.0,
            ..stats()
        };

        let insights = compare_wallets(&first, &second);
        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].leader, 1);
        assert_eq!(
            insights[0].message,
            "Wallet 1 has a 100.0% higher portfolio value than Wallet 2."
        );
        assert_eq!(insights[1].leader, 1);
        assert_eq!(insights[2].leader, 2);
        assert!(insights[2].message.starts_with("Wallet 2 shows 80% activity score"));
    }
}
