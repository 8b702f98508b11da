use alloy::primitives::Address;
use chrono::Utc;
use eyre::Result;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::alerts::AlertManager;
use crate::client::{AvalancheClient, ClientError};
use crate::config::TokenConfig;
use crate::price::{PriceData, PriceService};
use crate::rules::{PriceSnapshot, RuleEngine};
use crate::state::{AppState, NetworkStats, TokenBalance, WalletInfo};

/// Pulls chain and market data into the shared [`AppState`].
pub struct Refresher {
    client: Arc<AvalancheClient>,
    prices: Arc<PriceService>,
    state: Arc<AppState>,
    tokens: Vec<TokenConfig>,
    engine: RuleEngine,
    alerts: AlertManager,
}

impl Refresher {
    pub fn new(
        client: Arc<AvalancheClient>,
        prices: Arc<PriceService>,
        state: Arc<AppState>,
        tokens: Vec<TokenConfig>,
        engine: RuleEngine,
        alerts: AlertManager,
    ) -> Self {
        Self { client, prices, state, tokens, engine, alerts }
    }

    /// Refreshes every tracked wallet, or only `only` when given. Returns how
    /// many wallets were updated; failing wallets keep their previous data.
    pub async fn refresh_wallet_data(&self, only: Option<Address>) -> Result<usize> {
        let targets: Vec<WalletInfo> = self
            .state
            .wallets()
            .into_iter()
            .filter(|w| only.map_or(true, |addr| w.address == addr))
            .collect();

        if targets.is_empty() {
            debug!("No wallets to refresh");
            return Ok(0);
        }

        let avax = self.prices.get_avax_price().await;
        let token_prices = self.token_prices().await;

        let results = join_all(
            targets
                .iter()
                .map(|wallet| self.refresh_wallet(wallet, &avax, &token_prices)),
        )
        .await;

        let mut refreshed = Vec::with_capacity(results.len());
        for (wallet, result) in targets.iter().zip(results) {
            match result {
                Ok(fresh) => refreshed.push(fresh),
                Err(e) => warn!("Keeping previous data for {}: {}", wallet.address, e),
            }
        }

        let count = refreshed.len();
        self.state.apply_refreshed(refreshed)?;
        info!("Refreshed {} wallet(s)", count);
        Ok(count)
    }

    async fn token_prices(&self) -> HashMap<String, f64> {
        let ids: Vec<String> = self
            .tokens
            .iter()
            .filter_map(|t| t.coingecko_id.clone())
            .collect();
        self.prices.get_token_prices(&ids).await
    }

    async fn refresh_wallet(
        &self,
        wallet: &WalletInfo,
        avax: &PriceData,
        token_prices: &HashMap<String, f64>,
    ) -> Result<WalletInfo, ClientError> {
        let balance = self.client.get_avax_balance(wallet.address).await?;

        let balances = join_all(
            self.tokens
                .iter()
                .map(|t| self.client.get_token_balance(t.address, wallet.address)),
        )
        .await;

        let tokens = self
            .tokens
            .iter()
            .zip(balances)
            .filter_map(|(token, amount)| {
                let units = amount.parse::<f64>().unwrap_or(0.0);
                if units <= 0.0 {
                    return None;
                }
                let price = token
                    .coingecko_id
                    .as_ref()
                    .and_then(|id| token_prices.get(id))
                    .copied();
                Some(TokenBalance {
                    address: token.address,
                    symbol: token.symbol.clone(),
                    name: token.name.clone(),
                    balance: amount,
                    balance_usd: format!("{:.2}", units * price.unwrap_or(0.0)),
                    decimals: token.decimals,
                    price,
                })
            })
            .collect();

        let balance_usd = format!("{:.2}", balance.parse::<f64>().unwrap_or(0.0) * avax.usd);

        Ok(WalletInfo {
            address: wallet.address,
            label: wallet.label.clone(),
            balance,
            balance_usd,
            tokens,
            last_updated: Utc::now(),
        })
    }

    pub async fn refresh_network_data(&self) -> NetworkStats {
        let (snapshot, live) = tokio::join!(
            self.client.get_network_stats(),
            self.prices.get_live_avax_price()
        );
        let price_live = live.is_ok();
        let price = live.unwrap_or_else(|e| {
            warn!("Price lookup failed, using fallback snapshot: {}", e);
            self.prices.get_fallback_avax_price()
        });

        let stats = NetworkStats {
            block_number: snapshot.block_number,
            gas_price: snapshot.gas_price,
            avax_price: price.usd,
            avax_change_24h: price.usd_24h_change,
            market_cap: price.usd_market_cap,
            volume_24h: price.usd_24h_vol,
            price_live,
        };
        self.state.set_network_stats(stats.clone());
        stats
    }

    pub async fn refresh_all_data(&self) {
        let (wallets, _) = tokio::join!(self.refresh_wallet_data(None), self.refresh_network_data());
        if let Err(e) = wallets {
            error!("Wallet refresh failed: {}", e);
        }
    }

    /// Runs the price alert rules against the latest AVAX price. Nothing
    /// is evaluated while that price is the fallback snapshot.
    pub async fn evaluate_alerts(&self) -> usize {
        let network = self.state.network_stats();
        if !network.price_live {
            debug!("Skipping price alerts: no live price");
            return 0;
        }

        let mut prices = PriceSnapshot::new();
        prices.insert("AVAX".to_string(), network.avax_price);

        let triggered = self.engine.process(&prices);
        for (message, severity) in &triggered {
            info!("Price alert [{}]: {}", severity, message);
            self.state.add_alert(*severity, message.clone());
            self.alerts.send_alert(*severity, message).await;
        }
        triggered.len()
    }

    /// Refresh loop. Each tick finishes before the next is taken, so
    /// refreshes never overlap; late ticks are delayed rather than bunched.
    pub async fn run_auto_refresh(&self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Auto refresh every {}s ({} price rule(s), delivery {})",
            period.as_secs(),
            self.engine.len(),
            if self.alerts.is_configured() { "enabled" } else { "disabled" }
        );
        loop {
            ticker.tick().await;
            self.refresh_all_data().await;
            if !self.engine.is_empty() {
                self.evaluate_alerts().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlertsConfig, AppConfig};
    use crate::rules::{AlertCondition, PriceAlertRule};
    use crate::severity::Severity;
    use crate::state::PersistedState;

    const WALLET: &str = "0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7";

    fn offline(dir: &tempfile::TempDir, engine: RuleEngine) -> Refresher {
        let mut config = AppConfig::default();
        let network = config.active_network_mut().unwrap();
        network.rpc_url = "http://127.0.0.1:1".to_string();
        let network = network.clone();
        config.price.api_url = "http://127.0.0.1:1".to_string();
        config.price.timeout_secs = 1;

        let client = Arc::new(AvalancheClient::new(network.clone()).unwrap());
        let prices = Arc::new(PriceService::new(&config.price, &network.coingecko_id).unwrap());
        let state = Arc::new(
            AppState::load(dir.path().join("store.json"), PersistedState::default()).unwrap(),
        );
        let alerts = AlertManager::new(AlertsConfig::default());
        Refresher::new(client, prices, state, config.tokens, engine, alerts)
    }

    #[tokio::test]
    async fn test_failed_wallet_keeps_previous_data() {
        let dir = tempfile::tempdir().unwrap();
        let refresher = offline(&dir, RuleEngine::new());
        refresher.state.add_wallet(WALLET, Some("Main")).unwrap();
        let before = refresher.state.wallets();

        let updated = refresher.refresh_wallet_data(None).await.unwrap();
        assert_eq!(updated, 0);
        assert_eq!(refresher.state.wallets(), before);
    }

    #[tokio::test]
    async fn test_network_refresh_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let refresher = offline(&dir, RuleEngine::new());

        let stats = refresher.refresh_network_data().await;
        assert_eq!(stats.block_number, 0);
        assert_eq!(stats.gas_price, "25");
        assert_eq!(stats.avax_price, PriceData::snapshot().usd);
        assert!(!stats.price_live);
        assert_eq!(refresher.state.network_stats(), stats);
    }

    #[tokio::test]
    async fn test_fallback_price_never_triggers_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = RuleEngine::new();
        engine.add_rule(Box::new(PriceAlertRule::new("AVAX", AlertCondition::Below, 30.0, Severity::High)));
        let refresher = offline(&dir, engine);

        let stats = refresher.refresh_network_data().await;
        assert!(!stats.price_live);
        assert_eq!(refresher.evaluate_alerts().await, 0);
        assert!(refresher.state.alert_history.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_price_alerts_land_in_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = RuleEngine::new();
        engine.add_rule(Box::new(PriceAlertRule::new("AVAX", AlertCondition::Above, 20.0, Severity::High)));
        let refresher = offline(&dir, engine);

        refresher.state.set_network_stats(NetworkStats {
            avax_price: 32.0,
            price_live: true,
            ..NetworkStats::default()
        });
        assert_eq!(refresher.evaluate_alerts().await, 1);

        let history = refresher.state.alert_history.lock().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].severity, Severity::High);
        assert_eq!(history[0].message, "AVAX is above $20.000 (now $32.000)");
    }
}
