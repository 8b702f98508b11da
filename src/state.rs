use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::client::is_valid_address;
use crate::severity::Severity;

const ALERT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid Avalanche address: {0}")]
    InvalidAddress(String),
    #[error("wallet {0} already added")]
    Duplicate(Address),
    #[error("wallet {0} is not tracked")]
    NotFound(Address),
    #[error("failed to access wallet store: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt wallet store: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenBalance {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub balance: String,
    pub balance_usd: String,
    pub decimals: u8,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletInfo {
    pub address: Address,
    pub label: String,
    pub balance: String,
    pub balance_usd: String,
    pub tokens: Vec<TokenBalance>,
    pub last_updated: DateTime<Utc>,
}

impl WalletInfo {
    fn new(address: Address, label: String) -> Self {
        Self {
            address,
            label,
            balance: "0".to_string(),
            balance_usd: "0".to_string(),
            tokens: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PortfolioStats {
    pub total_value_usd: f64,
    pub avax_value: f64,
    pub token_value: f64,
    pub change_24h: f64,
    pub change_24h_percent: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkStats {
    pub block_number: u64,
    pub gas_price: String,
    pub avax_price: f64,
    pub avax_change_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    /// False while the price fields hold the fallback snapshot.
    pub price_live: bool,
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self {
            block_number: 0,
            gas_price: "25".to_string(),
            avax_price: 0.0,
            avax_change_24h: 0.0,
            market_cap: 0.0,
            volume_24h: 0.0,
            price_live: false,
        }
    }
}

/// The part of the state written to disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub wallets: Vec<WalletInfo>,
    pub selected_wallet: Option<Address>,
    pub refresh_interval_secs: u64,
    pub auto_refresh: bool,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            wallets: Vec::new(),
            selected_wallet: None,
            refresh_interval_secs: 30,
            auto_refresh: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub severity: Severity,
    pub message: String,
    pub last_seen: Instant,
    pub count: u64,
}

#[derive(Debug)]
pub struct AppState {
    path: PathBuf,
    persisted: Mutex<PersistedState>,
    pub portfolio_stats: Mutex<PortfolioStats>,
    pub network_stats: Mutex<NetworkStats>,
    pub alert_history: Mutex<VecDeque<AlertRecord>>,
    pub last_refresh: Mutex<Option<Instant>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    /// Reads the store at `path`; a missing file is an empty store with
    /// `defaults` for the refresh settings.
    pub fn load(path: impl Into<PathBuf>, defaults: PersistedState) -> Result<Self, StoreError> {
        let path = path.into();
        let persisted = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No wallet store at {}, starting empty", path.display());
                defaults
            }
            Err(e) => return Err(e.into()),
        };

        let stats = calculate_portfolio_stats(&persisted.wallets);
        Ok(Self {
            path,
            persisted: Mutex::new(persisted),
            portfolio_stats: Mutex::new(stats),
            network_stats: Mutex::new(NetworkStats::default()),
            alert_history: Mutex::new(VecDeque::with_capacity(ALERT_HISTORY_LIMIT)),
            last_refresh: Mutex::new(None),
        })
    }

    /// Last write wins; concurrent writers are not reconciled.
    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut PersistedState) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut state = lock(&self.persisted);
        let mut next = state.clone();
        let result = f(&mut next)?;
        self.save(&next)?;
        *state = next;
        Ok(result)
    }

    pub fn snapshot(&self) -> PersistedState {
        lock(&self.persisted).clone()
    }

    pub fn wallets(&self) -> Vec<WalletInfo> {
        lock(&self.persisted).wallets.clone()
    }

    pub fn selected_wallet(&self) -> Option<Address> {
        lock(&self.persisted).selected_wallet
    }

    pub fn add_wallet(&self, address: &str, label: Option<&str>) -> Result<Address, StoreError> {
        if !is_valid_address(address) {
            return Err(StoreError::InvalidAddress(address.to_string()));
        }
        let parsed = Address::from_str(address)
            .map_err(|_| StoreError::InvalidAddress(address.to_string()))?;

        self.mutate(|state| {
            if state.wallets.iter().any(|w| w.address == parsed) {
                return Err(StoreError::Duplicate(parsed));
            }
            let label = match label {
                Some(l) if !l.is_empty() => l.to_string(),
                _ => format!("Wallet {}", state.wallets.len() + 1),
            };
            state.wallets.push(WalletInfo::new(parsed, label));
            if state.selected_wallet.is_none() {
                state.selected_wallet = Some(parsed);
            }
            Ok(())
        })?;

        info!("Tracking wallet {}", parsed);
        Ok(parsed)
    }

    pub fn remove_wallet(&self, address: Address) -> Result<(), StoreError> {
        self.mutate(|state| {
            let before = state.wallets.len();
            state.wallets.retain(|w| w.address != address);
            if state.wallets.len() == before {
                return Err(StoreError::NotFound(address));
            }
            if state.selected_wallet == Some(address) {
                state.selected_wallet = state.wallets.first().map(|w| w.address);
            }
            Ok(())
        })?;
        self.recalculate();
        Ok(())
    }

    pub fn update_wallet_label(&self, address: Address, label: &str) -> Result<(), StoreError> {
        self.mutate(|state| {
            let wallet = state
                .wallets
                .iter_mut()
                .find(|w| w.address == address)
                .ok_or(StoreError::NotFound(address))?;
            wallet.label = label.to_string();
            Ok(())
        })
    }

    pub fn set_selected_wallet(&self, address: Option<Address>) -> Result<(), StoreError> {
        self.mutate(|state| {
            if let Some(addr) = address {
                if !state.wallets.iter().any(|w| w.address == addr) {
                    return Err(StoreError::NotFound(addr));
                }
            }
            state.selected_wallet = address;
            Ok(())
        })
    }

    pub fn set_auto_refresh(&self, enabled: bool, interval_secs: u64) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.auto_refresh = enabled;
            state.refresh_interval_secs = interval_secs;
            Ok(())
        })
    }

    /// Replaces tracked wallets with their refreshed copies. Wallets removed
    /// while the refresh was in flight stay removed.
    pub fn apply_refreshed(&self, refreshed: Vec<WalletInfo>) -> Result<(), StoreError> {
        self.mutate(|state| {
            for wallet in state.wallets.iter_mut() {
                if let Some(fresh) = refreshed.iter().find(|r| r.address == wallet.address) {
                    let label = std::mem::take(&mut wallet.label);
                    *wallet = WalletInfo { label, ..fresh.clone() };
                }
            }
            Ok(())
        })?;
        self.recalculate();
        *lock(&self.last_refresh) = Some(Instant::now());
        Ok(())
    }

    pub fn set_network_stats(&self, stats: NetworkStats) {
        *lock(&self.network_stats) = stats;
    }

    pub fn network_stats(&self) -> NetworkStats {
        lock(&self.network_stats).clone()
    }

    pub fn portfolio_stats(&self) -> PortfolioStats {
        lock(&self.portfolio_stats).clone()
    }

    fn recalculate(&self) {
        let stats = calculate_portfolio_stats(&lock(&self.persisted).wallets);
        *lock(&self.portfolio_stats) = stats;
    }

    pub fn add_alert(&self, severity: Severity, message: String) {
        let mut history = lock(&self.alert_history);

        if let Some(last) = history.back_mut() {
            if last.severity == severity && last.message == message {
                last.last_seen = Instant::now();
                last.count += 1;
                return;
            }
        }

        if history.len() >= ALERT_HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(AlertRecord {
            severity,
            message,
            last_seen: Instant::now(),
            count: 1,
        });
    }
}

/// Sums native and USD balances. Token value and 24h change are not tracked.
pub fn calculate_portfolio_stats(wallets: &[WalletInfo]) -> PortfolioStats {
    let parse = |s: &str| s.parse::<f64>().unwrap_or(0.0);
    PortfolioStats {
        total_value_usd: wallets.iter().map(|w| parse(&w.balance_usd)).sum(),
        avax_value: wallets.iter().map(|w| parse(&w.balance)).sum(),
        ..PortfolioStats::default()
    }
}
