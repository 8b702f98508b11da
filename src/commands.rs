//! One handler per subcommand. Handlers print their report on stdout in the
//! requested format; diagnostics go to the log file.

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use alloy::rpc::types::BlockNumberOrTag;
use eyre::{bail, eyre, Result, WrapErr};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::alerts::AlertManager;
use crate::analyzer::gas::DEFAULT_GAS_PRICE_WEI;
use crate::analyzer::{
    analyze_contract_security, format_function_signature, get_contract_functions, parse_abi,
    scan_gas_patterns, ContractAnalyzer, ContractFunction, ContractInfo, GasAnalysis, SecurityIssue,
};
use crate::cli::{OutputFormat, StatsArgs, WalletAction};
use crate::client::{format_address, is_valid_address, AvalancheClient};
use crate::config::AppConfig;
use crate::price::PriceService;
use crate::refresh::Refresher;
use crate::rules::{PriceAlertRule, RuleEngine};
use crate::scoring::{calculate_wallet_score, compare_wallets, WalletStats};
use crate::state::{AppState, PersistedState, WalletInfo};

/// Blocks scanned backwards by `balance --history`.
const HISTORY_WINDOW: u64 = 2_048;

/// Everything a command may need, built once from the config.
pub struct Context {
    pub config: AppConfig,
    pub format: OutputFormat,
    pub client: Arc<AvalancheClient>,
    pub prices: Arc<PriceService>,
}

impl Context {
    pub fn new(config: AppConfig, format: OutputFormat) -> Result<Self> {
        let network = config.active_network()?.clone();
        let prices = PriceService::new(&config.price, &network.coingecko_id)?;
        let client = AvalancheClient::new(network)?;
        Ok(Self {
            config,
            format,
            client: Arc::new(client),
            prices: Arc::new(prices),
        })
    }

    fn analyzer(&self) -> ContractAnalyzer {
        ContractAnalyzer::new(self.client.provider())
    }

    fn open_store(&self) -> Result<Arc<AppState>> {
        let defaults = PersistedState {
            refresh_interval_secs: self.config.wallet.refresh_interval_secs,
            auto_refresh: self.config.wallet.auto_refresh,
            ..PersistedState::default()
        };
        let state = AppState::load(&self.config.wallet.store_path, defaults)
            .wrap_err("failed to open wallet store")?;
        Ok(Arc::new(state))
    }

    fn refresher(&self, state: Arc<AppState>) -> Refresher {
        Refresher::new(
            self.client.clone(),
            self.prices.clone(),
            state,
            self.config.tokens.clone(),
            RuleEngine::from_config(&self.config.price_alerts),
            AlertManager::new(self.config.alerts.clone()),
        )
    }

    /// Prints `value` as JSON, or runs `text` for the terminal rendition.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(value),
        }
        Ok(())
    }
}

fn parse_address(input: &str) -> Result<Address> {
    if !is_valid_address(input) {
        bail!("invalid Avalanche address: {}", input);
    }
    Address::from_str(input).map_err(|e| eyre!("invalid Avalanche address {}: {}", input, e))
}

fn read_file(path: &str) -> Result<String> {
    fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path))
}

pub async fn network(ctx: &Context) -> Result<()> {
    let (snapshot, gas, price) = tokio::join!(
        ctx.client.get_network_stats(),
        ctx.client.get_gas_price(),
        ctx.prices.get_avax_price()
    );
    let info = ctx.client.get_network_info();

    let report = json!({
        "network": info.name,
        "chain_id": info.chain_id,
        "explorer": info.explorer_url,
        "stats": snapshot,
        "gas": gas,
        "price": price,
    });

    ctx.emit(&report, |_| {
        println!("{} (chain {})", info.name, info.chain_id);
        println!("  Block:      #{}", snapshot.block_number);
        println!("  Gas (gwei): {} / {} / {}", gas.standard, gas.fast, gas.fastest);
        println!("  {} price:  ${:.2} ({:+.2}% 24h)", info.symbol, price.usd, price.usd_24h_change);
        println!("  Market cap: ${:.0}", price.usd_market_cap);
        println!("  Volume 24h: ${:.0}", price.usd_24h_vol);
    })
}

#[derive(Debug, Serialize)]
struct TokenLine {
    symbol: String,
    balance: String,
    usd: Option<f64>,
}

pub async fn balance(ctx: &Context, address: &str, history: bool) -> Result<()> {
    let address = parse_address(address)?;

    let avax = ctx.client.get_avax_balance(address).await?;
    let tx_count = ctx.client.get_transaction_count(address).await.unwrap_or_default();
    let is_contract = ctx.client.is_contract(address).await;
    let price = ctx.prices.get_avax_price().await;

    let ids: Vec<String> = ctx.config.tokens.iter().filter_map(|t| t.coingecko_id.clone()).collect();
    let token_prices = ctx.prices.get_token_prices(&ids).await;

    let mut tokens = Vec::new();
    for token in &ctx.config.tokens {
        let amount = ctx.client.get_token_balance(token.address, address).await;
        let units = amount.parse::<f64>().unwrap_or(0.0);
        if units <= 0.0 {
            continue;
        }
        let usd = token
            .coingecko_id
            .as_ref()
            .and_then(|id| token_prices.get(id))
            .map(|p| p * units);
        tokens.push(TokenLine { symbol: token.symbol.clone(), balance: amount, usd });
    }

    let recent_logs = if history {
        let latest = ctx.client.get_network_stats().await.block_number;
        let logs = ctx
            .client
            .get_transaction_history(address, latest.saturating_sub(HISTORY_WINDOW), BlockNumberOrTag::Latest)
            .await;
        Some(logs.len())
    } else {
        None
    };

    let avax_usd = avax.parse::<f64>().unwrap_or(0.0) * price.usd;
    let report = json!({
        "address": address,
        "contract": is_contract,
        "avax": avax,
        "avax_usd": format!("{:.2}", avax_usd),
        "transaction_count": tx_count,
        "tokens": tokens,
        "recent_logs": recent_logs,
    });

    ctx.emit(&report, |_| {
        let kind = if is_contract { "contract" } else { "account" };
        println!("{} ({})", address, kind);
        println!("  AVAX:  {} (${:.2})", avax, avax_usd);
        println!("  Nonce: {}", tx_count);
        for token in &tokens {
            match token.usd {
                Some(usd) => println!("  {:<6} {} (${:.2})", token.symbol, token.balance, usd),
                None => println!("  {:<6} {}", token.symbol, token.balance),
            }
        }
        if let Some(count) = recent_logs {
            println!("  Logs in last {} blocks: {}", HISTORY_WINDOW, count);
        }
    })
}

fn print_issues(issues: &[SecurityIssue]) {
    if issues.is_empty() {
        println!("  No security issues found");
    }
    for issue in issues {
        let line = issue.line.map(|l| format!("line {l}: ")).unwrap_or_default();
        println!("  [{}] {}{}", issue.severity, line, issue.title);
        if let Some(suggestion) = &issue.suggestion {
            println!("      -> {}", suggestion);
        }
    }
}

fn print_functions(functions: &[ContractFunction]) {
    for func in functions {
        let gas = match func.gas_estimate {
            Some(0) | None => "free".to_string(),
            Some(gas) => format!("~{gas} gas"),
        };
        println!("  {}  [{:?}, {}]", format_function_signature(func), func.state_mutability, gas);
    }
}

#[derive(Debug, Default, Serialize)]
struct AnalyzeReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    contract: Option<ContractInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    security: Option<Vec<SecurityIssue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<GasAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<Vec<ContractFunction>>,
    /// Step name to failure message.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<&'static str, String>,
}

impl AnalyzeReport {
    fn record<T>(&mut self, step: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Analyze step `{}` failed: {:#}", step, e);
                self.errors.insert(step, format!("{:#}", e));
                None
            }
        }
    }
}

/// Each step fails on its own; a failure is reported and the rest still run.
pub async fn analyze(ctx: &Context, address: &str, source: Option<&str>, abi: Option<&str>) -> Result<()> {
    let address = parse_address(address)?;
    let analyzer = ctx.analyzer();
    let mut report = AnalyzeReport::default();

    let info = analyzer.get_contract_info(address).await.map_err(Into::into);
    report.contract = report.record("contract", info);

    if let Some(path) = source {
        if let Some(code) = report.record("source", read_file(path)) {
            report.security = Some(analyze_contract_security(&code));
            let gas = analyzer.analyze_gas_optimization(&code).await.map_err(Into::into);
            report.gas = report.record("gas", gas);
        }
    }

    if let Some(path) = abi {
        let entries = read_file(path).and_then(|json| Ok(parse_abi(&json)?));
        report.functions = report
            .record("functions", entries)
            .map(|entries| get_contract_functions(&entries));
    }

    ctx.emit(&report, |r| {
        println!("Contract {}", format_address(&address.to_string(), 8, 6));
        if let Some(info) = &r.contract {
            let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
            println!("  Name:         {}", or_dash(info.name.clone()));
            println!("  Symbol:       {}", or_dash(info.symbol.clone()));
            println!("  Decimals:     {}", or_dash(info.decimals.map(|d| d.to_string())));
            println!("  Total supply: {}", or_dash(info.total_supply.clone()));
            println!("  Verified:     {}", info.verified);
        }
        if let Some(issues) = &r.security {
            println!("Security:");
            print_issues(issues);
        }
        if let Some(gas) = &r.gas {
            println!("Gas: ~{} gas at {} gwei = {} AVAX", gas.estimated_gas, gas.gas_price, gas.total_cost);
            for tip in &gas.optimizations {
                println!("  -> {}", tip);
            }
        }
        if let Some(functions) = &r.functions {
            println!("Functions:");
            print_functions(functions);
        }
        for (step, err) in &r.errors {
            println!("{} unavailable: {}", step, err);
        }
    })
}

pub fn scan(ctx: &Context, file: &str) -> Result<()> {
    let code = read_file(file)?;
    let issues = analyze_contract_security(&code);
    let gas = scan_gas_patterns(&code).priced(DEFAULT_GAS_PRICE_WEI);
    info!("Scanned {}: {} issue(s)", file, issues.len());

    let report = json!({ "security": issues, "gas": gas });
    ctx.emit(&report, |_| {
        println!("Security:");
        print_issues(&issues);
        println!("Gas: ~{} gas, {} AVAX at {} gwei", gas.estimated_gas, gas.total_cost, gas.gas_price);
        for line in &gas.inefficiencies {
            println!("  {}", line);
        }
        for tip in &gas.optimizations {
            println!("  -> {}", tip);
        }
    })
}

pub fn functions(ctx: &Context, abi: &str) -> Result<()> {
    let entries = parse_abi(&read_file(abi)?)?;
    let functions = get_contract_functions(&entries);
    ctx.emit(&functions, |f| print_functions(f))
}

pub async fn simulate(
    ctx: &Context,
    address: &str,
    abi: &str,
    function: &str,
    params: &[String],
    value: Option<&str>,
) -> Result<()> {
    let address = parse_address(address)?;
    let abi: JsonAbi = serde_json::from_str(&read_file(abi)?).wrap_err("invalid ABI")?;

    let result = ctx
        .analyzer()
        .simulate_transaction(address, &abi, function, params, value.unwrap_or("0"))
        .await;

    ctx.emit(&result, |r| {
        if r.success {
            println!("{} would succeed", function);
            if let Some(gas) = r.gas_estimate {
                println!("  Gas estimate: {}", gas);
            }
            if let Some(output) = &r.result {
                println!("  Result: {}", output);
            }
        } else {
            let verdict = if r.reverted { "would revert" } else { "could not be simulated" };
            println!("{} {}", function, verdict);
            if let Some(reason) = &r.revert_reason {
                println!("  Reason: {}", reason);
            }
            if let Some(err) = &r.error {
                println!("  Error: {}", err);
            }
        }
    })
}

pub async fn score(ctx: &Context, stats: StatsArgs, address: Option<&str>) -> Result<()> {
    let mut stats = WalletStats::from(stats);

    if let Some(address) = address {
        let address = parse_address(address)?;
        let (balance, count) = tokio::join!(
            ctx.client.get_avax_balance(address),
            ctx.client.get_transaction_count(address)
        );
        stats.balance = balance?.parse().unwrap_or(stats.balance);
        stats.transaction_count = count?;
    }

    let score = calculate_wallet_score(&stats);
    ctx.emit(&score, |s| {
        println!("Overall: {:.1} ({}, {})", s.overall, s.grade, s.rating());
        println!("  Security:        {:.1}", s.security);
        println!("  Diversification: {:.1}", s.diversification);
        println!("  Activity:        {:.1}", s.activity);
        println!("  Profitability:   {:.1}", s.profitability);
        println!("  Consistency:     {:.1}", s.consistency);
        for (title, items) in [
            ("Strengths", &s.strengths),
            ("Weaknesses", &s.weaknesses),
            ("Recommendations", &s.recommendations),
        ] {
            if !items.is_empty() {
                println!("{}:", title);
                for item in items {
                    println!("  - {}", item);
                }
            }
        }
    })
}

fn read_stats(path: &str) -> Result<WalletStats> {
    serde_json::from_str(&read_file(path)?).wrap_err_with(|| format!("invalid wallet stats in {}", path))
}

pub fn compare(ctx: &Context, first: &str, second: &str) -> Result<()> {
    let (a, b) = (read_stats(first)?, read_stats(second)?);
    let scores = (calculate_wallet_score(&a), calculate_wallet_score(&b));
    let insights = compare_wallets(&a, &b);

    let report = json!({
        "first": scores.0,
        "second": scores.1,
        "insights": insights,
    });
    ctx.emit(&report, |_| {
        println!("Wallet 1: {:.1} ({})", scores.0.overall, scores.0.grade);
        println!("Wallet 2: {:.1} ({})", scores.1.overall, scores.1.grade);
        for insight in &insights {
            println!("  {} [wallet {}]: {}", insight.title, insight.leader, insight.message);
        }
    })
}

fn print_wallets(wallets: &[WalletInfo], selected: Option<Address>) {
    if wallets.is_empty() {
        println!("No wallets tracked");
    }
    for w in wallets {
        let marker = if Some(w.address) == selected { "*" } else { " " };
        println!(
            "{} {:<16} {}  {} AVAX  ${}",
            marker,
            w.label,
            format_address(&w.address.to_string(), 6, 4),
            w.balance,
            w.balance_usd
        );
        for token in &w.tokens {
            println!("      {:<6} {} (${})", token.symbol, token.balance, token.balance_usd);
        }
    }
}

pub async fn wallet(ctx: &Context, action: WalletAction) -> Result<()> {
    let state = ctx.open_store()?;

    match action {
        WalletAction::Add { address, label } => {
            let address = state.add_wallet(&address, label.as_deref())?;
            ctx.refresher(state.clone()).refresh_wallet_data(Some(address)).await?;
            println!("Added {}", address);
        }
        WalletAction::Remove { address } => {
            state.remove_wallet(parse_address(&address)?)?;
            println!("Removed {}", address);
        }
        WalletAction::Label { address, label } => {
            state.update_wallet_label(parse_address(&address)?, &label)?;
            println!("Renamed {} to {}", address, label);
        }
        WalletAction::Select { address } => {
            state.set_selected_wallet(Some(parse_address(&address)?))?;
            println!("Selected {}", address);
        }
        WalletAction::AutoRefresh { off, interval } => {
            let interval = interval.unwrap_or(state.snapshot().refresh_interval_secs);
            state.set_auto_refresh(!off, interval)?;
            let status = if off { "disabled".to_string() } else { format!("every {}s", interval) };
            println!("Auto refresh {}", status);
        }
        WalletAction::List { offline } => {
            if !offline {
                ctx.refresher(state.clone()).refresh_wallet_data(None).await?;
            }
            let report = json!({
                "wallets": state.wallets(),
                "selected": state.selected_wallet(),
                "portfolio": state.portfolio_stats(),
            });
            ctx.emit(&report, |_| {
                print_wallets(&state.wallets(), state.selected_wallet());
                let stats = state.portfolio_stats();
                println!("Total: ${:.2} ({:.4} AVAX)", stats.total_value_usd, stats.avax_value);
            })?;
        }
    }
    Ok(())
}

pub async fn watch(ctx: &Context) -> Result<()> {
    let state = ctx.open_store()?;
    let refresher = Arc::new(ctx.refresher(state.clone()));
    let settings = state.snapshot();

    if settings.auto_refresh {
        let period = Duration::from_secs(settings.refresh_interval_secs.max(1));
        tokio::spawn(async move { refresher.run_auto_refresh(period).await });
    } else {
        info!("Auto refresh disabled, loading once");
        tokio::spawn(async move { refresher.refresh_all_data().await });
    }

    let rules = ctx.config.price_alerts.iter().map(PriceAlertRule::from).collect();
    crate::tui::run_tui(state, rules)
}
