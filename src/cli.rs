use clap::{Parser, Subcommand};

use crate::scoring::WalletStats;

#[derive(Parser, Debug)]
#[command(name = "avax-insight")]
#[command(about = "Avalanche C-Chain wallet and contract insight tool")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format (json, text)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Block height, gas tiers and AVAX market data
    Network,

    /// AVAX and tracked token balances of an address
    Balance {
        address: String,

        /// Also count logs addressed to it in recent blocks
        #[arg(long)]
        history: bool,
    },

    /// Inspect a deployed contract, optionally scanning its source
    Analyze {
        address: String,

        /// Solidity source to scan for security and gas issues
        #[arg(long)]
        source: Option<String>,

        /// ABI JSON file to list callable functions
        #[arg(long)]
        abi: Option<String>,
    },

    /// Offline security and gas scan of a Solidity file
    Scan {
        file: String,
    },

    /// List the functions of an ABI JSON file
    Functions {
        abi: String,
    },

    /// Dry-run a contract call without sending a transaction
    Simulate {
        address: String,

        /// ABI JSON file containing the function
        #[arg(long)]
        abi: String,

        /// Function name
        function: String,

        /// Call parameters, in ABI order
        params: Vec<String>,

        /// AVAX attached to the call
        #[arg(long)]
        value: Option<String>,
    },

    /// Score a wallet from its activity figures
    Score {
        #[command(flatten)]
        stats: StatsArgs,

        /// Fill balance and transaction count from chain
        #[arg(long)]
        address: Option<String>,
    },

    /// Compare two wallets, each given as a JSON file of stats
    Compare {
        first: String,
        second: String,
    },

    /// Manage tracked wallets
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Live dashboard of tracked wallets, network and price alerts
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum WalletAction {
    /// Track a new wallet
    Add {
        address: String,
        #[arg(long)]
        label: Option<String>,
    },
    /// Stop tracking a wallet
    Remove {
        address: String,
    },
    /// Rename a tracked wallet
    Label {
        address: String,
        label: String,
    },
    /// Select the wallet shown first by the dashboard
    Select {
        address: String,
    },
    /// Configure the dashboard's periodic refresh
    AutoRefresh {
        /// Disable periodic refresh
        #[arg(long)]
        off: bool,

        /// Seconds between refreshes
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show tracked wallets after refreshing their balances
    List {
        /// Skip the on-chain refresh
        #[arg(long)]
        offline: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct StatsArgs {
    /// AVAX balance
    #[arg(long, default_value_t = 0.0)]
    pub balance: f64,

    #[arg(long, default_value_t = 0)]
    pub transactions: u64,

    /// 0-100, higher is riskier
    #[arg(long, default_value_t = 50.0)]
    pub risk: f64,

    /// 0-100
    #[arg(long, default_value_t = 50.0)]
    pub diversification: f64,

    /// 0-100
    #[arg(long, default_value_t = 50.0)]
    pub activity: f64,

    /// Realised profit or loss in AVAX
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub profit_loss: f64,

    #[arg(long, default_value_t = 0)]
    pub age_days: u64,
}

impl From<StatsArgs> for WalletStats {
    fn from(args: StatsArgs) -> Self {
        Self {
            balance: args.balance,
            transaction_count: args.transactions,
            risk_score: args.risk,
            diversification_score: args.diversification,
            activity_score: args.activity,
            profit_loss: args.profit_loss,
            age_days: args.age_days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output for machine consumption
    Json,
    /// Human-readable terminal output
    Text,
}
