//! Cirrus operator CLI: one-shot wallet, staking and peer tools.
//!
//! Reads the operator configuration once, talks to the node REST API, and
//! exits. Wallet commands run against the sidechain node unless `--node
//! primary` is given.

use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use cirrus_api::{NodeApi, NodeClient};
use cirrus_core::{ChangePolicy, OperatorConfig, format_coins, parse_coins};
use cirrus_monitor::{StakingAction, ensure_staking, normalize_endpoint, reconnect_peers};
use cirrus_wallet::{
    ConsolidationPlan, ConsolidationReport, InteractiveSelection, PresetIndices,
    SelectionStrategy, TransactionBuilder, build_and_broadcast, consolidate,
    federation_deposit_address, filter_eligible, parse_indices, render_outputs,
};

/// Cirrus masternode operator tools.
#[derive(Parser)]
#[command(name = "cirrus-cli")]
#[command(version, about = "Wallet, staking and peer tools for a Cirrus masternode")]
struct Cli {
    /// Operator configuration file (default: <config dir>/cirrus/operator.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Node to talk to.
    #[arg(long, global = true, value_enum, default_value_t = Node::Secondary)]
    node: Node,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Node {
    /// Mainchain node.
    Primary,
    /// Sidechain node.
    Secondary,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the wallet balance.
    Balance,
    /// List wallets and their accounts.
    Wallets,
    /// List spendable outputs.
    Outputs(OutputsArgs),
    /// Merge spendable outputs into one address, one transaction per batch.
    Consolidate(ConsolidateArgs),
    /// Spend selected outputs to a destination.
    Send(SendArgs),
    /// Sweep the sidechain wallet to the federation for a mainchain address.
    CrossChain(CrossChainArgs),
    /// Staking status and control.
    Staking {
        #[command(subcommand)]
        action: StakingCommand,
    },
    /// Peer status and reconnection.
    Peers {
        #[command(subcommand)]
        action: PeersCommand,
    },
}

#[derive(Subcommand)]
enum StakingCommand {
    /// Show staking info.
    Info,
    /// Start staking if it is disabled.
    Start,
}

#[derive(Subcommand)]
enum PeersCommand {
    /// List connected peers.
    List,
    /// Re-add peers missing from the peer list.
    Reconnect {
        /// Endpoints (`ip:port`); defaults to `monitor.reconnect_peers`.
        endpoints: Vec<String>,
    },
}

#[derive(Args)]
struct OutputsArgs {
    /// Only outputs with more than this many confirmations.
    #[arg(long)]
    min_confirmations: Option<u64>,
}

/// Fee and coin-selection overrides shared by the spending commands.
#[derive(Args, Clone)]
struct TxOverrides {
    /// Fee per transaction in coins (default: `transaction.fee`).
    #[arg(long)]
    fee: Option<String>,

    /// Change destination when sweeping: first-coin-address or destination.
    #[arg(long)]
    change_policy: Option<ChangePolicy>,
}

#[derive(Args)]
struct ConsolidateArgs {
    /// Address receiving the consolidated value.
    #[arg(long)]
    destination: String,

    /// Outputs per transaction (default: `transaction.batch_size`).
    #[arg(long)]
    batch_size: Option<usize>,

    /// Only outputs with more than this many confirmations.
    #[arg(long)]
    min_confirmations: Option<u64>,

    /// Show the batches without building or broadcasting.
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    tx: TxOverrides,
}

#[derive(Args)]
struct SendArgs {
    /// Destination address.
    #[arg(long)]
    destination: String,

    /// Amount for the destination in coins. Requires --change-address.
    #[arg(long, requires = "change_address")]
    amount: Option<String>,

    /// Change address. Requires --amount.
    #[arg(long, requires = "amount")]
    change_address: Option<String>,

    /// Comma-separated output indices; prompts when omitted.
    #[arg(long)]
    indices: Option<String>,

    /// Only list outputs with more than this many confirmations.
    #[arg(long)]
    min_confirmations: Option<u64>,

    /// Auxiliary OP_RETURN payload.
    #[arg(long)]
    op_return: Option<String>,

    #[command(flatten)]
    tx: TxOverrides,
}

#[derive(Args)]
struct CrossChainArgs {
    /// Mainchain address to credit (default: `monitor.cross_chain.mainchain_address`).
    #[arg(long)]
    mainchain_address: Option<String>,

    /// Federation multisig address; looked up from the gateway when unset.
    #[arg(long)]
    multisig: Option<String>,

    /// Show the batches without building or broadcasting.
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    tx: TxOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    let node = node_client(&config, cli.node)?;

    match cli.command {
        Commands::Balance => balance(&node, &config).await,
        Commands::Wallets => wallets(&node).await,
        Commands::Outputs(args) => outputs(&node, &config, args).await,
        Commands::Consolidate(args) => {
            if !args.dry_run {
                ensure_password(&mut config)?;
            }
            consolidate_cmd(&node, &config, args).await
        }
        Commands::Send(args) => {
            ensure_password(&mut config)?;
            send(&node, &config, args).await
        }
        Commands::CrossChain(args) => {
            if !args.dry_run {
                ensure_password(&mut config)?;
            }
            cross_chain(&node, &config, args).await
        }
        Commands::Staking { action } => match action {
            StakingCommand::Info => staking_info(&node).await,
            StakingCommand::Start => {
                ensure_password(&mut config)?;
                staking_start(&node, &config).await
            }
        },
        Commands::Peers { action } => match action {
            PeersCommand::List => peers_list(&node).await,
            PeersCommand::Reconnect { endpoints } => peers_reconnect(&node, &config, endpoints).await,
        },
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<OperatorConfig> {
    let path = path.map(PathBuf::from).unwrap_or_else(OperatorConfig::default_path);
    OperatorConfig::load(&path)
        .with_context(|| format!("Failed to load operator config from {}", path.display()))
}

fn node_client(config: &OperatorConfig, node: Node) -> Result<NodeClient> {
    let url = match node {
        Node::Primary => &config.nodes.primary,
        Node::Secondary => &config.nodes.secondary,
    };
    NodeClient::with_timeout(url, config.nodes.timeout_secs.map(Duration::from_secs))
        .with_context(|| format!("Invalid node URL {url}"))
}

/// Prompt for the wallet password when the config leaves it empty.
fn ensure_password(config: &mut OperatorConfig) -> Result<()> {
    if config.wallet.password.is_empty() {
        config.wallet.password =
            rpassword::prompt_password(format!("Password for wallet '{}': ", config.wallet.name))
                .context("Failed to read password")?;
    }
    Ok(())
}

fn fee_units(config: &OperatorConfig, overrides: &TxOverrides) -> Result<u64> {
    let fee = overrides.fee.as_deref().unwrap_or(&config.transaction.fee);
    parse_coins(fee).with_context(|| format!("Invalid fee '{fee}'"))
}

async fn balance(node: &NodeClient, config: &OperatorConfig) -> Result<()> {
    let balance = node
        .wallet_balance(&config.wallet.name)
        .await
        .context("Failed to fetch wallet balance")?;

    println!("Wallet: {}", config.wallet.name);
    for account in &balance.balances {
        println!(
            "  {:<20} confirmed {:>20}  unconfirmed {:>20}  spendable {:>20}",
            account.account_name,
            format_coins(account.amount_confirmed),
            signed_coins(account.amount_unconfirmed),
            format_coins(account.spendable_amount),
        );
    }
    println!("Total confirmed: {}", format_coins(balance.total_confirmed()));
    println!("Total spendable: {}", format_coins(balance.total_spendable()));
    Ok(())
}

fn signed_coins(units: i64) -> String {
    let abs = format_coins(units.unsigned_abs());
    if units < 0 { format!("-{abs}") } else { abs }
}

async fn wallets(node: &NodeClient) -> Result<()> {
    let list = node.list_wallets().await.context("Failed to list wallets")?;
    for name in &list.wallet_names {
        let accounts = node
            .accounts(name)
            .await
            .with_context(|| format!("Failed to list accounts of '{name}'"))?;
        println!("{name}: {}", accounts.join(", "));
    }
    for name in &list.watch_only_wallets {
        println!("{name} (watch-only)");
    }
    Ok(())
}

async fn outputs(node: &NodeClient, config: &OperatorConfig, args: OutputsArgs) -> Result<()> {
    let mut listing = node
        .spendable_outputs(&config.wallet.name, &config.wallet.account)
        .await
        .context("Failed to fetch spendable outputs")?;
    if let Some(min) = args.min_confirmations {
        listing = filter_eligible(listing, min);
    }
    render_outputs(&listing, &mut io::stdout().lock())?;
    let total = listing.iter().map(|o| o.amount).fold(0u64, u64::saturating_add);
    println!("{} output(s), {} total", listing.len(), format_coins(total));
    Ok(())
}

async fn consolidate_cmd(
    node: &NodeClient,
    config: &OperatorConfig,
    args: ConsolidateArgs,
) -> Result<()> {
    let mut plan = ConsolidationPlan::from_config(&config.transaction, args.destination)?;
    plan.fee = fee_units(config, &args.tx)?;
    if let Some(size) = args.batch_size {
        plan.batch_size = NonZeroUsize::new(size).context("--batch-size must be at least 1")?;
    }
    if let Some(min) = args.min_confirmations {
        plan.min_confirmations = min;
    }
    if args.tx.change_policy.is_some() {
        plan.change_policy = args.tx.change_policy;
    }
    plan.dry_run = args.dry_run;

    let report = consolidate(node, &config.wallet, &plan)
        .await
        .context("Consolidation failed")?;
    print_report(&report);
    finish(report)
}

async fn send(node: &NodeClient, config: &OperatorConfig, args: SendArgs) -> Result<()> {
    let mut listing = node
        .spendable_outputs(&config.wallet.name, &config.wallet.account)
        .await
        .context("Failed to fetch spendable outputs")?;
    if let Some(min) = args.min_confirmations {
        listing = filter_eligible(listing, min);
    }
    if listing.is_empty() {
        bail!("No spendable outputs");
    }

    let coins = match args.indices.as_deref() {
        Some(indices) => PresetIndices(parse_indices(indices)?).select(&listing)?,
        None => InteractiveSelection::new(io::stdin().lock(), io::stdout()).select(&listing)?,
    };

    let mut builder = TransactionBuilder::new(fee_units(config, &args.tx)?);
    builder.set_destination(args.destination);
    if let Some(policy) = args.tx.change_policy.or(config.transaction.change_policy) {
        builder.set_change_policy(policy);
    }
    if let (Some(amount), Some(change)) = (args.amount.as_deref(), args.change_address) {
        let units = parse_coins(amount).with_context(|| format!("Invalid amount '{amount}'"))?;
        builder.set_amount(units).set_change_address(change);
    }
    if let Some(data) = args.op_return {
        builder.set_op_return_data(data);
    }

    let prepared = builder.build(&coins, &config.wallet)?;
    println!(
        "Spending {} input(s) worth {}: {} to {}, fee {}, change to {}",
        coins.len(),
        format_coins(prepared.input_total),
        format_coins(prepared.amount_for_destination),
        prepared.request.recipients[0].destination_address,
        format_coins(prepared.fee),
        prepared.request.change_address,
    );

    let receipt = build_and_broadcast(node, &prepared.request)
        .await
        .context("Transaction was not sent")?;
    println!("Transaction {}", receipt.transaction_id);
    Ok(())
}

async fn cross_chain(node: &NodeClient, config: &OperatorConfig, args: CrossChainArgs) -> Result<()> {
    let configured = config.monitor.cross_chain.as_ref();
    let Some(mainchain) = args
        .mainchain_address
        .or_else(|| configured.map(|c| c.mainchain_address.clone()))
    else {
        bail!("No mainchain address: pass --mainchain-address or set monitor.cross_chain");
    };
    let multisig = args
        .multisig
        .or_else(|| configured.and_then(|c| c.multisig_address.clone()));

    let destination = federation_deposit_address(node, multisig.as_deref())
        .await
        .context("Could not determine the federation deposit address")?;
    info!(%destination, %mainchain, "Cross-chain sweep");

    let mut plan = ConsolidationPlan::from_config(&config.transaction, destination)?;
    plan.fee = fee_units(config, &args.tx)?;
    if args.tx.change_policy.is_some() {
        plan.change_policy = args.tx.change_policy;
    }
    plan.op_return_data = Some(mainchain);
    plan.dry_run = args.dry_run;

    let report = consolidate(node, &config.wallet, &plan)
        .await
        .context("Cross-chain transfer failed")?;
    print_report(&report);
    finish(report)
}

fn print_report(report: &ConsolidationReport) {
    println!(
        "{} output(s) fetched, {} eligible, {} left out of the last partial batch",
        report.fetched, report.eligible, report.dropped
    );
    for (n, batch) in report.batches.iter().enumerate() {
        let txid = batch
            .receipt
            .as_ref()
            .map_or("(dry run)", |r| r.transaction_id.as_str());
        println!(
            "  batch {n}: {} input(s), {} -> {txid}",
            batch.inputs,
            format_coins(batch.amount)
        );
    }
    println!("Total sent: {}", format_coins(report.total_sent()));
}

fn finish(report: ConsolidationReport) -> Result<()> {
    match report.failure {
        Some(failure) => Err(anyhow::Error::new(failure.error).context(format!(
            "Batch {} failed; {} later batch(es) not attempted",
            failure.batch, failure.skipped
        ))),
        None => Ok(()),
    }
}

async fn staking_info(node: &NodeClient) -> Result<()> {
    let info = node.staking_info().await.context("Failed to fetch staking info")?;
    println!("Enabled:          {}", info.enabled);
    println!("Staking:          {}", info.staking);
    println!("Weight:           {}", format_coins(info.weight));
    println!("Network weight:   {}", format_coins(info.net_stake_weight));
    println!("Expected time:    {}s", info.expected_time);
    if let Some(errors) = info.errors.filter(|e| !e.is_empty()) {
        println!("Errors:           {errors}");
    }
    Ok(())
}

async fn staking_start(node: &NodeClient, config: &OperatorConfig) -> Result<()> {
    match ensure_staking(node, &config.wallet)
        .await
        .context("Failed to start staking")?
    {
        StakingAction::AlreadyEnabled => println!("Staking already enabled"),
        StakingAction::Started => println!("Staking started for wallet '{}'", config.wallet.name),
    }
    Ok(())
}

async fn peers_list(node: &NodeClient) -> Result<()> {
    let peers = node.peer_info().await.context("Failed to fetch peer info")?;
    for peer in &peers {
        println!(
            "{:>4}  {:<24}  {:<8}  {:<28}  height {}",
            peer.id,
            normalize_endpoint(&peer.addr),
            if peer.inbound { "inbound" } else { "outbound" },
            peer.subver,
            peer.startingheight
        );
    }
    println!("{} peer(s)", peers.len());
    Ok(())
}

async fn peers_reconnect(
    node: &NodeClient,
    config: &OperatorConfig,
    endpoints: Vec<String>,
) -> Result<()> {
    let endpoints = if endpoints.is_empty() {
        config.monitor.reconnect_peers.clone()
    } else {
        endpoints
    };
    if endpoints.is_empty() {
        bail!("No peers given and monitor.reconnect_peers is empty");
    }

    let report = reconnect_peers(node, &endpoints)
        .await
        .context("Failed to reconnect peers")?;
    for peer in &report.connected {
        println!("{peer}: connected");
    }
    for peer in &report.reconnected {
        println!("{peer}: re-added");
    }
    for (peer, error) in &report.failed {
        println!("{peer}: failed ({error})");
    }
    if !report.failed.is_empty() {
        bail!("{} peer(s) could not be re-added", report.failed.len());
    }
    Ok(())
}
