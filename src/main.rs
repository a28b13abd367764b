use color_eyre::eyre::{
    Result,
    eyre,
};
use tictactoe_tui::{
    client,
    config::ChainTarget,
    views,
    wallets,
};
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: tictactoe-tui [--era | --sepolia | --local] [--rpc-url <url>]\n\
         [--contract <address>] [--wallet <name>] [--wallet-dir <path>]\n\
         [--game <id>]\n\
         \n\
         Flags:\n\
           --era               Connect to zkSync Era mainnet (default RPC {})\n\
           --sepolia           Connect to zkSync Sepolia testnet (default RPC {})\n\
           --local             Connect to a local node (default RPC {})\n\
           --rpc-url <url>     Override the RPC URL for the selected network\n\
           --contract <addr>   Override the game contract address\n\
           --wallet <name>     Keystore wallet to unlock for playing\n\
           --wallet-dir <path> Override the keystore directory (defaults to ~/.tictactoe/wallets)\n\
           --game <id>         Open a game directly instead of the home screen",
        tictactoe_tui::config::DEFAULT_ERA_RPC_URL,
        tictactoe_tui::config::DEFAULT_SEPOLIA_RPC_URL,
        tictactoe_tui::config::DEFAULT_LOCAL_RPC_URL,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut chain_flag: Option<ChainTarget> = None;
    let mut custom_url: Option<String> = None;
    let mut contract: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut initial_game: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--era" => {
                if chain_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --era/--sepolia/--local"
                    ));
                }
                chain_flag = Some(ChainTarget::Era);
            }
            "--sepolia" => {
                if chain_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --era/--sepolia/--local"
                    ));
                }
                chain_flag = Some(ChainTarget::EraSepolia);
            }
            "--local" => {
                if chain_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --era/--sepolia/--local"
                    ));
                }
                chain_flag = Some(ChainTarget::LocalNode);
            }
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if custom_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                if chain_flag.is_none() {
                    return Err(eyre!(
                        "--rpc-url must follow a network flag (--era/--sepolia/--local)"
                    ));
                }
                custom_url = Some(url);
            }
            "--contract" => {
                let addr = args
                    .next()
                    .ok_or_else(|| eyre!("--contract requires an address argument"))?;
                if contract.is_some() {
                    return Err(eyre!("--contract may only be specified once"));
                }
                contract = Some(addr);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--game" => {
                let id = args
                    .next()
                    .ok_or_else(|| eyre!("--game requires a game id argument"))?;
                if initial_game.is_some() {
                    return Err(eyre!("--game may only be specified once"));
                }
                // kept as raw text; a malformed id routes to its own screen
                initial_game = Some(id);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let chain = chain_flag.unwrap_or(ChainTarget::Era);
    let rpc_url = custom_url.unwrap_or_else(|| chain.default_rpc_url().to_string());
    let contract_override = contract
        .as_deref()
        .map(views::parse_address)
        .transpose()?;

    let wallet = match wallet_name {
        Some(name) => {
            let dir = wallets::resolve_wallet_dir(wallet_dir.as_deref())?;
            Some(client::WalletConfig::Keystore { name, dir })
        }
        None => None,
    };

    Ok(client::AppConfig {
        chain,
        rpc_url,
        contract_override,
        wallet,
        initial_game,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to a file; stdout belongs to the terminal UI.
    let file_appender = tracing_appender::rolling::daily("logs", "tictactoe.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    tracing::info!("starting tictactoe client");
    color_eyre::install()?;
    let app_config = parse_cli_args()?;
    client::run_app(app_config).await
}
