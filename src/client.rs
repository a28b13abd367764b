use crate::{
    config::{
        self,
        AddressBook,
        ChainTarget,
    },
    session::{
        ChainSigner,
        WalletSession,
    },
    tictactoe_abi::{
        GameCanceledFilter,
        GameCreatedFilter,
        GameEndedFilter,
        GameJoinedFilter,
        TicTacToe,
        WinByTimeoutFilter,
    },
    ui,
    views::{
        self,
        Board,
        GameMeta,
        GameState,
        Symbol,
    },
    wallets,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use ethers::{
    contract::{
        ContractCall,
        EthEvent,
    },
    middleware::SignerMiddleware,
    providers::{
        Http,
        Middleware,
        Provider,
    },
    types::{
        Address,
        Filter,
        H256,
        Log,
        TxHash,
        U64,
        U256,
        transaction::eip2718::TypedTransaction,
    },
    utils::parse_ether,
};
use futures::StreamExt;
use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
    warn,
};

// Fixed transaction parameters, not estimated (matches the deployed game's
// known gas profile on Era-family chains).
pub const TX_GAS_LIMIT: u64 = 300_000;
pub const FIXED_FEE_PER_GAS_WEI: u64 = 250_000_000; // 0.25 gwei

const LOG_POLL_INTERVAL: Duration = Duration::from_secs(2);
const FULL_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const ERROR_HISTORY_CAP: usize = 50;
const ERRORS_SHOWN: usize = 5;

#[derive(Clone, Debug)]
pub enum WalletConfig {
    Keystore { name: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub chain: ChainTarget,
    pub rpc_url: String,
    pub contract_override: Option<Address>,
    pub wallet: Option<WalletConfig>,
    pub initial_game: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Screen {
    Home,
    Lobby,
    Game { id: u64 },
    InvalidGameId { raw: String },
}

#[derive(Clone, Debug)]
pub struct GameView {
    pub id: u64,
    pub meta: Option<GameMeta>,
    pub board: Board,
    pub error: Option<String>,
    pub your_symbol: Option<Symbol>,
    pub your_turn: bool,
}

impl GameView {
    fn loading(id: u64) -> Self {
        Self {
            id,
            meta: None,
            board: Board::default(),
            error: None,
            your_symbol: None,
            your_turn: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub screen: Screen,
    pub chain_name: String,
    pub chain_id: u64,
    pub address: Option<Address>,
    pub connectors: Vec<String>,
    pub active_games: Vec<GameMeta>,
    pub finished_games: Vec<GameMeta>,
    pub game: Option<GameView>,
    pub tx_pending: bool,
    pub status: String,
    pub errors: Vec<String>,
}

/// Read-only contract access over a shared HTTP provider.
#[derive(Clone)]
pub struct ChainReader {
    provider: Arc<Provider<Http>>,
    contract: TicTacToe<Provider<Http>>,
    address: Address,
}

impl ChainReader {
    pub fn new(provider: Arc<Provider<Http>>, address: Address) -> Self {
        let contract = TicTacToe::new(address, provider.clone());
        Self {
            provider,
            contract,
            address,
        }
    }

    pub async fn game_count(&self) -> Result<u64> {
        let count: U256 = self
            .contract
            .game_count()
            .call()
            .await
            .wrap_err("gameCount read failed")?;
        u64::try_from(count).map_err(|_| eyre!("gameCount out of range: {count}"))
    }

    /// Lobby fetch: enumerate `[0, gameCount)` and read each record, treating
    /// an individual failed read as absence rather than a fatal error.
    pub async fn fetch_lobby(&self) -> Result<Vec<GameMeta>> {
        let count = self.game_count().await?;
        let mut reads = Vec::with_capacity(count as usize);
        for id in 0..count {
            match self.contract.get_game_meta(U256::from(id)).call().await {
                Ok(raw) => reads.push((id, Some(raw))),
                Err(err) => {
                    warn!(game_id = id, error = %err, "game metadata read failed");
                    reads.push((id, None));
                }
            }
        }
        Ok(views::collect_lobby(reads))
    }

    pub async fn fetch_game(&self, id: u64) -> Result<(GameMeta, Board)> {
        let flat = self
            .contract
            .get_board_state(U256::from(id))
            .call()
            .await
            .wrap_err_with(|| format!("board read failed for game {id}"))?;
        let raw = self
            .contract
            .get_game_meta(U256::from(id))
            .call()
            .await
            .wrap_err_with(|| format!("metadata read failed for game {id}"))?;
        let meta = views::decode_game(id, raw)?;
        let board = Board::from_flat(flat)?;
        Ok((meta, board))
    }
}

/// State-mutating contract calls, signed by the connected wallet. Gas and
/// fee-per-gas are fixed rather than estimated.
pub struct TxSubmitter {
    contract: TicTacToe<ChainSigner>,
}

type WriteCall = ContractCall<ChainSigner, ()>;

fn apply_fixed_fees(tx: &mut TypedTransaction) {
    tx.set_gas(TX_GAS_LIMIT);
    if let TypedTransaction::Eip1559(inner) = tx {
        inner.max_fee_per_gas = Some(U256::from(FIXED_FEE_PER_GAS_WEI));
        inner.max_priority_fee_per_gas = Some(U256::from(FIXED_FEE_PER_GAS_WEI));
    }
}

impl TxSubmitter {
    pub fn new(address: Address, signer: Arc<ChainSigner>) -> Self {
        Self {
            contract: TicTacToe::new(address, signer),
        }
    }

    pub async fn create_game(&self, symbol: Symbol, bet: U256) -> Result<TxHash> {
        let call = self.contract.create_game(symbol.code()).value(bet);
        Self::settle(call).await
    }

    pub async fn join_game(&self, id: u64, bet: U256) -> Result<TxHash> {
        let call = self.contract.join_game(U256::from(id)).value(bet);
        Self::settle(call).await
    }

    pub async fn cancel_game(&self, id: u64) -> Result<TxHash> {
        let call = self.contract.cancel_game(U256::from(id));
        Self::settle(call).await
    }

    pub async fn make_move(&self, id: u64, x: u8, y: u8) -> Result<TxHash> {
        let call = self.contract.make_move(U256::from(id), x, y);
        Self::settle(call).await
    }

    async fn settle(mut call: WriteCall) -> Result<TxHash> {
        apply_fixed_fees(&mut call.tx);
        let pending = call.send().await.map_err(|e| eyre!("{e}"))?;
        let tx_hash = *pending;
        info!(?tx_hash, "transaction submitted");
        let receipt = pending
            .await
            .map_err(|e| eyre!("{e}"))?
            .ok_or_else(|| eyre!("transaction {tx_hash:?} dropped from the mempool"))?;
        if receipt.status == Some(U64::zero()) {
            return Err(eyre!("transaction {tx_hash:?} reverted on chain"));
        }
        Ok(tx_hash)
    }
}

pub fn lifecycle_event_name(topic: H256) -> Option<&'static str> {
    if topic == GameCreatedFilter::signature() {
        Some("GameCreated")
    } else if topic == GameJoinedFilter::signature() {
        Some("GameJoined")
    } else if topic == GameCanceledFilter::signature() {
        Some("GameCanceled")
    } else if topic == GameEndedFilter::signature() {
        Some("GameEnded")
    } else if topic == WinByTimeoutFilter::signature() {
        Some("WinByTimeout")
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WatchTarget {
    Idle,
    Lobby,
    Game(u64),
}

pub enum WorkerCommand {
    Watch(WatchTarget),
    FetchNow,
    Shutdown,
}

pub enum WorkerEvent {
    Lobby(Vec<GameMeta>),
    Game {
        id: u64,
        meta: GameMeta,
        board: Board,
    },
    GameUnavailable {
        id: u64,
        reason: String,
    },
    Connectivity(String),
    Activity {
        event: &'static str,
    },
}

/// Background read loop. Owns every contract read for the lifetime of the
/// UI: re-fetches the watched screen on command, on observed lifecycle
/// events, and on a slow safety interval. Shutting the channel down cancels
/// the subscription with the view.
pub async fn chain_worker(
    reader: ChainReader,
    mut cmd_rx: mpsc::UnboundedReceiver<WorkerCommand>,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut target = WatchTarget::Idle;
    let mut next_block: Option<U64> = None;
    let mut log_ticker = time::interval(LOG_POLL_INTERVAL);
    let mut refresh_ticker = time::interval(FULL_REFRESH_INTERVAL);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    None | Some(WorkerCommand::Shutdown) => break,
                    Some(WorkerCommand::Watch(new_target)) => {
                        target = new_target;
                        fetch_target(&reader, target, &event_tx).await;
                    }
                    Some(WorkerCommand::FetchNow) => {
                        fetch_target(&reader, target, &event_tx).await;
                    }
                }
            }
            _ = log_ticker.tick() => {
                match poll_lifecycle_logs(&reader, &mut next_block).await {
                    Ok(events) => {
                        // each observed event triggers an independent re-fetch
                        for event in events {
                            let _ = event_tx.send(WorkerEvent::Activity { event });
                            fetch_target(&reader, target, &event_tx).await;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "log poll failed");
                    }
                }
            }
            _ = refresh_ticker.tick() => {
                fetch_target(&reader, target, &event_tx).await;
            }
        }
    }
}

async fn fetch_target(
    reader: &ChainReader,
    target: WatchTarget,
    event_tx: &mpsc::UnboundedSender<WorkerEvent>,
) {
    match target {
        WatchTarget::Idle => {}
        WatchTarget::Lobby => match reader.fetch_lobby().await {
            Ok(games) => {
                let _ = event_tx.send(WorkerEvent::Lobby(games));
            }
            Err(err) => {
                let _ = event_tx.send(WorkerEvent::Connectivity(err.to_string()));
            }
        },
        WatchTarget::Game(id) => match reader.fetch_game(id).await {
            Ok((meta, board)) => {
                let _ = event_tx.send(WorkerEvent::Game { id, meta, board });
            }
            Err(err) => {
                let _ = event_tx.send(WorkerEvent::GameUnavailable {
                    id,
                    reason: err.to_string(),
                });
            }
        },
    }
}

fn recognized_lifecycle_events(logs: &[Log]) -> Vec<&'static str> {
    logs.iter()
        .filter_map(|log| log.topics.first())
        .filter_map(|topic| lifecycle_event_name(*topic))
        .collect()
}

/// Scans new blocks for the contract's lifecycle events, in log order.
async fn poll_lifecycle_logs(
    reader: &ChainReader,
    next_block: &mut Option<U64>,
) -> Result<Vec<&'static str>> {
    let latest = reader
        .provider
        .get_block_number()
        .await
        .wrap_err("block number read failed")?;
    let from = match *next_block {
        Some(b) => b,
        None => {
            // First poll establishes the baseline; history is not replayed.
            *next_block = Some(latest + 1);
            return Ok(Vec::new());
        }
    };
    if latest < from {
        return Ok(Vec::new());
    }
    let filter = Filter::new()
        .address(reader.address)
        .from_block(from)
        .to_block(latest);
    let logs = reader
        .provider
        .get_logs(&filter)
        .await
        .wrap_err("log read failed")?;
    *next_block = Some(latest + 1);
    Ok(recognized_lifecycle_events(&logs))
}

pub struct AppController {
    pub session: WalletSession,
    reader: ChainReader,
    chain: ChainTarget,
    contract_address: Address,
    screen: Screen,
    active_games: Vec<GameMeta>,
    finished_games: Vec<GameMeta>,
    game: Option<GameView>,
    status: String,
    errors: Vec<String>,
    tx_pending: bool,
}

impl AppController {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let AppConfig {
            chain,
            rpc_url,
            contract_override,
            wallet,
            initial_game: _,
        } = config;

        let mut book = AddressBook::load_default()?;
        let contract_address = config::resolve_contract(&book, chain, contract_override)?;
        if contract_override.is_some() {
            // remember the override so later runs on this chain need no flag
            book.record(chain.chain_id(), contract_address);
            if let Err(err) = book.save_default() {
                warn!(error = %err, "failed to persist contract override");
            }
        }

        info!(%chain, %rpc_url, ?contract_address, "connecting");
        let provider = Provider::<Http>::try_from(rpc_url.as_str())
            .wrap_err_with(|| format!("invalid RPC URL {rpc_url}"))?;
        let provider = Arc::new(provider);
        let reader = ChainReader::new(provider.clone(), contract_address);

        let (connectors, signer) = match wallet {
            Some(WalletConfig::Keystore { name, dir }) => {
                let connectors = wallets::list_wallets(&dir)?;
                let descriptor = wallets::find_wallet(&dir, &name)?;
                let local = wallets::unlock_wallet(&descriptor, chain.chain_id())?;
                let signer = Arc::new(SignerMiddleware::new((*provider).clone(), local));
                (connectors, Some(signer))
            }
            None => {
                let dir = wallets::default_wallet_dir()?;
                (wallets::list_wallets(&dir).unwrap_or_default(), None)
            }
        };
        let session = WalletSession::new(chain.chain_id(), connectors, signer);

        Ok(Self {
            session,
            reader,
            chain,
            contract_address,
            screen: Screen::Home,
            active_games: Vec::new(),
            finished_games: Vec::new(),
            game: None,
            status: String::from("Ready"),
            errors: Vec::new(),
            tx_pending: false,
        })
    }

    pub fn reader(&self) -> ChainReader {
        self.reader.clone()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn tx_pending(&self) -> bool {
        self.tx_pending
    }

    pub fn set_tx_pending(&mut self, pending: bool) {
        self.tx_pending = pending;
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
        if self.errors.len() > ERROR_HISTORY_CAP {
            let drain = self.errors.len() - ERROR_HISTORY_CAP;
            self.errors.drain(0..drain);
        }
    }

    pub fn show_home(&mut self) -> WorkerCommand {
        self.screen = Screen::Home;
        WorkerCommand::Watch(WatchTarget::Idle)
    }

    pub fn show_lobby(&mut self) -> WorkerCommand {
        self.screen = Screen::Lobby;
        self.set_status("Loading lobby…");
        WorkerCommand::Watch(WatchTarget::Lobby)
    }

    pub fn open_game(&mut self, id: u64) -> WorkerCommand {
        self.screen = Screen::Game { id };
        self.game = Some(GameView::loading(id));
        self.set_status(format!("Loading game #{id}…"));
        WorkerCommand::Watch(WatchTarget::Game(id))
    }

    /// Route parsing happens before any read: a malformed id never reaches
    /// the chain and lands on a terminal error screen instead.
    pub fn open_route(&mut self, raw: &str) -> Option<WorkerCommand> {
        match views::parse_game_id(raw) {
            Some(id) => Some(self.open_game(id)),
            None => {
                self.screen = Screen::InvalidGameId {
                    raw: raw.to_string(),
                };
                self.game = None;
                self.set_status("Invalid game ID");
                Some(WorkerCommand::Watch(WatchTarget::Idle))
            }
        }
    }

    pub fn connect(&mut self) {
        if self.session.is_connected() {
            self.set_status("Wallet already connected");
            return;
        }
        match self.session.connect() {
            Ok(address) => {
                self.set_status(format!("Connected as {}", views::short_address(address)));
            }
            Err(err) => {
                self.push_error(format!("Connect failed: {err}"));
            }
        }
        self.recompute_game_derivations();
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
        self.set_status("Wallet disconnected");
        self.recompute_game_derivations();
    }

    fn submitter(&self) -> Result<TxSubmitter> {
        let signer = self.session.signer()?;
        Ok(TxSubmitter::new(self.contract_address, signer))
    }

    pub async fn create_game(&mut self, symbol: Symbol, bet_text: &str) -> Result<TxHash> {
        let bet: U256 = parse_ether(bet_text)
            .map_err(|e| eyre!("invalid wager '{bet_text}': {e}"))?;
        let submitter = self.submitter()?;
        submitter.create_game(symbol, bet).await
    }

    pub async fn join_game(&mut self, id: u64) -> Result<TxHash> {
        let game = self
            .active_games
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| eyre!("game #{id} is not open"))?;
        if game.state != GameState::WaitingForPlayer {
            return Err(eyre!("game #{id} is not waiting for a player"));
        }
        if game.is_creator(self.session.address()) {
            return Err(eyre!("cannot join your own game"));
        }
        let bet = game.bet;
        let submitter = self.submitter()?;
        submitter.join_game(id, bet).await
    }

    pub async fn cancel_game(&mut self, id: u64) -> Result<TxHash> {
        let game = self
            .active_games
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| eyre!("game #{id} is not open"))?;
        if game.state != GameState::WaitingForPlayer {
            return Err(eyre!("game #{id} can no longer be canceled"));
        }
        if !game.is_creator(self.session.address()) {
            return Err(eyre!("only the creator can cancel game #{id}"));
        }
        let submitter = self.submitter()?;
        submitter.cancel_game(id).await
    }

    pub async fn play_cell(&mut self, x: usize, y: usize) -> Result<TxHash> {
        let view = self
            .game
            .as_ref()
            .ok_or_else(|| eyre!("no game open"))?;
        if view.meta.is_none() {
            return Err(eyre!("game still loading"));
        }
        let cell = view.board.cell(x, y);
        if !views::cell_interactive(cell, view.your_turn, self.tx_pending) {
            return Err(eyre!("that square cannot be played right now"));
        }
        let id = view.id;
        let submitter = self.submitter()?;
        submitter.make_move(id, x as u8, y as u8).await
    }

    pub fn apply_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Lobby(games) => {
                let (active, finished) = views::partition_games(games);
                self.active_games = active;
                self.finished_games = finished;
                if self.status.starts_with("Loading lobby") {
                    self.set_status("Ready");
                }
            }
            WorkerEvent::Game { id, meta, board } => {
                if !matches!(self.screen, Screen::Game { id: current } if current == id) {
                    // stale response for a view we already left
                    return;
                }
                self.game = Some(GameView {
                    id,
                    meta: Some(meta),
                    board,
                    error: None,
                    your_symbol: None,
                    your_turn: false,
                });
                self.recompute_game_derivations();
                if self.status.starts_with("Loading game") {
                    self.set_status("Ready");
                }
            }
            WorkerEvent::GameUnavailable { id, reason } => {
                warn!(game_id = id, %reason, "game read failed");
                if !matches!(self.screen, Screen::Game { id: current } if current == id) {
                    return;
                }
                if let Some(view) = self.game.as_mut() {
                    view.error = Some(String::from("Game not found on chain"));
                }
            }
            WorkerEvent::Connectivity(message) => {
                self.push_error(message);
            }
            WorkerEvent::Activity { event } => {
                self.set_status(format!("{event} observed on chain, refreshing…"));
            }
        }
    }

    fn recompute_game_derivations(&mut self) {
        let viewer = self.session.address();
        if let Some(view) = self.game.as_mut() {
            if let Some(meta) = view.meta.as_ref() {
                view.your_symbol = meta.viewer_symbol(viewer);
                view.your_turn = meta.is_viewers_turn(viewer);
            }
        }
    }

    pub fn build_snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            screen: self.screen.clone(),
            chain_name: self.chain.to_string(),
            chain_id: self.chain.chain_id(),
            address: self.session.address(),
            connectors: self.session.connector_names(),
            active_games: self.active_games.clone(),
            finished_games: self.finished_games.clone(),
            game: self.game.clone(),
            tx_pending: self.tx_pending,
            status: self.status.clone(),
            errors: self
                .errors
                .iter()
                .rev()
                .take(ERRORS_SHOWN)
                .cloned()
                .collect(),
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let initial_game = config.initial_game.clone();
    let mut controller = AppController::new(config).await?;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(chain_worker(controller.reader(), cmd_rx, event_tx));

    let mut ui_state = ui::UiState::default();
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        &mut controller,
        &mut ui_state,
        cmd_tx.clone(),
        event_rx,
        initial_game,
    )
    .await;
    ui::terminal_exit()?;

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    let _ = worker.await;
    res
}

async fn run_loop(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    cmd_tx: mpsc::UnboundedSender<WorkerCommand>,
    mut event_rx: mpsc::UnboundedReceiver<WorkerEvent>,
    initial_game: Option<String>,
) -> Result<()> {
    let mut input = crossterm::event::EventStream::new();

    let initial_cmd = match initial_game.as_deref() {
        Some(raw) => controller.open_route(raw),
        None => Some(controller.show_home()),
    };
    if let Some(cmd) = initial_cmd {
        let _ = cmd_tx.send(cmd);
    }
    ui::draw(ui_state, &controller.build_snapshot())?;

    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    warn!("chain worker channel closed");
                    break;
                };
                controller.apply_worker_event(event);
                ui::draw(ui_state, &controller.build_snapshot())?;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw = input.next() => {
                let Some(raw) = raw else { break; };
                let raw = raw.wrap_err("terminal input failed")?;
                let Some(ev) = ui::interpret_event(ui_state, raw) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::GoHome => {
                        let cmd = controller.show_home();
                        let _ = cmd_tx.send(cmd);
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::GoLobby | ui::UserEvent::Back => {
                        let cmd = controller.show_lobby();
                        let _ = cmd_tx.send(cmd);
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::OpenGame(id) => {
                        let cmd = controller.open_game(id);
                        let _ = cmd_tx.send(cmd);
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::GotoSubmitted(raw) => {
                        if let Some(cmd) = controller.open_route(&raw) {
                            let _ = cmd_tx.send(cmd);
                        }
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::Connect => {
                        controller.connect();
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::Disconnect => {
                        controller.disconnect();
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::ConfirmCreate { symbol, bet } => {
                        controller.set_tx_pending(true);
                        controller.set_status(format!(
                            "Creating game as {} with {bet} ETH…",
                            symbol.label()
                        ));
                        ui::draw(ui_state, &controller.build_snapshot())?;
                        let outcome = controller.create_game(symbol, &bet).await;
                        controller.set_tx_pending(false);
                        match outcome {
                            Ok(_) => {
                                controller.set_status("Lobby created!");
                                let _ = cmd_tx.send(WorkerCommand::FetchNow);
                            }
                            Err(e) => controller.push_error(format!("Create failed: {e}")),
                        }
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::JoinGame(id) => {
                        controller.set_tx_pending(true);
                        controller.set_status(format!("Joining game #{id}…"));
                        ui::draw(ui_state, &controller.build_snapshot())?;
                        let outcome = controller.join_game(id).await;
                        controller.set_tx_pending(false);
                        match outcome {
                            Ok(_) => {
                                controller.set_status(format!("Joined game #{id}"));
                                let _ = cmd_tx.send(WorkerCommand::FetchNow);
                            }
                            Err(e) => controller.push_error(format!("Join failed: {e}")),
                        }
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::CancelGame(id) => {
                        controller.set_tx_pending(true);
                        controller.set_status(format!("Canceling game #{id}…"));
                        ui::draw(ui_state, &controller.build_snapshot())?;
                        let outcome = controller.cancel_game(id).await;
                        controller.set_tx_pending(false);
                        match outcome {
                            Ok(_) => {
                                controller.set_status(format!("Canceled game #{id}"));
                                let _ = cmd_tx.send(WorkerCommand::FetchNow);
                            }
                            Err(e) => controller.push_error(format!("Cancel failed: {e}")),
                        }
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                    ui::UserEvent::PlayCell { x, y } => {
                        controller.set_tx_pending(true);
                        controller.set_status("Sending move…");
                        ui::draw(ui_state, &controller.build_snapshot())?;
                        let outcome = controller.play_cell(x, y).await;
                        controller.set_tx_pending(false);
                        match outcome {
                            Ok(_) => {
                                controller.set_status("Move sent!");
                                let _ = cmd_tx.send(WorkerCommand::FetchNow);
                            }
                            Err(e) => controller.push_error(format!("Move failed: {e}")),
                        }
                        ui::draw(ui_state, &controller.build_snapshot())?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_topics_are_recognized() {
        assert_eq!(
            lifecycle_event_name(GameCreatedFilter::signature()),
            Some("GameCreated")
        );
        assert_eq!(
            lifecycle_event_name(GameJoinedFilter::signature()),
            Some("GameJoined")
        );
        assert_eq!(
            lifecycle_event_name(GameCanceledFilter::signature()),
            Some("GameCanceled")
        );
        assert_eq!(
            lifecycle_event_name(GameEndedFilter::signature()),
            Some("GameEnded")
        );
        assert_eq!(
            lifecycle_event_name(WinByTimeoutFilter::signature()),
            Some("WinByTimeout")
        );
        assert_eq!(lifecycle_event_name(H256::zero()), None);
    }

    #[test]
    fn every_lifecycle_log_in_a_batch_is_reported() {
        let with_topic = |topic: H256| Log {
            topics: vec![topic],
            ..Default::default()
        };
        let logs = vec![
            with_topic(GameCreatedFilter::signature()),
            with_topic(H256::zero()), // unrelated event on the same contract
            with_topic(GameJoinedFilter::signature()),
            with_topic(GameEndedFilter::signature()),
        ];
        assert_eq!(
            recognized_lifecycle_events(&logs),
            vec!["GameCreated", "GameJoined", "GameEnded"]
        );
        assert!(recognized_lifecycle_events(&[]).is_empty());
    }

    #[test]
    fn fixed_fees_are_applied_to_eip1559_requests() {
        let mut tx = TypedTransaction::Eip1559(Default::default());
        apply_fixed_fees(&mut tx);
        assert_eq!(tx.gas(), Some(&U256::from(TX_GAS_LIMIT)));
        match tx {
            TypedTransaction::Eip1559(inner) => {
                assert_eq!(inner.max_fee_per_gas, Some(U256::from(FIXED_FEE_PER_GAS_WEI)));
                assert_eq!(
                    inner.max_priority_fee_per_gas,
                    Some(U256::from(FIXED_FEE_PER_GAS_WEI))
                );
            }
            _ => unreachable!(),
        }
    }
}
