use color_eyre::eyre::{
    Result,
    eyre,
};
use ethers::types::{
    Address,
    U256,
};

/// Raw `getGameMeta` tuple as returned by the contract:
/// (creator, opponent, creatorSymbol, turn, bet, state, winner, lastMoveTime).
pub type RawGameMeta = (Address, Address, u8, u8, U256, u8, Address, U256);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Symbol::X),
            2 => Some(Symbol::O),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Symbol::X => 1,
            Symbol::O => 2,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Symbol::X => "X",
            Symbol::O => "O",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    X,
    O,
}

impl Cell {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Cell::Empty),
            1 => Some(Cell::X),
            2 => Some(Cell::O),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Cell::Empty => "",
            Cell::X => "X",
            Cell::O => "O",
        }
    }
}

/// 3x3 board, row-major. Rebuilt wholesale from each contract read.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Board {
    rows: [[Cell; 3]; 3],
}

impl Board {
    pub fn from_flat(flat: [u8; 9]) -> Result<Self> {
        let mut rows = [[Cell::Empty; 3]; 3];
        for (i, code) in flat.iter().enumerate() {
            let cell = Cell::from_code(*code)
                .ok_or_else(|| eyre!("invalid cell value {} at index {}", code, i))?;
            rows[i / 3][i % 3] = cell;
        }
        Ok(Self { rows })
    }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.rows[y][x]
    }

    pub fn rows(&self) -> &[[Cell; 3]; 3] {
        &self.rows
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GameState {
    WaitingForPlayer,
    InProgress,
    Finished,
    Canceled,
}

impl GameState {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GameState::WaitingForPlayer),
            1 => Some(GameState::InProgress),
            2 => Some(GameState::Finished),
            3 => Some(GameState::Canceled),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, GameState::WaitingForPlayer | GameState::InProgress)
    }

    pub fn label(self) -> &'static str {
        match self {
            GameState::WaitingForPlayer => "Waiting for player",
            GameState::InProgress => "In progress",
            GameState::Finished => "Finished",
            GameState::Canceled => "Canceled",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameMeta {
    pub id: u64,
    pub creator: Address,
    pub opponent: Address,
    pub creator_symbol: Symbol,
    pub turn: Option<Symbol>,
    pub bet: U256,
    pub state: GameState,
    pub winner: Address,
    pub last_move_time: u64,
}

impl GameMeta {
    /// Symbol the given viewer plays as: creator gets the recorded symbol,
    /// the opponent gets the opposite one, anyone else (or no wallet) none.
    /// Addresses are canonical 20-byte values, so hex case never matters.
    pub fn viewer_symbol(&self, viewer: Option<Address>) -> Option<Symbol> {
        let viewer = viewer?;
        if viewer == self.creator {
            Some(self.creator_symbol)
        } else if viewer == self.opponent {
            Some(self.creator_symbol.opposite())
        } else {
            None
        }
    }

    pub fn is_viewers_turn(&self, viewer: Option<Address>) -> bool {
        if self.state != GameState::InProgress {
            return false;
        }
        match (self.viewer_symbol(viewer), self.turn) {
            (Some(mine), Some(turn)) => mine == turn,
            _ => false,
        }
    }

    pub fn is_creator(&self, viewer: Option<Address>) -> bool {
        viewer.map(|v| v == self.creator).unwrap_or(false)
    }
}

pub fn decode_game(id: u64, raw: RawGameMeta) -> Result<GameMeta> {
    let (creator, opponent, creator_symbol, turn, bet, state, winner, last_move_time) =
        raw;
    let creator_symbol = Symbol::from_code(creator_symbol)
        .ok_or_else(|| eyre!("game {}: invalid creator symbol {}", id, creator_symbol))?;
    let state = GameState::from_code(state)
        .ok_or_else(|| eyre!("game {}: invalid state {}", id, state))?;
    Ok(GameMeta {
        id,
        creator,
        opponent,
        creator_symbol,
        turn: Symbol::from_code(turn),
        bet,
        state,
        winner,
        last_move_time: last_move_time.low_u64(),
    })
}

/// Builds the lobby list from per-id read results. A failed read or an
/// undecodable/vacant record is dropped; surviving games keep id order.
pub fn collect_lobby(
    reads: impl IntoIterator<Item = (u64, Option<RawGameMeta>)>,
) -> Vec<GameMeta> {
    let mut games = Vec::new();
    for (id, raw) in reads {
        let Some(raw) = raw else {
            continue;
        };
        if raw.0 == Address::zero() {
            continue;
        }
        match decode_game(id, raw) {
            Ok(meta) => games.push(meta),
            Err(err) => {
                tracing::warn!(game_id = id, error = %err, "dropping undecodable game");
            }
        }
    }
    games
}

/// Splits games into active (waiting/in-progress) and finished
/// (finished/canceled) sections. Every game lands in exactly one bucket.
pub fn partition_games(games: Vec<GameMeta>) -> (Vec<GameMeta>, Vec<GameMeta>) {
    games.into_iter().partition(|g| g.state.is_active())
}

/// A board cell takes input only when it is empty, it is the viewer's turn,
/// and no transaction is currently in flight.
pub fn cell_interactive(cell: Cell, viewers_turn: bool, tx_pending: bool) -> bool {
    cell == Cell::Empty && viewers_turn && !tx_pending
}

/// Route parsing for `/game/{id}`. Anything that is not a base-10 integer is
/// rejected before any chain read happens.
pub fn parse_game_id(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

pub fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse::<Address>()
        .map_err(|e| eyre!("invalid address '{}': {}", raw, e))
}

pub fn short_address(addr: Address) -> String {
    let full = format!("{:?}", addr);
    format!("{}…{}", &full[..8], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn meta(state: GameState, creator_symbol: Symbol, turn: Option<Symbol>) -> GameMeta {
        GameMeta {
            id: 0,
            creator: addr(0xaa),
            opponent: addr(0xbb),
            creator_symbol,
            turn,
            bet: U256::from(1u64),
            state,
            winner: Address::zero(),
            last_move_time: 0,
        }
    }

    #[test]
    fn creator_gets_recorded_symbol() {
        let m = meta(GameState::InProgress, Symbol::O, Some(Symbol::O));
        assert_eq!(m.viewer_symbol(Some(addr(0xaa))), Some(Symbol::O));
    }

    #[test]
    fn opponent_gets_opposite_symbol() {
        let m = meta(GameState::InProgress, Symbol::X, Some(Symbol::X));
        assert_eq!(m.viewer_symbol(Some(addr(0xbb))), Some(Symbol::O));
        let m = meta(GameState::InProgress, Symbol::O, Some(Symbol::X));
        assert_eq!(m.viewer_symbol(Some(addr(0xbb))), Some(Symbol::X));
    }

    #[test]
    fn stranger_and_disconnected_get_no_symbol() {
        let m = meta(GameState::InProgress, Symbol::X, Some(Symbol::X));
        assert_eq!(m.viewer_symbol(Some(addr(0xcc))), None);
        assert_eq!(m.viewer_symbol(None), None);
    }

    #[test]
    fn address_hex_case_is_irrelevant() {
        let upper: Address = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
            .parse()
            .unwrap();
        let lower: Address = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            .parse()
            .unwrap();
        assert_eq!(upper, lower);
        let m = meta(GameState::InProgress, Symbol::X, Some(Symbol::X));
        // creator was built from 0xaa bytes; the mixed-case literal matches it
        assert_eq!(m.viewer_symbol(Some(upper)), Some(Symbol::X));
    }

    #[test]
    fn turn_ownership_requires_in_progress() {
        for state in [
            GameState::WaitingForPlayer,
            GameState::Finished,
            GameState::Canceled,
        ] {
            let m = meta(state, Symbol::X, Some(Symbol::X));
            assert!(!m.is_viewers_turn(Some(addr(0xaa))));
        }
        let m = meta(GameState::InProgress, Symbol::X, Some(Symbol::X));
        assert!(m.is_viewers_turn(Some(addr(0xaa))));
        assert!(!m.is_viewers_turn(Some(addr(0xbb))));
        assert!(!m.is_viewers_turn(Some(addr(0xcc))));
        assert!(!m.is_viewers_turn(None));
    }

    #[test]
    fn lobby_drops_failed_reads_and_keeps_order() {
        let ok = |c: u8| -> RawGameMeta {
            (
                addr(c),
                Address::zero(),
                1,
                0,
                U256::zero(),
                0,
                Address::zero(),
                U256::zero(),
            )
        };
        let games = collect_lobby(vec![
            (0, Some(ok(0x11))),
            (1, None), // read threw
            (2, Some(ok(0x22))),
        ]);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id, 0);
        assert_eq!(games[1].id, 2);
    }

    #[test]
    fn lobby_drops_vacant_records() {
        let vacant: RawGameMeta = (
            Address::zero(),
            Address::zero(),
            0,
            0,
            U256::zero(),
            0,
            Address::zero(),
            U256::zero(),
        );
        assert!(collect_lobby(vec![(0, Some(vacant))]).is_empty());
    }

    #[test]
    fn partition_is_total_and_disjoint() {
        let games = vec![
            meta(GameState::WaitingForPlayer, Symbol::X, None),
            meta(GameState::InProgress, Symbol::X, Some(Symbol::X)),
            meta(GameState::Finished, Symbol::X, None),
            meta(GameState::Canceled, Symbol::X, None),
        ];
        let total = games.len();
        let (active, finished) = partition_games(games);
        assert_eq!(active.len(), 2);
        assert_eq!(finished.len(), 2);
        assert_eq!(active.len() + finished.len(), total);
        assert!(active.iter().all(|g| g.state.is_active()));
        assert!(finished.iter().all(|g| !g.state.is_active()));
    }

    #[test]
    fn board_decodes_flat_nine() {
        let board = Board::from_flat([0, 1, 2, 0, 0, 0, 2, 1, 0]).unwrap();
        assert_eq!(board.cell(0, 0), Cell::Empty);
        assert_eq!(board.cell(1, 0), Cell::X);
        assert_eq!(board.cell(2, 0), Cell::O);
        assert_eq!(board.cell(0, 2), Cell::O);
        assert_eq!(board.cell(1, 2), Cell::X);
    }

    #[test]
    fn board_rejects_out_of_range_cells() {
        assert!(Board::from_flat([0, 1, 2, 3, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn cell_interactivity_rules() {
        assert!(cell_interactive(Cell::Empty, true, false));
        assert!(!cell_interactive(Cell::Empty, true, true));
        assert!(!cell_interactive(Cell::Empty, false, false));
        assert!(!cell_interactive(Cell::X, true, false));
        assert!(!cell_interactive(Cell::O, true, false));
    }

    #[test]
    fn route_id_parsing() {
        assert_eq!(parse_game_id("7"), Some(7));
        assert_eq!(parse_game_id(" 12 "), Some(12));
        assert_eq!(parse_game_id("abc"), None);
        assert_eq!(parse_game_id("-1"), None);
        assert_eq!(parse_game_id("1.5"), None);
        assert_eq!(parse_game_id(""), None);
    }

    #[test]
    fn decode_rejects_bad_discriminants() {
        let bad_symbol: RawGameMeta = (
            addr(1),
            addr(2),
            7,
            0,
            U256::zero(),
            0,
            Address::zero(),
            U256::zero(),
        );
        assert!(decode_game(0, bad_symbol).is_err());
        let bad_state: RawGameMeta = (
            addr(1),
            addr(2),
            1,
            0,
            U256::zero(),
            9,
            Address::zero(),
            U256::zero(),
        );
        assert!(decode_game(0, bad_state).is_err());
    }

    proptest! {
        #[test]
        fn symbol_derivation_is_exhaustive(
            creator_byte in 1u8..=255,
            opponent_byte in 1u8..=255,
            viewer_byte in 1u8..=255,
            symbol_code in 1u8..=2,
        ) {
            prop_assume!(creator_byte != opponent_byte);
            let creator_symbol = Symbol::from_code(symbol_code).unwrap();
            let m = GameMeta {
                id: 0,
                creator: addr(creator_byte),
                opponent: addr(opponent_byte),
                creator_symbol,
                turn: Some(creator_symbol),
                bet: U256::zero(),
                state: GameState::InProgress,
                winner: Address::zero(),
                last_move_time: 0,
            };
            let derived = m.viewer_symbol(Some(addr(viewer_byte)));
            if viewer_byte == creator_byte {
                prop_assert_eq!(derived, Some(creator_symbol));
            } else if viewer_byte == opponent_byte {
                prop_assert_eq!(derived, Some(creator_symbol.opposite()));
            } else {
                prop_assert_eq!(derived, None);
            }
        }

        #[test]
        fn partition_never_loses_or_duplicates(states in proptest::collection::vec(0u8..=3, 0..32)) {
            let games: Vec<GameMeta> = states
                .iter()
                .enumerate()
                .map(|(i, s)| GameMeta {
                    id: i as u64,
                    creator: addr(1),
                    opponent: addr(2),
                    creator_symbol: Symbol::X,
                    turn: None,
                    bet: U256::zero(),
                    state: GameState::from_code(*s).unwrap(),
                    winner: Address::zero(),
                    last_move_time: 0,
                })
                .collect();
            let total = games.len();
            let (active, finished) = partition_games(games);
            prop_assert_eq!(active.len() + finished.len(), total);
            let mut ids: Vec<u64> = active.iter().chain(finished.iter()).map(|g| g.id).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);
        }
    }
}
