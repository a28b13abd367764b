pub mod client;

pub mod config;

pub mod session;

pub mod ui;

pub mod views;

pub mod wallets;

pub mod tictactoe_abi {
    ethers::contract::abigen!(
        TicTacToe,
        r#"[
            function gameCount() view returns (uint256)
            function getGameMeta(uint256) view returns (address, address, uint8, uint8, uint256, uint8, address, uint256)
            function getBoardState(uint256) view returns (uint8[9])
            function createGame(uint8) payable
            function joinGame(uint256) payable
            function cancelGame(uint256)
            function makeMove(uint256, uint8, uint8)
            event GameCreated(uint256 indexed gameId, address indexed creator)
            event GameJoined(uint256 indexed gameId, address indexed opponent)
            event GameCanceled(uint256 indexed gameId)
            event GameEnded(uint256 indexed gameId, address winner)
            event WinByTimeout(uint256 indexed gameId, address winner)
        ]"#
    );
}
