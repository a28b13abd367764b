use crate::views::parse_address;
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use ethers::types::Address;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
};

pub const CONFIG_ROOT: &str = ".tictactoe";
const CONTRACTS_FILE: &str = "contracts.json";

pub const DEFAULT_ERA_RPC_URL: &str = "https://mainnet.era.zksync.io";
pub const DEFAULT_SEPOLIA_RPC_URL: &str = "https://sepolia.era.zksync.dev";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:8011";

// Seed deployment on Era; overridable through the address book or --contract.
const DEFAULT_ERA_CONTRACT: &str = "0x6ddbE5cAE2863A0D75f8e33f9CDB0D33aff0B363";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainTarget {
    Era,
    EraSepolia,
    LocalNode,
}

impl ChainTarget {
    pub fn chain_id(self) -> u64 {
        match self {
            ChainTarget::Era => 324,
            ChainTarget::EraSepolia => 300,
            ChainTarget::LocalNode => 260,
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            ChainTarget::Era => DEFAULT_ERA_RPC_URL,
            ChainTarget::EraSepolia => DEFAULT_SEPOLIA_RPC_URL,
            ChainTarget::LocalNode => DEFAULT_LOCAL_RPC_URL,
        }
    }
}

impl fmt::Display for ChainTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainTarget::Era => "zkSync Era",
            ChainTarget::EraSepolia => "zkSync Sepolia",
            ChainTarget::LocalNode => "Local devnet",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractEntry {
    pub chain_id: u64,
    pub address: String,
    pub saved_at: String,
}

/// Per-chain contract addresses, kept in one JSON file so the address never
/// lives as a literal in more than one place.
#[derive(Debug)]
pub struct AddressBook {
    entries: Vec<ContractEntry>,
}

impl AddressBook {
    pub fn load_default() -> Result<Self> {
        let path = ensure_store(Path::new(CONFIG_ROOT))?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = fs::read(path).wrap_err("failed to read contract address book")?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self {
                entries: Vec::new(),
            });
        }
        let entries = serde_json::from_slice::<Vec<ContractEntry>>(data)
            .wrap_err("failed to parse contract address book JSON")?;
        Ok(Self { entries })
    }

    pub fn lookup(&self, chain_id: u64) -> Option<Result<Address>> {
        self.entries
            .iter()
            .find(|e| e.chain_id == chain_id)
            .map(|e| parse_address(&e.address))
    }

    pub fn record(&mut self, chain_id: u64, address: Address) {
        self.entries.retain(|e| e.chain_id != chain_id);
        self.entries.push(ContractEntry {
            chain_id,
            address: format!("{:?}", address),
            saved_at: Utc::now().to_rfc3339(),
        });
    }

    pub fn save_default(&self) -> Result<()> {
        let path = ensure_store(Path::new(CONFIG_ROOT))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries)
            .wrap_err("failed to serialize contract address book")?;
        fs::write(path, json).wrap_err("failed to write contract address book")?;
        Ok(())
    }
}

/// Resolution order: explicit override, then the address book, then the
/// built-in Era seed. Anything else is a hard configuration error.
pub fn resolve_contract(
    book: &AddressBook,
    target: ChainTarget,
    explicit: Option<Address>,
) -> Result<Address> {
    if let Some(addr) = explicit {
        return Ok(addr);
    }
    if let Some(found) = book.lookup(target.chain_id()) {
        return found;
    }
    if target == ChainTarget::Era {
        return parse_address(DEFAULT_ERA_CONTRACT);
    }
    Err(eyre!(
        "no contract address known for chain {} ({}); pass --contract or add it to {}/{}",
        target.chain_id(),
        target,
        CONFIG_ROOT,
        CONTRACTS_FILE,
    ))
}

fn ensure_store(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        fs::create_dir_all(root).wrap_err("failed to create config directory")?;
    }
    let file_path = root.join(CONTRACTS_FILE);
    if !file_path.exists() {
        let mut file = fs::File::create(&file_path)
            .wrap_err_with(|| format!("failed to create {:?}", file_path))?;
        file.write_all(b"[]")
            .wrap_err("failed to initialize contract address book")?;
    }
    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_match_supported_networks() {
        assert_eq!(ChainTarget::Era.chain_id(), 324);
        assert_eq!(ChainTarget::EraSepolia.chain_id(), 300);
        assert_eq!(ChainTarget::LocalNode.chain_id(), 260);
    }

    #[test]
    fn explicit_override_wins() {
        let book = AddressBook::from_json(b"[]").unwrap();
        let explicit = parse_address("0x0000000000000000000000000000000000000042").unwrap();
        let resolved =
            resolve_contract(&book, ChainTarget::LocalNode, Some(explicit)).unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn book_entry_is_used_when_present() {
        let json = br#"[{"chain_id":300,"address":"0x00000000000000000000000000000000000000AB","saved_at":"2025-01-01T00:00:00Z"}]"#;
        let book = AddressBook::from_json(json).unwrap();
        let resolved = resolve_contract(&book, ChainTarget::EraSepolia, None).unwrap();
        assert_eq!(
            resolved,
            parse_address("0x00000000000000000000000000000000000000ab").unwrap()
        );
    }

    #[test]
    fn era_falls_back_to_seed_address() {
        let book = AddressBook::from_json(b"[]").unwrap();
        let resolved = resolve_contract(&book, ChainTarget::Era, None).unwrap();
        assert_eq!(resolved, parse_address(DEFAULT_ERA_CONTRACT).unwrap());
    }

    #[test]
    fn unknown_chain_without_entry_is_an_error() {
        let book = AddressBook::from_json(b"[]").unwrap();
        assert!(resolve_contract(&book, ChainTarget::LocalNode, None).is_err());
    }

    #[test]
    fn record_replaces_existing_entry() {
        let mut book = AddressBook::from_json(b"[]").unwrap();
        let a = parse_address("0x0000000000000000000000000000000000000001").unwrap();
        let b = parse_address("0x0000000000000000000000000000000000000002").unwrap();
        book.record(260, a);
        book.record(260, b);
        assert_eq!(book.lookup(260).unwrap().unwrap(), b);
    }

    #[test]
    fn recorded_override_survives_reload() {
        let path = std::env::temp_dir().join(format!(
            "tictactoe-contracts-{}.json",
            std::process::id()
        ));
        let addr = parse_address("0x00000000000000000000000000000000000000CD").unwrap();

        let mut book = AddressBook::from_json(b"[]").unwrap();
        book.record(300, addr);
        book.save_to(&path).unwrap();

        let reloaded = AddressBook::load_from(&path).unwrap();
        assert_eq!(reloaded.lookup(300).unwrap().unwrap(), addr);
        // a later run on Sepolia no longer needs --contract
        assert_eq!(
            resolve_contract(&reloaded, ChainTarget::EraSepolia, None).unwrap(),
            addr
        );
        fs::remove_file(&path).unwrap();
    }
}
