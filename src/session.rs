use crate::wallets::WalletDescriptor;
use color_eyre::eyre::{
    Result,
    eyre,
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{
        Http,
        Provider,
    },
    signers::{
        LocalWallet,
        Signer,
    },
    types::Address,
};
use std::sync::Arc;

pub type ChainSigner = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Process-wide wallet session: address-or-absent plus an explicit
/// connect/disconnect lifecycle. The keystore is unlocked once at startup
/// (before the terminal takes over stdin); connect/disconnect only toggle
/// whether the unlocked identity is bound to the app.
pub struct WalletSession {
    chain_id: u64,
    connectors: Vec<WalletDescriptor>,
    signer: Option<Arc<ChainSigner>>,
    connected: bool,
}

impl WalletSession {
    pub fn new(
        chain_id: u64,
        connectors: Vec<WalletDescriptor>,
        signer: Option<Arc<ChainSigner>>,
    ) -> Self {
        let connected = signer.is_some();
        Self {
            chain_id,
            connectors,
            signer,
            connected,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn connector_names(&self) -> Vec<String> {
        self.connectors.iter().map(|c| c.name.clone()).collect()
    }

    pub fn is_connected(&self) -> bool {
        self.connected && self.signer.is_some()
    }

    pub fn address(&self) -> Option<Address> {
        if !self.connected {
            return None;
        }
        self.signer.as_ref().map(|s| s.signer().address())
    }

    /// Binds the unlocked wallet to the session. Fails (non-fatally, for the
    /// caller to surface) when no keystore was unlocked at startup.
    pub fn connect(&mut self) -> Result<Address> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            eyre!("no wallet available; restart with --wallet <name> to unlock one")
        })?;
        self.connected = true;
        Ok(signer.signer().address())
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn signer(&self) -> Result<Arc<ChainSigner>> {
        if !self.connected {
            return Err(eyre!("wallet not connected"));
        }
        self.signer
            .clone()
            .ok_or_else(|| eyre!("wallet not connected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_without_wallet_has_no_address() {
        let session = WalletSession::new(260, Vec::new(), None);
        assert_eq!(session.address(), None);
        assert!(!session.is_connected());
        assert_eq!(session.chain_id(), 260);
    }

    #[test]
    fn connect_without_unlocked_wallet_fails() {
        let mut session = WalletSession::new(260, Vec::new(), None);
        assert!(session.connect().is_err());
    }

    #[test]
    fn disconnect_clears_the_viewer_identity() {
        let wallet: LocalWallet =
            "0x0000000000000000000000000000000000000000000000000000000000000001"
                .parse()
                .unwrap();
        let provider = Provider::<Http>::try_from("http://localhost:8011").unwrap();
        let signer = Arc::new(SignerMiddleware::new(provider, wallet.with_chain_id(260u64)));
        let mut session = WalletSession::new(260, Vec::new(), Some(signer));
        assert!(session.is_connected());
        assert!(session.address().is_some());
        session.disconnect();
        assert!(!session.is_connected());
        assert_eq!(session.address(), None);
        assert!(session.signer().is_err());
        let reconnected = session.connect().unwrap();
        assert!(session.is_connected());
        assert_eq!(session.address(), Some(reconnected));
    }
}
