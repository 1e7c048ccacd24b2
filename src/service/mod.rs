pub mod account_keys;
pub mod faucet_service;
pub mod protocol;
pub mod reconciler;
pub mod session;
pub mod signer;
pub mod wallet;
