pub mod faucet_api;
