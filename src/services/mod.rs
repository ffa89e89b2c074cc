pub mod chain;
pub mod orchestrator;
pub mod orderbook;
pub mod proof_oracle;
pub mod settlement;
pub mod whitelist;

pub use chain::ChainAdapter;
pub use orchestrator::ProofOrchestrator;
pub use orderbook::MatchingEngine;
pub use proof_oracle::ProofOracleClient;
pub use settlement::SettlementCoordinator;
pub use whitelist::WhitelistService;
