pub mod event;
pub mod order;
pub mod order_match;
pub mod proof;
pub mod settlement;
pub mod whitelist;

pub use event::Event;
pub use order::{PrivateOrder, Side};
pub use order_match::Match;
pub use proof::ProofResult;
pub use settlement::{PendingSettlement, SettlementStatus};
pub use whitelist::{MerkleProof, WhitelistEntry};
