//! ユースケース（claim・転送・ドライバ・診断）

pub mod claim;
pub mod diagnostic;
pub mod driver;
pub mod transfer;

pub use claim::ClaimStore;
pub use driver::{DriverReport, MatDriver};
pub use transfer::{TransferDaemon, TransferOutcome};
