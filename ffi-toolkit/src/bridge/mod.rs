pub mod abi;
pub mod ledger;
pub mod memory;
pub mod raw_uuid;
pub mod result;
pub mod string;
