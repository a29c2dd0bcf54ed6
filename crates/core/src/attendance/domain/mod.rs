pub mod attendance_event;
pub mod attendance_ledger;
pub mod ledger_codec;
pub mod ledger_store;
