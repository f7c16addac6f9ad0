pub mod analyze;
pub mod convert;
pub mod extract;
pub mod frame;
pub mod init;
pub mod plot;
pub mod triage;
