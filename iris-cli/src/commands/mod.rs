//! CLI command implementations

pub mod init;
pub mod send;

pub use init::InitCommand;
pub use send::SendCommand;
