pub mod classify;
pub mod oracle;
pub mod oracles;
pub mod prompt;
pub mod retry;
