pub mod cli;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod nodes;
pub mod storage;
