//! 単発のコマンドとして実行するタスク群
//!
//! いずれも結果を`ProbeReport`として返す。

pub mod cleanup;
pub mod diagnostics;
pub mod health;
pub mod library;
