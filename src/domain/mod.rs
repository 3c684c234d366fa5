//! ドメインモジュール
//!
//! Knowledge EngineのAPIごとの操作と、記事HTMLの判定ロジックを置く。

pub mod cleanup;
pub mod content;
pub mod diagnostics;
pub mod health;
pub mod inspect;
pub mod job;
pub mod library;
pub mod probe;
pub mod report;
