//! knowledge-probe
//!
//! Knowledge Engine バックエンドを公開HTTP APIだけで検査するQAハーネス。
//! 投入 → ジョブ待ち → Content Library の検査 → 終了コード、の流れを共通化する。

pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;
pub mod task;
pub mod types;
