//! divscreen runner: screen orchestration on top of `divscreen-core`.
//!
//! This crate provides:
//! - `ScreenConfig`, the TOML-backed configuration with validation
//! - `Screener`, the bounded worker pool that fetches, computes and scores a universe
//! - CSV and JSON export of screen reports

pub mod config;
pub mod export;
mod gate;
pub mod screener;

pub use config::{ConfigError, DataConfig, PoolConfig, ScreenConfig, MAX_WORKERS};
pub use export::{export_json, export_rows_csv, import_json, save_report};
pub use screener::{
    evaluate_symbol, Evaluation, FailureKind, ScreenError, ScreenReport, Screener, SymbolFailure,
    SymbolWarning, SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn screener_is_send_sync() {
        assert_send::<Screener>();
        assert_sync::<Screener>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<ScreenReport>();
        assert_sync::<ScreenReport>();
        assert_send::<SymbolFailure>();
        assert_sync::<SymbolFailure>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ScreenConfig>();
        assert_sync::<ScreenConfig>();
    }
}
