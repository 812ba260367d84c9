//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Config loading (load_settings, build_settings)
//! - Registry loading with custom definitions
//! - Command dispatch through `cli::run` with real files on disk
//! - Exit codes for each failure class

mod common;

use clap::Parser;
use common::*;
use finmetrics::adapters::file_config_adapter::FileConfigAdapter;
use finmetrics::cli::{self, Cli};
use finmetrics::domain::error::FinmetricsError;
use finmetrics::ports::export_port::ExportFormat;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const CUSTOM_DEFINITIONS: &str = r#"
[metric.adjusted_ebitda]
category = income_statement
unit = currency
description = EBITDA before stock compensation
formula = ebitda + is.StockCompensation
aliases = adj_ebitda

[metric.net_cash]
category = balance_sheet
unit = currency
formula = cash - interest_bearing_debt
"#;

fn exit_code(code: ExitCode) -> String {
    format!("{code:?}")
}

fn expect_exit(code: ExitCode, expected: u8) {
    assert_eq!(exit_code(code), exit_code(ExitCode::from(expected)));
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["finmetrics"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

mod config_loading {
    use super::*;

    #[test]
    fn load_settings_reads_all_sections() {
        let defs = write_temp_file(".ini", CUSTOM_DEFINITIONS);
        let config = write_temp_file(
            ".ini",
            &format!(
                "[registry]\ndefinitions = {}\n[export]\nformat = markdown\n[logging]\nlevel = debug\n",
                path_str(defs.path())
            ),
        );
        let settings = cli::load_settings(config.path()).unwrap();
        assert_eq!(settings.definitions, Some(defs.path().to_path_buf()));
        assert_eq!(settings.export_format, Some(ExportFormat::Markdown));
        assert_eq!(settings.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn relative_definitions_follow_config_directory() {
        let config = write_temp_file(".ini", "[registry]\ndefinitions = custom.ini\n");
        let settings = cli::load_settings(config.path()).unwrap();
        let dir = config.path().parent().unwrap();
        assert_eq!(settings.definitions, Some(dir.join("custom.ini")));
    }

    #[test]
    fn invalid_export_format_is_rejected() {
        let config = write_temp_file(".ini", "[export]\nformat = xlsx\n");
        let err = cli::load_settings(config.path()).unwrap_err();
        assert!(matches!(err, FinmetricsError::ConfigInvalid { .. }));
    }

    #[test]
    fn registry_section_without_definitions() {
        let config = write_temp_file(".ini", "[registry]\nother = 1\n");
        let err = cli::load_settings(config.path()).unwrap_err();
        assert!(matches!(err, FinmetricsError::ConfigMissing { .. }));
    }

    #[test]
    fn missing_config_file() {
        let err = cli::load_settings(Path::new("/nonexistent/finmetrics.ini")).unwrap_err();
        expect_exit(ExitCode::from(&err), 2);
    }

    #[test]
    fn build_settings_without_base_dir_keeps_path() {
        let adapter = FileConfigAdapter::from_string("[registry]\ndefinitions = custom.ini\n").unwrap();
        let settings = cli::build_settings(&adapter, None).unwrap();
        assert_eq!(settings.definitions, Some(PathBuf::from("custom.ini")));
    }
}

mod registry_loading {
    use super::*;

    #[test]
    fn standard_registry_by_default() {
        let registry = cli::load_registry(None).unwrap();
        assert_eq!(registry.len(), 85);
    }

    #[test]
    fn custom_definitions_extend_standard() {
        let defs = write_temp_file(".ini", CUSTOM_DEFINITIONS);
        let registry = cli::load_registry(Some(defs.path())).unwrap();
        assert_eq!(registry.len(), 87);
        assert_eq!(registry.resolve("adj_ebitda").unwrap().id, "adjusted_ebitda");
    }

    #[test]
    fn cyclic_definitions_fail_with_registry_exit_code() {
        let defs = write_temp_file(
            ".ini",
            "[metric.loop_a]\ncategory = growth\nunit = ratio\nformula = loop_b\n\
             [metric.loop_b]\ncategory = growth\nunit = ratio\nformula = loop_a\n",
        );
        let err = cli::load_registry(Some(defs.path())).unwrap_err();
        assert!(err.to_string().contains("circular"), "{err}");
        expect_exit(ExitCode::from(&err), 3);
    }
}

mod commands {
    use super::*;

    #[test]
    fn calc_succeeds_on_complete_dataset() {
        let data = write_temp_file(".csv", APPLE_CSV);
        let code = run(&["calc", "gross_margin_pct", "roe", "fcf", "--data", path_str(data.path())]);
        expect_exit(code, 0);
    }

    #[test]
    fn calc_json_output() {
        let data = write_temp_file(".csv", APPLE_CSV);
        let code = run(&["calc", "net_margin", "--json", "--data", path_str(data.path())]);
        expect_exit(code, 0);
    }

    #[test]
    fn calc_unknown_metric_exits_with_metric_code() {
        let data = write_temp_file(".csv", APPLE_CSV);
        let code = run(&["calc", "not_a_metric", "--data", path_str(data.path())]);
        expect_exit(code, 4);
    }

    #[test]
    fn calc_missing_input_exits_with_metric_code() {
        let data = write_temp_file(".csv", APPLE_CSV);
        let code = run(&["calc", "current_ratio", "--data", path_str(data.path())]);
        expect_exit(code, 4);
    }

    #[test]
    fn calc_bad_dataset_exits_with_dataset_code() {
        let data = write_temp_file(".csv", "field,value\nis.NetRevenue,lots\n");
        let code = run(&["calc", "revenue", "--data", path_str(data.path())]);
        expect_exit(code, 5);
    }

    #[test]
    fn check_reports_missing_inputs() {
        let data = write_temp_file(".csv", APPLE_CSV);
        expect_exit(run(&["check", "gross_margin", "--data", path_str(data.path())]), 0);
        expect_exit(run(&["check", "quick_ratio", "--data", path_str(data.path())]), 4);
    }

    #[test]
    fn list_search_and_info() {
        expect_exit(run(&["list"]), 0);
        expect_exit(run(&["list", "--category", "liquidity"]), 0);
        expect_exit(run(&["list", "--category", "esg"]), 2);
        expect_exit(run(&["search", "margin"]), 0);
        expect_exit(run(&["info", "ebitda"]), 0);
        expect_exit(run(&["info", "nothing_here"]), 4);
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dictionary.csv");
        let code = run(&["export", "--format", "csv", "--output", path_str(&out)]);
        expect_exit(code, 0);

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("name,category,unit,description,formula,aliases,inputs"));
        assert!(text.contains("gross_margin_pct"));
    }

    #[test]
    fn export_uses_configured_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("finmetrics.ini");
        std::fs::write(&config, "[export]\nformat = markdown\n").unwrap();
        let out = dir.path().join("dictionary.md");

        let code = run(&["--config", path_str(&config), "export", "--output", path_str(&out)]);
        expect_exit(code, 0);
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("| "), "{text}");
    }

    #[test]
    fn export_rejects_unknown_format() {
        expect_exit(run(&["export", "--format", "xlsx"]), 6);
    }

    #[test]
    fn identify_with_and_without_data() {
        let data = write_temp_file(".csv", APPLE_CSV);
        expect_exit(run(&["identify", "What was the gross margin and ROE?"]), 0);
        expect_exit(
            run(&["identify", "free cash flow please", "--data", path_str(data.path())]),
            0,
        );
    }

    #[test]
    fn validate_definitions_file() {
        let good = write_temp_file(".ini", CUSTOM_DEFINITIONS);
        expect_exit(run(&["validate", "--definitions", path_str(good.path())]), 0);

        let bad = write_temp_file(".ini", "[metric.x]\ncategory = growth\nunit = ratio\n");
        expect_exit(run(&["validate", "--definitions", path_str(bad.path())]), 3);
    }

    #[test]
    fn custom_metric_through_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom.ini"), CUSTOM_DEFINITIONS).unwrap();
        let config = dir.path().join("finmetrics.ini");
        std::fs::write(&config, "[registry]\ndefinitions = custom.ini\n").unwrap();
        let data = dir.path().join("data.json");
        std::fs::write(
            &data,
            r#"{"values": {"is.OperatingIncome": 100, "is.D&A": 10, "is.StockCompensation": 5}}"#,
        )
        .unwrap();

        let code = run(&["-c", path_str(&config), "calc", "adj_ebitda", "--data", path_str(&data)]);
        expect_exit(code, 0);
    }
}
