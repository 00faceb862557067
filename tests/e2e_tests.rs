//! End-to-end integration tests
//!
//! These tests validate the complete replay pipeline using predefined CSV
//! fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays every record through the ledger engine
//! 3. Generates output CSV
//! 4. Compares actual output with expected.csv
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path openings and transfers
//! - Opposite-direction transfers over the same pair
//! - Negative balances (no overdraft check)
//! - Rejected records (currency, unknown accounts, amounts, malformed rows)
//!
//! Each fixture runs under the sync strategy, the async strategy with default
//! batches, and the async strategy with tiny batches.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_ledger_engine::cli::StrategyType;
    use rust_ledger_engine::strategy::{create_strategy, BatchConfig, ReplaySummary};
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Run a fixture by processing input.csv and comparing with expected.csv
    fn run_test_fixture(
        fixture_name: &str,
        strategy_type: StrategyType,
        config: Option<BatchConfig>,
    ) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let strategy = create_strategy(strategy_type.clone(), config, None);

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        strategy
            .process(Path::new(&input_path), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to process records: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));

        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path")]
    #[case("reverse_transfers")]
    #[case("overdraft")]
    #[case("currency_mismatch")]
    #[case("unknown_account")]
    #[case("invalid_amounts")]
    #[case("malformed_data")]
    #[case("empty_input")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy, None);
    }

    #[rstest]
    #[case("happy_path")]
    #[case("reverse_transfers")]
    #[case("unknown_account")]
    #[case("malformed_data")]
    fn test_fixtures_with_small_batches(#[case] fixture: &str) {
        run_test_fixture(fixture, StrategyType::Async, Some(BatchConfig::new(2, 2)));
    }

    #[rstest]
    #[case::sync(StrategyType::Sync, None)]
    #[case::async_default(StrategyType::Async, None)]
    #[case::async_small_batches(StrategyType::Async, Some(BatchConfig::new(2, 2)))]
    fn test_summary_counts_unparseable_rows_as_rejected(
        #[case] strategy_type: StrategyType,
        #[case] config: Option<BatchConfig>,
    ) {
        let strategy = create_strategy(strategy_type, config, None);
        let mut output = Vec::new();

        let summary = strategy
            .process(Path::new("tests/fixtures/malformed_data/input.csv"), &mut output)
            .unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                applied: 3,
                rejected: 6,
            }
        );
    }

    #[test]
    fn test_tx_timeout_does_not_change_uncontended_replay() {
        let strategy = create_strategy(
            StrategyType::Async,
            None,
            Some(std::time::Duration::from_secs(5)),
        );
        let mut output = Vec::new();

        strategy
            .process(Path::new("tests/fixtures/reverse_transfers/input.csv"), &mut output)
            .unwrap();

        let expected = fs::read_to_string("tests/fixtures/reverse_transfers/expected.csv").unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }
}
