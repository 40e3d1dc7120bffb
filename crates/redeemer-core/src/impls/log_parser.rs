//! LogScrapeParser - worker の人間向けログからの best-effort 抽出
//!
//! # 認識するマーカー（行単位・上から順に）
//! - `Found <n> condition(s) to redeem` → positions_found
//! - `Total redeemable: $<amount>` → total_value
//! - `SUCCESS! ... Tx: 0x<hex>` → transaction_hashes に追加、redeemed_count += 1
//! - `Redemption complete! <x>/<y> successful` → redeemed_count = x（最終集計が優先）
//!
//! 後の行は前の行の値を上書きできる（worker のログ自体が時系列なので最後の集計が正）。

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::ParsedOutput;
use crate::ports::OutputParser;

static CONDITION_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Found (\d+) condition").expect("valid regex"));
static TOTAL_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([0-9.]+)").expect("valid regex"));
static SUCCESS_TX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Tx: (0x[a-fA-F0-9]+)").expect("valid regex"));
static COMPLETION_TALLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)/(\d+) successful").expect("valid regex"));

const CONDITION_MARKER: &str = "condition(s) to redeem";
const TOTAL_MARKER: &str = "Total redeemable:";
const SUCCESS_MARKER: &str = "SUCCESS!";
const COMPLETION_MARKER: &str = "Redemption complete!";

#[derive(Debug, Clone, Copy, Default)]
pub struct LogScrapeParser;

impl LogScrapeParser {
    pub fn new() -> Self {
        Self
    }
}

impl OutputParser for LogScrapeParser {
    fn parse(&self, text: &str) -> ParsedOutput {
        let mut parsed = ParsedOutput::default();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.contains(CONDITION_MARKER)
                && let Some(count) = capture_number::<u32>(&CONDITION_COUNT, line, 1)
            {
                parsed.positions_found = count;
            }

            if line.contains(TOTAL_MARKER)
                && let Some(total) = capture_number::<f64>(&TOTAL_VALUE, line, 1)
                && total.is_finite()
                && total >= 0.0
            {
                parsed.total_value = total;
            }

            if line.contains(SUCCESS_MARKER)
                && let Some(tx) = SUCCESS_TX.captures(line).and_then(|c| c.get(1))
            {
                parsed.transaction_hashes.push(tx.as_str().to_string());
                parsed.redeemed_count = parsed.redeemed_count.saturating_add(1);
            }

            if line.contains(COMPLETION_MARKER)
                && let Some(redeemed) = capture_number::<u32>(&COMPLETION_TALLY, line, 1)
            {
                parsed.redeemed_count = redeemed;
            }
        }

        debug!(
            positions = parsed.positions_found,
            total_value = parsed.total_value,
            redeemed = parsed.redeemed_count,
            transactions = parsed.transaction_hashes.len(),
            "parsed worker output"
        );
        parsed
    }
}

/// Captured group parsed as a number; `None` if absent or malformed (e.g. `1.2.3`).
fn capture_number<T: std::str::FromStr>(re: &Regex, line: &str, group: usize) -> Option<T> {
    re.captures(line)?.get(group)?.as_str().parse().ok()
}
