//! Common regex patterns for Chinese VAT invoice extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Item row anchor: "*category*name ..." up to the end of the line.
    pub static ref ITEM_ANCHOR_LINE: Regex = Regex::new(
        r"\*[\u{4e00}-\u{9fa5}A-Za-z0-9_]+\*[^\n\r]*"
    ).unwrap();

    // Strict item name: the category tag plus the following non-space run.
    pub static ref ITEM_NAME: Regex = Regex::new(
        r"^\*[\u{4e00}-\u{9fa5}A-Za-z0-9_]+\*\S*"
    ).unwrap();

    // Issue date in long form: 2025 年 3 月 9 日
    pub static ref ISSUE_DATE_CN: Regex = Regex::new(
        r"([0-9]{4})\s*年\s*([0-9]{1,2})\s*月\s*([0-9]{1,2})\s*日"
    ).unwrap();

    // Total including tax, or the "in figures" amount.
    pub static ref TOTAL_AMOUNT: Regex = Regex::new(
        r"(?:价税合计|小写).*?[¥￥]?\s*([0-9]+\.?[0-9]*)"
    ).unwrap();

    // Row tokens
    pub static ref NUMBER_TOKEN: Regex = Regex::new(
        r"^-?[0-9]+(?:\.[0-9]+)?$"
    ).unwrap();

    pub static ref TAX_RATE_TOKEN: Regex = Regex::new(
        r"^-?[0-9]+(?:\.[0-9]+)?%$"
    ).unwrap();
}

/// Tax markers printed in the rate column instead of a percentage.
pub const TAX_EXEMPT_MARKERS: &[&str] = &["免税", "不征税"];
