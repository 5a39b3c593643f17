//! Regex patterns for receipt and invoice text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Amounts, tried left to right in one pass. At a given position the
    // first alternative wins, so `1.234,56` is read whole rather than as
    // `1.23`, and `1,234.56` whole rather than as `234.56`. Named groups tell
    // the parser which separator is decimal.
    pub static ref AMOUNT: Regex = Regex::new(
        r"(?P<grouped>\d{1,3}(?:\.\d{3})+,\d{2})|(?P<us>\d{1,3}(?:,\d{3})+\.\d{2})|(?P<comma>\d+,\d{2})|(?P<dot>\d+\.\d{2})"
    ).unwrap();

    // D/M/Y with 2- or 4-digit year
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref LETTER: Regex = Regex::new(r"\p{L}").unwrap();

    // Currency codes as whole words
    pub static ref CODE_BRL: Regex = Regex::new(r"\bBRL\b").unwrap();
    pub static ref CODE_EUR: Regex = Regex::new(r"\bEUR\b").unwrap();
    pub static ref CODE_GBP: Regex = Regex::new(r"\bGBP\b").unwrap();
    pub static ref CODE_PLN: Regex = Regex::new(r"(?i)\bPLN\b|zł").unwrap();
    pub static ref CODE_USD: Regex = Regex::new(r"\bUSD\b").unwrap();
}
