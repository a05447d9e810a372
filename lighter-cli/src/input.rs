//! Prompting and validation of menu input
//!
//! Every parser here runs before any exchange call; a bad value becomes a
//! `TradingError::Validation` and the action is abandoned.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use lighter_core::{OrderSide, TradingError, TradingResult};

/// Line-oriented console over any reader and writer
pub struct Console<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Print `label: ` and read one trimmed line; `None` once input is exhausted
    pub fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.writer, "{}: ", label)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            writeln!(self.writer)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.writer, "{}", text.as_ref())
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

// ============================================================================
// Parsers
// ============================================================================

/// Non-empty market symbol, upper-cased
pub fn parse_symbol(input: &str) -> TradingResult<String> {
    let symbol = input.trim();
    if symbol.is_empty() {
        return Err(TradingError::validation("Symbol cannot be empty"));
    }
    if symbol.chars().any(char::is_whitespace) {
        return Err(TradingError::validation(format!("Invalid symbol '{}'", symbol)));
    }
    Ok(symbol.to_uppercase())
}

pub fn parse_side(input: &str) -> TradingResult<OrderSide> {
    OrderSide::from_str(input).map_err(TradingError::Validation)
}

/// Order size in base asset; must be a number greater than zero
pub fn parse_size(input: &str) -> TradingResult<Decimal> {
    let size = parse_decimal(input, "size")?;
    if size <= Decimal::ZERO {
        return Err(TradingError::validation(format!("Size must be greater than 0, got {}", size)));
    }
    Ok(size)
}

/// Slippage in percent, at least 0 and below 100
pub fn parse_slippage(input: &str) -> TradingResult<Decimal> {
    let slippage = parse_decimal(input, "slippage")?;
    if slippage < Decimal::ZERO || slippage >= Decimal::ONE_HUNDRED {
        return Err(TradingError::validation(format!(
            "Slippage must be at least 0 and below 100%, got {}",
            slippage
        )));
    }
    Ok(slippage)
}

/// Whole-number leverage of at least 1; blank means 1
pub fn parse_leverage(input: &str) -> TradingResult<u32> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(1);
    }

    let leverage = parse_decimal(input, "leverage")?;
    if leverage < Decimal::ONE {
        return Err(TradingError::validation(format!(
            "Leverage must be at least 1, got {}",
            leverage
        )));
    }
    if !leverage.fract().is_zero() {
        return Err(TradingError::validation(format!(
            "Leverage must be a whole number, got {}",
            leverage
        )));
    }
    leverage
        .to_u32()
        .ok_or_else(|| TradingError::validation(format!("Leverage {} is out of range", leverage)))
}

/// 1-based position number, digits only, within `1..=count`; returns the index
pub fn parse_selection(input: &str, count: usize) -> TradingResult<usize> {
    let input = input.trim();
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return Err(TradingError::validation(
            "Please enter a valid position number (digits only)",
        ));
    }

    match input.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
        _ => Err(TradingError::validation(format!(
            "Invalid position number {}; choose 1-{}",
            input, count
        ))),
    }
}

/// Size to close: greater than zero and no more than the open size
pub fn parse_close_size(input: &str, max: Decimal) -> TradingResult<Decimal> {
    let size = parse_decimal(input, "size")?;
    if size <= Decimal::ZERO || size > max {
        return Err(TradingError::validation(format!(
            "Size must be between 0 and {}, got {}",
            max, size
        )));
    }
    Ok(size)
}

/// Only an explicit `yes` confirms
pub fn is_confirmed(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("yes")
}

fn parse_decimal(input: &str, what: &str) -> TradingResult<Decimal> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TradingError::validation(format!("{} cannot be empty", capitalize(what))));
    }
    Decimal::from_str(input)
        .or_else(|_| Decimal::from_scientific(input))
        .map_err(|_| {
            TradingError::validation(format!("Invalid {} '{}': not a number", what, input))
        })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_symbol_is_upper_cased() {
        assert_eq!(parse_symbol(" eth ").unwrap(), "ETH");
        assert!(matches!(parse_symbol("   "), Err(TradingError::Validation(_))));
        assert!(parse_symbol("ETH USD").is_err());
    }

    #[test]
    fn test_side_is_case_insensitive() {
        assert_eq!(parse_side("BUY").unwrap(), OrderSide::Buy);
        assert_eq!(parse_side("sell").unwrap(), OrderSide::Sell);
        assert!(matches!(parse_side("long"), Err(TradingError::Validation(_))));
    }

    #[test]
    fn test_size_must_be_positive_number() {
        assert_eq!(parse_size("1.5").unwrap(), dec!(1.5));
        assert!(matches!(parse_size("0"), Err(TradingError::Validation(_))));
        assert!(matches!(parse_size("-2"), Err(TradingError::Validation(_))));
        assert!(matches!(parse_size("abc"), Err(TradingError::Validation(_))));
        assert!(matches!(parse_size(""), Err(TradingError::Validation(_))));
    }

    #[test]
    fn test_slippage_bounds() {
        assert_eq!(parse_slippage("0").unwrap(), Decimal::ZERO);
        assert_eq!(parse_slippage("0.5").unwrap(), dec!(0.5));
        assert!(parse_slippage("100").is_err());
        assert!(parse_slippage("-0.1").is_err());
        assert!(parse_slippage("half").is_err());
    }

    #[test]
    fn test_leverage_defaults_to_one() {
        assert_eq!(parse_leverage("").unwrap(), 1);
        assert_eq!(parse_leverage("5").unwrap(), 5);
        assert_eq!(parse_leverage("10.0").unwrap(), 10);
        assert!(parse_leverage("0").is_err());
        assert!(parse_leverage("0.5").is_err());
        assert!(parse_leverage("2.5").is_err());
        assert!(parse_leverage("x").is_err());
    }

    #[test]
    fn test_selection_accepts_digits_in_range() {
        assert_eq!(parse_selection("1", 3).unwrap(), 0);
        assert_eq!(parse_selection("3", 3).unwrap(), 2);
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("1.0", 3).is_err());
        assert!(parse_selection("-1", 3).is_err());
        assert!(parse_selection("", 3).is_err());
    }

    #[test]
    fn test_close_size_capped_by_position() {
        assert_eq!(parse_close_size("1.5", dec!(1.5)).unwrap(), dec!(1.5));
        assert!(parse_close_size("1.6", dec!(1.5)).is_err());
        assert!(parse_close_size("0", dec!(1.5)).is_err());
    }

    #[test]
    fn test_only_yes_confirms() {
        assert!(is_confirmed("yes"));
        assert!(is_confirmed(" YES "));
        assert!(!is_confirmed("y"));
        assert!(!is_confirmed("no"));
        assert!(!is_confirmed(""));
    }

    #[test]
    fn test_console_prompt_reads_lines_until_eof() {
        let mut console = Console::new("first\n  second  \n".as_bytes(), Vec::new());
        assert_eq!(console.prompt("A").unwrap().as_deref(), Some("first"));
        assert_eq!(console.prompt("B").unwrap().as_deref(), Some("second"));
        assert_eq!(console.prompt("C").unwrap(), None);

        let output = String::from_utf8(console.into_writer()).unwrap();
        assert!(output.starts_with("A: B: C: "));
    }
}
