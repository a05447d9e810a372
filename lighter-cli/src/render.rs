//! Tables and number formatting for the terminal

use prettytable::format::consts::FORMAT_BOX_CHARS;
use prettytable::{row, Table};
use rust_decimal::{Decimal, RoundingStrategy};

use lighter_core::{Order, Position};

/// `$1,234.56`; negative amounts as `-$1,234.56`
pub fn usd(amount: Decimal) -> String {
    let rounded = cents(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}${}.{}", sign, grouped, frac)
}

/// Signed PnL: `+$12.00`, `-$3.50`, `$0.00`
pub fn pnl(amount: Decimal) -> String {
    if cents(amount).is_zero() {
        usd(Decimal::ZERO)
    } else if amount.is_sign_positive() {
        format!("+{}", usd(amount))
    } else {
        usd(amount)
    }
}

fn cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn leverage(value: Decimal) -> String {
    format!("{:.1}x", value)
}

pub fn total_pnl(positions: &[Position]) -> Decimal {
    positions
        .iter()
        .fold(Decimal::ZERO, |total, p| total.saturating_add(p.unrealized_pnl))
}

/// Numbered table of open positions
pub fn positions_table(positions: &[Position]) -> Table {
    let mut table = Table::new();
    table.set_format(*FORMAT_BOX_CHARS);
    table.set_titles(row![
        "#", "Symbol", "Side", "Size", "Entry", "Mark", "Value", "Leverage", "Unrealized PnL"
    ]);

    for (i, position) in positions.iter().enumerate() {
        table.add_row(row![
            i + 1,
            position.symbol,
            position.side,
            r->position.size.normalize(),
            r->usd(position.entry_price),
            r->usd(position.mark_price),
            r->usd(position.value()),
            r->leverage(position.leverage),
            r->pnl(position.unrealized_pnl),
        ]);
    }

    table
}

/// Two-column summary of a submitted or settled order
pub fn order_table(order: &Order) -> Table {
    let mut table = Table::new();
    table.set_format(*FORMAT_BOX_CHARS);

    table.add_row(row!["Transaction", order.id.as_deref().unwrap_or("-")]);
    table.add_row(row!["Symbol", order.symbol]);
    table.add_row(row!["Side", order.side]);
    table.add_row(row!["Status", order.status]);
    table.add_row(row!["Requested size", order.size.normalize()]);
    if let Some(filled) = order.filled_size {
        table.add_row(row!["Filled size", filled.normalize()]);
    }
    if let Some(price) = order.fill_price {
        table.add_row(row!["Fill price", usd(price)]);
    }
    table.add_row(row!["Worst price", usd(order.worst_price)]);
    table.add_row(row!["Leverage", format!("{}x", order.leverage)]);
    if order.reduce_only {
        table.add_row(row!["Reduce only", "yes"]);
    }
    table.add_row(row!["Notional", usd(order.notional())]);
    table.add_row(row!["Time", order.timestamp.format("%Y-%m-%d %H:%M:%S UTC")]);

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use lighter_core::PositionSide;
    use rust_decimal_macros::dec;

    #[test]
    fn test_usd_formatting() {
        assert_eq!(usd(dec!(0)), "$0.00");
        assert_eq!(usd(dec!(3015)), "$3,015.00");
        assert_eq!(usd(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(usd(dec!(-42.5)), "-$42.50");
        assert_eq!(usd(dec!(999.999)), "$1,000.00");
    }

    #[test]
    fn test_pnl_formatting() {
        assert_eq!(pnl(dec!(300)), "+$300.00");
        assert_eq!(pnl(dec!(-12.345)), "-$12.35");
        assert_eq!(pnl(dec!(0.001)), "$0.00");
    }

    #[test]
    fn test_positions_table_lists_every_position() {
        let positions = vec![
            Position::new("ETH", PositionSide::Long, dec!(1.5), dec!(2800), dec!(3000), dec!(20)),
            Position::new(
                "BTC",
                PositionSide::Short,
                dec!(0.1),
                dec!(60000),
                dec!(61000),
                dec!(10),
            ),
        ];

        let rendered = positions_table(&positions).to_string();
        assert!(rendered.contains("ETH"));
        assert!(rendered.contains("LONG"));
        assert!(rendered.contains("SHORT"));
        assert!(rendered.contains("+$300.00"));
        assert!(rendered.contains("-$100.00"));
        assert!(rendered.contains("5.0x"));
        assert_eq!(total_pnl(&positions), dec!(200));
    }

    #[test]
    fn test_total_pnl_saturates() {
        let huge =
            Position::new("ETH", PositionSide::Long, Decimal::ONE, dec!(0), Decimal::MAX, dec!(20));
        let positions = vec![huge.clone(), huge];
        assert_eq!(total_pnl(&positions), Decimal::MAX);
        assert!(pnl(total_pnl(&positions)).starts_with("+$"));
    }
}
