//! Interactive menu loop
//!
//! Two states: until setup succeeds only setup and exit are offered. Once an
//! API key is registered the trading actions become available. Any
//! authentication failure drops the shell back to the setup menu.

use rust_decimal::Decimal;
use std::io::{BufRead, Write};
use std::time::Duration;
use tracing::{debug, info};

use lighter_core::{
    worst_acceptable_price, Credentials, Exchange, Order, OrderSide, OrderStatus, TradingError,
};
use lighter_trading::LighterConfig;

use crate::input::{
    is_confirmed, parse_close_size, parse_leverage, parse_selection, parse_side, parse_size,
    parse_slippage, parse_symbol, Console,
};
use crate::render;

const RULE: &str = "========================================";
const MENU_RULE: &str = "==============================";
const SLIPPAGE_PROMPT: &str = "Enter slippage % (e.g. 0.5 for 0.5%)";

/// What the shell needs besides the exchange
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub credentials: Credentials,
    pub poll_interval: Duration,
    pub fill_timeout: Duration,
}

impl From<&LighterConfig> for ShellOptions {
    fn from(config: &LighterConfig) -> Self {
        Self {
            credentials: config.credentials(),
            poll_interval: config.poll_interval,
            fill_timeout: config.fill_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Unauthenticated,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Setup,
    MarketOpen,
    MarketClose,
    ViewPositions,
    Exit,
}

impl ShellState {
    fn action(&self, choice: &str) -> Option<MenuAction> {
        match (self, choice) {
            (ShellState::Unauthenticated, "1") => Some(MenuAction::Setup),
            (ShellState::Unauthenticated, "2") => Some(MenuAction::Exit),
            (ShellState::Authenticated, "1") => Some(MenuAction::MarketOpen),
            (ShellState::Authenticated, "2") => Some(MenuAction::MarketClose),
            (ShellState::Authenticated, "3") => Some(MenuAction::ViewPositions),
            (ShellState::Authenticated, "4") => Some(MenuAction::Setup),
            (ShellState::Authenticated, "5") => Some(MenuAction::Exit),
            _ => None,
        }
    }
}

// ============================================================================
// Shell
// ============================================================================

pub struct Shell<E, R, W> {
    exchange: E,
    options: ShellOptions,
    console: Console<R, W>,
    state: ShellState,
}

impl<E, R, W> Shell<E, R, W>
where
    E: Exchange,
    R: BufRead,
    W: Write,
{
    pub fn new(exchange: E, options: ShellOptions, reader: R, writer: W) -> Self {
        Self {
            exchange,
            options,
            console: Console::new(reader, writer),
            state: ShellState::Unauthenticated,
        }
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn into_parts(self) -> (E, W) {
        (self.exchange, self.console.into_writer())
    }

    /// Run the menu until the user exits or input ends
    ///
    /// Only I/O failures on the console end the loop with an error; exchange
    /// and validation errors are reported and the menu is shown again.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.show_menu()?;

            let prompt = match self.state {
                ShellState::Unauthenticated => "Select option (1-2)",
                ShellState::Authenticated => "Select option (1-5)",
            };
            let Some(choice) = self.console.prompt(prompt)? else {
                debug!("Input closed");
                break;
            };

            let action = match self.state.action(&choice) {
                Some(MenuAction::Exit) => break,
                Some(action) => action,
                None => {
                    let hint = match self.state {
                        ShellState::Unauthenticated => concat!(
                            "Invalid option. ",
                            "Please authenticate first (option 1) or exit (option 2)."
                        ),
                        ShellState::Authenticated => "Invalid option. Please select 1-5.",
                    };
                    self.console.line(hint)?;
                    continue;
                }
            };

            let result = match action {
                MenuAction::Setup => self.setup().await,
                MenuAction::MarketOpen => self.market_open().await,
                MenuAction::MarketClose => self.market_close().await,
                MenuAction::ViewPositions => self.view_positions().await,
                MenuAction::Exit => Ok(()),
            };

            if let Err(err) = result {
                match err.downcast::<TradingError>() {
                    Ok(trading_err) => self.report(&trading_err)?,
                    Err(io_err) => return Err(io_err),
                }
            }
        }

        self.console.line("Goodbye!")?;
        Ok(())
    }

    fn show_menu(&mut self) -> anyhow::Result<()> {
        self.console.line("")?;
        self.console.line("LIGHTER CLI")?;
        self.console.line(MENU_RULE)?;
        match self.state {
            ShellState::Unauthenticated => {
                self.console.line("Authentication required")?;
                self.console.line("1. Setup/authenticate")?;
                self.console.line("2. Exit")?;
            }
            ShellState::Authenticated => {
                self.console.line("1. Market Open (buy/sell)")?;
                self.console.line("2. Market Close")?;
                self.console.line("3. View Positions")?;
                self.console.line("4. Re-authenticate/setup")?;
                self.console.line("5. Exit")?;
            }
        }
        self.console.line("")?;
        Ok(())
    }

    fn report(&mut self, err: &TradingError) -> anyhow::Result<()> {
        debug!("Action failed: {:?}", err);
        self.console.line(format!("Error: {}", err))?;

        match err {
            TradingError::FillTimeout { .. } => {
                self.console
                    .line("The order may still execute. Check 'View Positions' before retrying.")?;
            }
            err if err.is_auth_failure() => {
                if self.state == ShellState::Authenticated {
                    info!("Authentication lost; returning to setup");
                }
                self.state = ShellState::Unauthenticated;
                self.console.line("Run setup again to continue trading.")?;
            }
            _ => {}
        }
        Ok(())
    }

    fn header(&mut self, title: &str) -> anyhow::Result<()> {
        self.console.line("")?;
        self.console.line(title)?;
        self.console.line(RULE)?;
        Ok(())
    }

    /// Ask a question; `None` when input has ended
    fn ask(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        Ok(self.console.prompt(label)?)
    }

    fn confirm(&mut self, label: &str) -> anyhow::Result<bool> {
        Ok(self.ask(label)?.map(|answer| is_confirmed(&answer)).unwrap_or(false))
    }

    // ========================================================================
    // Actions
    // ========================================================================

    async fn setup(&mut self) -> anyhow::Result<()> {
        self.header("SETUP TRADING")?;
        let credentials = &self.options.credentials;
        let intro = format!(
            "This registers a new API key (index {}) for {} using the environment credentials.",
            credentials.api_key_index, credentials.l1_address
        );
        self.console.line(intro)?;
        self.console.line(
            "Warning: another session signing with the same API key at the same time can cause \
             nonce conflicts and rejected transactions.",
        )?;

        if !self.confirm("Proceed with setup? (yes/no)")? {
            self.console.line("Setup cancelled")?;
            return Ok(());
        }

        self.console.line("Setting up trading...")?;
        let session = self.exchange.authenticate(&self.options.credentials).await?;
        self.state = ShellState::Authenticated;

        info!("Authenticated account {}", session.account_index);
        self.console.line(format!(
            "Trading setup completed (account {}, API key {})",
            session.account_index, session.api_key_index
        ))?;
        Ok(())
    }

    async fn market_open(&mut self) -> anyhow::Result<()> {
        self.header("MARKET OPEN")?;

        let Some(symbol) = self.ask("Enter symbol (e.g. ETH)")? else { return Ok(()) };
        let symbol = parse_symbol(&symbol)?;
        let Some(side) = self.ask("Enter side (buy/sell)")? else { return Ok(()) };
        let side = parse_side(&side)?;
        let Some(size) = self.ask("Enter size (in base asset)")? else { return Ok(()) };
        let size = parse_size(&size)?;
        let Some(slippage) = self.ask(SLIPPAGE_PROMPT)? else { return Ok(()) };
        let slippage = parse_slippage(&slippage)?;
        let Some(leverage) = self.ask("Enter leverage (default: 1)")? else { return Ok(()) };
        let leverage = parse_leverage(&leverage)?;

        self.console.line("")?;
        self.console.line("Order Summary:")?;
        self.console.line(format!("   Symbol: {}", symbol))?;
        self.console.line(format!("   Side: {}", side))?;
        self.console.line(format!("   Size: {}", size.normalize()))?;
        self.console.line(format!("   Leverage: {}x", leverage))?;
        self.console.line(format!("   Slippage: {}%", slippage.normalize()))?;

        match self.exchange.get_price(&symbol).await {
            Ok(price) => {
                let worst = worst_acceptable_price(price.price, side, slippage)?;
                let notional = size.checked_mul(price.price).ok_or_else(|| {
                    TradingError::validation(format!("Size {} is too large to price", size))
                })?;
                self.console.line(format!("   Current Price: {}", render::usd(price.price)))?;
                self.console
                    .line(format!("   Estimated Notional: {}", render::usd(notional)))?;
                self.console.line(format!("   Worst Acceptable Price: {}", render::usd(worst)))?;
            }
            Err(e) => {
                self.console.line(format!("Warning: could not get current price: {}", e))?;
            }
        }

        if let Ok(min_size) = self.exchange.get_min_order_size(&symbol).await {
            if !min_size.is_zero() {
                self.console
                    .line(format!("   Minimum Order Size: {}", min_size.normalize()))?;
            }
        }
        if let Ok(funding) = self.exchange.get_funding_rate(&symbol).await {
            let pct = funding
                .rate
                .saturating_mul(Decimal::ONE_HUNDRED)
                .round_dp(4)
                .normalize();
            self.console.line(format!("   Funding Rate (1h): {}%", pct))?;
        }

        if !self.confirm("Proceed with order? (yes/no)")? {
            self.console.line("Order cancelled")?;
            return Ok(());
        }

        self.console.line("Placing order...")?;
        let order = self
            .exchange
            .submit_market_order(&symbol, side, size, slippage, leverage)
            .await?;
        self.settle(order).await
    }

    async fn market_close(&mut self) -> anyhow::Result<()> {
        self.header("MARKET CLOSE")?;

        let address = self.options.credentials.l1_address.clone();
        let mut positions = self.exchange.get_positions(&address).await?;
        if positions.is_empty() {
            self.console.line("No open positions to close")?;
            return Ok(());
        }

        self.console.line("Current Positions:")?;
        render::positions_table(&positions).print(self.console.writer())?;

        let label = format!("Select position to close (1-{})", positions.len());
        let Some(selection) = self.ask(&label)? else { return Ok(()) };
        let selected = positions.swap_remove(parse_selection(&selection, positions.len())?);

        self.console.line(format!(
            "Closing {} {} position (current size {})",
            selected.symbol,
            selected.side,
            selected.size.normalize()
        ))?;
        let label = format!("Enter size to close (max {})", selected.size.normalize());
        let Some(size) = self.ask(&label)? else { return Ok(()) };
        let size = parse_close_size(&size, selected.size)?;
        let Some(slippage) = self.ask(SLIPPAGE_PROMPT)? else { return Ok(()) };
        let slippage = parse_slippage(&slippage)?;

        let closing_side: OrderSide = selected.side.closing_side();
        let worst = worst_acceptable_price(selected.mark_price, closing_side, slippage)?;
        self.console.line("")?;
        self.console.line("Close Order Summary:")?;
        self.console.line(format!("   Symbol: {}", selected.symbol))?;
        self.console.line(format!("   Position: {}", selected.side))?;
        self.console.line(format!("   Size to close: {}", size.normalize()))?;
        self.console.line(format!("   Order side: {} (reduce only)", closing_side))?;
        self.console.line(format!("   Slippage: {}%", slippage.normalize()))?;
        self.console.line(format!("   Worst Acceptable Price: {}", render::usd(worst)))?;

        if !self.confirm("Proceed with closing? (yes/no)")? {
            self.console.line("Close order cancelled")?;
            return Ok(());
        }

        self.console.line("Closing position...")?;

        // Re-check against fresh positions; the position may have changed while we waited
        let current = self.exchange.get_positions(&address).await?;
        let Some(position) = current
            .into_iter()
            .find(|p| p.symbol == selected.symbol && p.side == selected.side && p.size >= size)
        else {
            self.console
                .line("Position no longer exists or insufficient size available")?;
            return Ok(());
        };

        let order = self.exchange.close_position(&position, size, slippage).await?;
        self.settle(order).await
    }

    async fn view_positions(&mut self) -> anyhow::Result<()> {
        self.header("POSITION OVERVIEW")?;

        let address = self.options.credentials.l1_address.clone();
        let positions = self.exchange.get_positions(&address).await?;
        if positions.is_empty() {
            self.console.line("No open positions")?;
            self.console
                .line("   Ready to trade! Use 'Market Open' to create a position.")?;
            return Ok(());
        }

        self.console.line(format!("{} open position(s):", positions.len()))?;
        render::positions_table(&positions).print(self.console.writer())?;
        self.console.line(format!(
            "Total Unrealized PnL: {}",
            render::pnl(render::total_pnl(&positions))
        ))?;
        Ok(())
    }

    /// Wait for the fill and render the outcome
    async fn settle(&mut self, order: Order) -> anyhow::Result<()> {
        if let Some(tx_hash) = &order.id {
            self.console.line(format!("Order submitted ({})", tx_hash))?;
        }

        let order = self
            .exchange
            .await_fill(order, self.options.poll_interval, self.options.fill_timeout)
            .await?;

        match order.status {
            OrderStatus::Filled | OrderStatus::PartiallyFilled => {
                let headline = if order.status == OrderStatus::Filled {
                    "Order filled".to_string()
                } else {
                    format!(
                        "Order partially filled: {} of {}",
                        order.filled_size.unwrap_or_default().normalize(),
                        order.size.normalize()
                    )
                };
                self.console.line(headline)?;
                render::order_table(&order).print(self.console.writer())?;
                Ok(())
            }
            OrderStatus::Failed => {
                let message = order
                    .message
                    .unwrap_or_else(|| "transaction failed on the exchange".to_string());
                Err(TradingError::order(message).into())
            }
            OrderStatus::TimedOut => Err(TradingError::FillTimeout {
                tx_hash: order.id.unwrap_or_else(|| "unknown transaction".to_string()),
                timeout: self.options.fill_timeout,
            }
            .into()),
            OrderStatus::Submitted => {
                render::order_table(&order).print(self.console.writer())?;
                Ok(())
            }
        }
    }
}
