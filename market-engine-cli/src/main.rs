//! # Market Engine CLI
//!
//! A command-line interface for driving a single-asset order book:
//! placing orders, cancelling them, and inspecting book state, plus an
//! interactive REPL mode.

use clap::{Parser, Subcommand};
use market_engine_core::types::{Asset, AssetId, OrderType, Side};
use market_engine_core::{Order, OrderBook, OrderBookError, Trade};
use rust_decimal::Decimal;
use std::io::{self, Write};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "market-engine-cli")]
#[command(about = "A limit order book CLI", long_about = None)]
struct Cli {
    /// Asset kind traded on this book (e.g., BTC)
    #[arg(long, default_value = "BTC")]
    asset: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Place an order in the book
    #[command(name = "place-order")]
    PlaceOrder {
        side: Side,
        #[arg(value_enum)]
        order_type: OrderType,
        /// Price in decimal format (e.g., 100.50); ignored for market orders
        price: String,
        /// Quantity in decimal format (e.g., 0.001)
        quantity: String,
        /// Unique order id (auto-generated if not provided)
        id: Option<String>,
    },
    /// Cancel a resting order by id
    #[command(name = "cancel")]
    Cancel { id: String },
    /// Show current order book state
    #[command(name = "book", aliases = ["state", "b"])]
    Book,
    /// Show best bid and ask prices
    #[command(name = "best")]
    Best,
    /// Show market depth
    #[command(name = "depth")]
    Depth {
        #[arg(default_value = "5")]
        levels: usize,
    },
    /// Clear the order book (interactive mode)
    #[command(name = "clear")]
    Clear,
    /// Dump the trade tape as JSON (interactive mode)
    #[command(name = "history")]
    History,
    /// Exit interactive mode
    #[command(name = "quit", aliases = ["exit", "q"])]
    Quit,
    /// Start interactive mode
    #[command(name = "interactive")]
    Interactive,
}

fn main() {
    let cli = Cli::parse();
    let asset = Asset::new(cli.asset, Decimal::ZERO, Decimal::ZERO);
    let asset_id = asset.id;

    match cli.command {
        None => run_interactive_mode(asset_id),
        Some(Commands::Interactive) => run_interactive_mode(asset_id),
        Some(Commands::PlaceOrder { side, order_type, price, quantity, id }) => {
            let mut book = OrderBook::new(asset_id);
            match place_order(&mut book, side, order_type, &price, &quantity, id) {
                Ok((status, trades)) => {
                    if trades.is_empty() {
                        println!("Order placed. No trades executed. Status: {status:?}");
                    } else {
                        println!("Order executed! Status: {status:?}. Trades:");
                        for trade in &trades {
                            println!("Trade: {} @ {}", trade.quantity, trade.price);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Error placing order: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Cancel { .. })
        | Some(Commands::Book)
        | Some(Commands::Best)
        | Some(Commands::Depth { .. })
        | Some(Commands::Clear)
        | Some(Commands::History)
        | Some(Commands::Quit) => {
            eprintln!("This command is only available in interactive mode.");
            eprintln!("Use: market-engine-cli interactive");
            std::process::exit(1);
        }
    }
}

fn parse_interactive_command(input: &str) -> Result<Commands, String> {
    let args = shlex::split(input).ok_or("Invalid command syntax")?;
    if args.is_empty() {
        return Err("Empty command".to_string());
    }

    let mut full_args = vec!["market-engine-cli".to_string()];
    full_args.extend(args);

    match Cli::try_parse_from(full_args) {
        Ok(cli) => cli.command.ok_or_else(|| "Interactive mode not available within interactive mode".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn run_interactive_mode(asset_id: AssetId) {
    println!("=== Market Engine Interactive CLI ===");
    println!("Type 'help' for available commands, 'quit' to exit\n");

    let mut book = OrderBook::new(asset_id);
    let mut next_id = 1u64;
    let mut trade_history: Vec<Trade> = Vec::new();

    loop {
        print!("> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_interactive_command(trimmed) {
                    Ok(Commands::Quit) => {
                        println!("Goodbye!");
                        break;
                    }
                    Ok(Commands::PlaceOrder { side, order_type, price, quantity, id }) => {
                        let order_id = id.unwrap_or_else(|| {
                            let generated = next_id.to_string();
                            next_id += 1;
                            generated
                        });
                        match place_order(&mut book, side, order_type, &price, &quantity, Some(order_id.clone())) {
                            Ok((status, trades)) => {
                                if trades.is_empty() {
                                    println!("Order {order_id} placed. No trades executed. Status: {status:?}");
                                } else {
                                    println!("Order {order_id} executed! Status: {status:?}. Trades:");
                                    for trade in &trades {
                                        println!("  Trade: {} @ {}", trade.quantity, trade.price);
                                    }
                                    trade_history.extend(trades);
                                }
                                print_book_summary(&book);
                            }
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    Ok(Commands::Cancel { id }) => match book.cancel(&id) {
                        Ok(true) => println!("Order {id} canceled."),
                        Ok(false) => println!("No resting order with id {id}."),
                        Err(e) => println!("Error: {e}"),
                    },
                    Ok(Commands::Book) => print_book_state(&book),
                    Ok(Commands::Best) => print_best_prices(&book),
                    Ok(Commands::Clear) => {
                        book = OrderBook::new(asset_id);
                        next_id = 1;
                        trade_history.clear();
                        println!("Order book cleared.");
                    }
                    Ok(Commands::Depth { levels }) => print_market_depth(&book, levels),
                    Ok(Commands::History) => match serde_json::to_string_pretty(&trade_history) {
                        Ok(json) => println!("{json}"),
                        Err(e) => println!("Error serializing trade history: {e}"),
                    },
                    Ok(Commands::Interactive) => println!("Command not available in interactive mode."),
                    Err(e) => {
                        if trimmed == "help" || trimmed == "h" {
                            show_help();
                        } else {
                            println!("Error: {}", e.lines().next().unwrap_or("Invalid command"));
                        }
                    }
                }
            }
            Err(error) => {
                println!("Error reading input: {error}");
                break;
            }
        }
    }
}

fn show_help() {
    println!("Available Commands:");
    println!("  place-order <side> <type> <price> <quantity> [id]  - Place an order");
    println!("    side: buy | sell      type: market | limit | goodtillcancel");
    println!("  cancel <id>                                        - Cancel a resting order");
    println!("  book | state | b                                   - Show order book state");
    println!("  best                                                - Show best bid and ask");
    println!("  depth [levels]                                      - Show market depth (default 5)");
    println!("  history                                             - Dump the trade tape as JSON");
    println!("  clear                                               - Clear the order book");
    println!("  help | h                                            - Show this help message");
    println!("  quit | exit | q                                     - Exit the CLI");
}

fn place_order(
    book: &mut OrderBook,
    side: Side,
    order_type: OrderType,
    price_str: &str,
    quantity_str: &str,
    id: Option<String>,
) -> Result<(market_engine_core::types::OrderStatus, Vec<Trade>), String> {
    let price = Decimal::from_str(price_str).map_err(|_| format!("Invalid price format: {price_str}"))?;
    let quantity = Decimal::from_str(quantity_str).map_err(|_| format!("Invalid quantity format: {quantity_str}"))?;
    let order_id = id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let order = Order::new(
        order_id,
        side,
        order_type,
        price,
        book.asset_id(),
        quantity,
        market_engine_core::types::ParticipantId::new(),
    );

    book.match_order(order).map_err(|e: OrderBookError| e.to_string())
}

fn print_book_state(book: &OrderBook) {
    println!("\nOrder Book State:");
    print_best_prices(book);
    print_market_depth(book, 3);
    println!();
}

fn print_best_prices(book: &OrderBook) {
    match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) => {
            let spread = ask.price() - bid.price();
            println!("  Best BUY:  {} @ {}", bid.total_quantity(), bid.price());
            println!("  Best SELL: {} @ {}", ask.total_quantity(), ask.price());
            println!("  Spread:    {spread}");
        }
        (Some(bid), None) => {
            println!("  Best BUY:  {} @ {}", bid.total_quantity(), bid.price());
            println!("  Best SELL: None");
        }
        (None, Some(ask)) => {
            println!("  Best BUY:  None");
            println!("  Best SELL: {} @ {}", ask.total_quantity(), ask.price());
        }
        (None, None) => println!("  Order book is empty"),
    }
}

fn print_market_depth(book: &OrderBook, levels: usize) {
    let bids = book.top_bids(levels);
    let asks = book.top_asks(levels);

    if bids.is_empty() && asks.is_empty() {
        return;
    }

    println!("  Market Depth:");
    for (price, qty) in asks.iter().rev() {
        println!("    {qty} @ {price}");
    }
    if !asks.is_empty() && !bids.is_empty() {
        println!("    ---------------");
    }
    for (price, qty) in &bids {
        println!("    {qty} @ {price}");
    }
}

fn print_book_summary(book: &OrderBook) {
    match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) => println!(
            "Best: {} @ {} | {} @ {}",
            bid.total_quantity(),
            bid.price(),
            ask.total_quantity(),
            ask.price()
        ),
        (Some(bid), None) => println!("Best: {} @ {} | No asks", bid.total_quantity(), bid.price()),
        (None, Some(ask)) => println!("Best: No bids | {} @ {}", ask.total_quantity(), ask.price()),
        (None, None) => println!("Order book is empty"),
    }
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn get_cli_command() -> Command {
        Command::cargo_bin("market-engine-cli").unwrap_or_else(|e| {
            panic!("CLI binary not found. Please run 'cargo build --bin market-engine-cli' first.\nOriginal error: {e}");
        })
    }

    #[test]
    fn place_buy_order_no_match() {
        let mut cmd = get_cli_command();
        cmd.args(["place-order", "buy", "limit", "100", "10", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No trades executed"));
    }

    #[test]
    fn place_sell_order_no_match() {
        let mut cmd = get_cli_command();
        cmd.args(["place-order", "sell", "limit", "100", "10", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No trades executed"));
    }

    #[test]
    fn market_order_on_empty_book_is_canceled() {
        let mut cmd = get_cli_command();
        cmd.args(["place-order", "buy", "market", "0", "10", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Canceled"));
    }

    #[test]
    fn case_sensitive_side_is_rejected() {
        let mut cmd = get_cli_command();
        cmd.args(["place-order", "BUY", "limit", "100", "10", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }

    #[test]
    fn invalid_price_is_rejected() {
        let mut cmd = get_cli_command();
        cmd.args(["place-order", "buy", "limit", "not_a_number", "10", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error placing order"));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut cmd = get_cli_command();
        cmd.args(["place-order", "buy", "limit", "100", "0", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error placing order"));
    }

    #[test]
    fn help_command_lists_subcommands() {
        let mut cmd = get_cli_command();
        cmd.arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("A limit order book CLI"))
            .stdout(predicate::str::contains("place-order"))
            .stdout(predicate::str::contains("cancel"));
    }

    #[test]
    fn history_dumps_trade_tape_as_json() {
        let mut cmd = get_cli_command();
        cmd.write_stdin("place-order sell limit 100 5 a\nplace-order buy limit 100 5 b\nhistory\nquit\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"quantity\""))
            .stdout(predicate::str::contains("\"price\""));
    }

    #[test]
    fn no_subcommand_starts_interactive() {
        let mut cmd = get_cli_command();
        cmd.write_stdin("quit\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("=== Market Engine Interactive CLI ==="));
    }
}
