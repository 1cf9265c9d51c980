//! Cartsync CLI - drive the cart and checkout engine from a terminal.
//!
//! Every invocation is one page load: state is read from the store file,
//! reconciled, changed and written back.
//!
//! Commands:
//! - `cartsync add` - Add a product or change its quantity
//! - `cartsync update` - Change quantity and size
//! - `cartsync remove` - Remove a product
//! - `cartsync clear` - Empty the cart
//! - `cartsync import` - Replace the cart from a product JSON file
//! - `cartsync show` - Show cart, pricing and checkout state
//! - `cartsync checkout` - Lock the amount to charge
//! - `cartsync abandon` - Release the checkout lock
//! - `cartsync confirm` - Record a paid order

mod commands;
mod config;
mod context;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{AddArgs, ClearArgs, ConfirmArgs, ImportArgs, RemoveArgs, UpdateArgs};

/// Cartsync - cart pricing and checkout state
#[derive(Parser)]
#[command(name = "cartsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Store file path
    #[arg(long, global = true)]
    store: Option<String>,

    /// Apply promotional pricing
    #[arg(long, global = true, overrides_with = "no_eligible")]
    eligible: bool,

    /// Do not apply promotional pricing
    #[arg(long, global = true)]
    no_eligible: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn eligibility(&self) -> Option<bool> {
        match (self.eligible, self.no_eligible) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add a product, or replace its quantity and size
    Add(AddArgs),

    /// Change a product's quantity and size
    Update(UpdateArgs),

    /// Remove a product
    Remove(RemoveArgs),

    /// Empty the cart
    Clear(ClearArgs),

    /// Replace the cart with products from a JSON file
    Import(ImportArgs),

    /// Show cart, pricing and checkout state
    Show,

    /// Lock the amount to charge and start payment
    Checkout,

    /// Abandon the checkout in progress
    Abandon,

    /// Record a paid order
    Confirm(ConfirmArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    let ctx = match context::Context::load(
        cli.config.as_deref(),
        cli.store.as_deref(),
        cli.eligibility(),
        output.clone(),
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Add(args) => commands::cart::add(args, &ctx),
        Commands::Update(args) => commands::cart::update(args, &ctx),
        Commands::Remove(args) => commands::cart::remove(args, &ctx),
        Commands::Clear(args) => commands::cart::clear(args, &ctx),
        Commands::Import(args) => commands::cart::import(args, &ctx),
        Commands::Show => commands::show::run(&ctx),
        Commands::Checkout => commands::checkout::commit(&ctx),
        Commands::Abandon => commands::checkout::abandon(&ctx),
        Commands::Confirm(args) => commands::checkout::confirm(args, &ctx),
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
