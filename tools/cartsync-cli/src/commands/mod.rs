//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod show;

use clap::Args;
use serde::Serialize;

use cartsync_engine::cart::{LineItem, PriceSnapshot, Size};
use cartsync_engine::expiry::CartState;
use cartsync_engine::{CheckoutEngine, Money};

use crate::context::Context;

/// Arguments for the add command.
#[derive(Args)]
pub struct AddArgs {
    /// Product id.
    pub product: String,

    /// Unit MRP in major units, e.g. 1299.50.
    #[arg(short, long)]
    pub price: f64,

    /// Discounted unit price; defaults to the MRP.
    #[arg(short = 's', long)]
    pub sale_price: Option<f64>,

    /// Quantity.
    #[arg(short, long, default_value = "1", allow_negative_numbers = true)]
    pub qty: i64,

    /// Size label (XS, S, M, L, XL, XXL, 3XL, Free Size).
    #[arg(long)]
    pub size: Option<Size>,
}

/// Arguments for the update command.
#[derive(Args)]
pub struct UpdateArgs {
    /// Product id.
    pub product: String,

    /// New quantity; 0 removes the product.
    pub qty: u32,

    /// New size label.
    #[arg(long)]
    pub size: Option<Size>,
}

/// Arguments for the remove command.
#[derive(Args)]
pub struct RemoveArgs {
    /// Product id.
    pub product: String,
}

/// Arguments for the clear command.
#[derive(Args)]
pub struct ClearArgs {
    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the import command.
#[derive(Args)]
pub struct ImportArgs {
    /// JSON file with an array of product records.
    pub file: String,
}

/// Arguments for the confirm command.
#[derive(Args)]
pub struct ConfirmArgs {
    /// Order id returned by the payment step.
    #[arg(short, long)]
    pub order: String,

    /// Payment method used.
    #[arg(short, long, default_value = "card")]
    pub method: String,
}

/// Machine-readable cart summary for `--json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub snapshot: PriceSnapshot,
    pub payable: Money,
    pub locked: bool,
    pub cart: CartState,
    pub expires_in_secs: Option<i64>,
}

impl CartView {
    pub fn capture(engine: &mut CheckoutEngine) -> Self {
        Self {
            items: engine.items(),
            snapshot: engine.snapshot(),
            payable: engine.payable(),
            locked: engine.checkout_locked(),
            cart: engine.cart_state(),
            expires_in_secs: engine.expires_in().map(|d| d.num_seconds()),
        }
    }
}

/// Print the cart after a change.
pub fn report(engine: &mut CheckoutEngine, ctx: &Context) {
    let view = CartView::capture(engine);
    if ctx.output.is_json() {
        ctx.output.json(&view);
        return;
    }
    ctx.output.items(&view.items, &view.snapshot, ctx.eligible);
    if !view.items.is_empty() {
        ctx.output.snapshot(&view.snapshot, view.payable);
    }
}
