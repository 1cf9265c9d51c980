//! Show the cart and checkout state.

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use cartsync_engine::checkout::TransactionRecord;
use cartsync_engine::OrderId;

use super::CartView;
use crate::context::Context;
use crate::output::{format_duration, status_badge};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowView {
    #[serde(flatten)]
    cart: CartView,
    eligible: bool,
    last_order: Option<OrderId>,
    last_transaction: Option<TransactionRecord>,
}

/// Run the show command.
pub fn run(ctx: &Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    let cart = CartView::capture(&mut engine);
    let last_order = engine.last_order();
    let last_transaction = last_order.as_ref().and_then(|o| engine.transaction(o));

    if ctx.output.is_json() {
        ctx.output.json(&ShowView {
            cart,
            eligible: ctx.eligible,
            last_order,
            last_transaction,
        });
        return Ok(());
    }

    ctx.output.header("Cart");
    ctx.output.items(&cart.items, &cart.snapshot, ctx.eligible);

    ctx.output.header("Pricing");
    ctx.output.snapshot(&cart.snapshot, cart.payable);
    ctx.output.kv(
        "Offers",
        if ctx.eligible { "applied" } else { "not eligible" },
    );

    ctx.output.header("Status");
    ctx.output.kv("Cart", &status_badge(cart.cart.as_str()));
    if let Some(secs) = cart.expires_in_secs {
        let at = Local::now() + chrono::Duration::seconds(secs);
        ctx.output.kv(
            "Expires in",
            &format!("{} (at {})", format_duration(secs), at.format("%H:%M:%S")),
        );
    }
    ctx.output.kv(
        "Checkout",
        &status_badge(if cart.locked { "locked" } else { "open" }),
    );
    if let (Some(order), Some(txn)) = (&last_order, &last_transaction) {
        ctx.output.kv(
            "Last order",
            &format!("{} ({}, {})", order, txn.transaction_id, txn.tracked_value),
        );
    }
    Ok(())
}
