//! Checkout commands: commit, abandon and confirm.

use anyhow::{bail, Result};
use serde_json::json;

use cartsync_engine::OrderId;

use super::{report, ConfirmArgs};
use crate::context::Context;

/// Run the checkout command.
pub fn commit(ctx: &Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    if engine.items().is_empty() {
        bail!("Cart is empty. Nothing to check out.");
    }

    let already_locked = engine.checkout_locked();
    let amount = engine.commit_for_checkout();

    if ctx.output.is_json() {
        ctx.output.json(&json!({ "amount": amount, "alreadyLocked": already_locked }));
        return Ok(());
    }
    if already_locked {
        ctx.output.info("Checkout already in progress");
    }
    ctx.output
        .success(&format!("Charge {} at payment", amount.display()));
    ctx.output
        .info("Cart edits no longer change this amount until you confirm or abandon");
    Ok(())
}

/// Run the abandon command.
pub fn abandon(ctx: &Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    if !engine.checkout_locked() {
        ctx.output.info("No checkout in progress");
    } else {
        engine.abandon_checkout();
        ctx.output.success("Checkout abandoned");
    }
    report(&mut engine, ctx);
    Ok(())
}

/// Run the confirm command.
pub fn confirm(args: ConfirmArgs, ctx: &Context) -> Result<()> {
    let order_id = OrderId::new(args.order.trim());
    if order_id.is_blank() {
        bail!("Order id must not be empty");
    }
    let mut engine = ctx.open_engine()?;
    let outcome = engine.confirm_purchase(&order_id, &args.method);

    if ctx.output.is_json() {
        ctx.output.json(&outcome);
        return Ok(());
    }

    ctx.output.header("Order confirmed");
    ctx.output.kv("Order", outcome.order_id.as_str());
    ctx.output.kv("Transaction", outcome.transaction_id.as_str());
    ctx.output.kv("Amount", &outcome.amount.display());
    if outcome.event_sent {
        ctx.output.success("Purchase recorded");
    } else {
        ctx.output
            .info("Purchase was already recorded for this order; nothing sent again");
    }
    Ok(())
}
