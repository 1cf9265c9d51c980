//! Cart editing commands.

use anyhow::{bail, Context as _, Result};
use dialoguer::Confirm;

use cartsync_engine::cart::{LineItem, ProductRecord};
use cartsync_engine::{Money, ProductId};

use super::{report, AddArgs, ClearArgs, ImportArgs, RemoveArgs, UpdateArgs};
use crate::context::Context;

/// Run the add command.
pub fn add(args: AddArgs, ctx: &Context) -> Result<()> {
    if !args.price.is_finite() {
        bail!("Price must be a number");
    }
    let currency = ctx.config.engine.currency;
    let unit_price = Money::from_decimal(args.price, currency);
    let sale_price = args
        .sale_price
        .map(|p| Money::from_decimal(p, currency))
        .unwrap_or(unit_price);

    let mut engine = ctx.open_engine()?;
    let item = LineItem::new(args.product, unit_price, sale_price, args.qty, args.size);
    ctx.output
        .success(&format!("Added {} x{}", item.product_id, item.quantity));
    engine.add_item(item);

    report(&mut engine, ctx);
    Ok(())
}

/// Run the update command.
pub fn update(args: UpdateArgs, ctx: &Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    let product_id = ProductId::new(args.product);

    if engine.update_item(&product_id, args.qty, args.size).is_none() {
        bail!("{} is not in the cart", product_id);
    }
    if args.qty == 0 {
        ctx.output.success(&format!("Removed {}", product_id));
    } else {
        ctx.output
            .success(&format!("Updated {} to x{}", product_id, args.qty));
    }

    report(&mut engine, ctx);
    Ok(())
}

/// Run the remove command.
pub fn remove(args: RemoveArgs, ctx: &Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    let product_id = ProductId::new(args.product);

    let present = engine.items().iter().any(|i| i.product_id == product_id);
    engine.remove_item(&product_id);
    if present {
        ctx.output.success(&format!("Removed {}", product_id));
    } else {
        ctx.output.warn(&format!("{} was not in the cart", product_id));
    }

    report(&mut engine, ctx);
    Ok(())
}

/// Run the clear command.
pub fn clear(args: ClearArgs, ctx: &Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    let count = engine.items().len();
    if count == 0 {
        ctx.output.info("Cart is already empty");
        return Ok(());
    }

    if !args.yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove all {} products from the cart?", count))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.info("Clear cancelled");
            return Ok(());
        }
    }

    engine.clear_cart();
    ctx.output.success(&format!("Cleared {} products", count));
    report(&mut engine, ctx);
    Ok(())
}

/// Run the import command.
pub fn import(args: ImportArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.file);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<ProductRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Expected a JSON array of products in {}", path.display()))?;

    let mut engine = ctx.open_engine()?;
    engine.import_records(&records);
    let imported = engine.items().len();

    ctx.output.success(&format!(
        "Imported {} of {} products from {}",
        imported,
        records.len(),
        path.display()
    ));
    if imported < records.len() {
        ctx.output
            .warn("Products without an id were skipped; repeated ids were merged");
    }

    report(&mut engine, ctx);
    Ok(())
}
