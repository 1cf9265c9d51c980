//! Output formatting for the CLI.

use console::style;

use cartsync_engine::cart::{LineItem, PriceSnapshot};
use cartsync_engine::Money;

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    // Human-mode status line; suppressed entirely under --json.
    fn status(&self, mark: console::StyledObject<&str>, msg: &str, to_stderr: bool) {
        if self.json {
            return;
        }
        if to_stderr {
            eprintln!("{} {}", mark, msg);
        } else {
            println!("{} {}", mark, msg);
        }
    }

    pub fn info(&self, msg: &str) {
        self.status(style("ℹ").blue(), msg, false);
    }

    pub fn success(&self, msg: &str) {
        self.status(style("✓").green(), msg, false);
    }

    pub fn warn(&self, msg: &str) {
        self.status(style("⚠").yellow(), msg, true);
    }

    /// Errors are still reported in JSON mode, as `{"error": ...}` on stderr.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Only shown with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            self.status(style("→").dim(), &style(msg).dim().to_string(), true);
        }
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print a key-value pair.
    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a table row.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if self.json {
            return;
        }
        let formatted: Vec<String> = cols
            .iter()
            .zip(widths.iter())
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        println!("  {}", formatted.join("  "));
    }

    /// Print the cart as a table.
    pub fn items(&self, items: &[LineItem], snapshot: &PriceSnapshot, eligible: bool) {
        if self.json {
            return;
        }
        if items.is_empty() {
            self.info("Cart is empty");
            return;
        }

        let widths = [18, 9, 4, 12, 12];
        self.table_row(&["PRODUCT", "SIZE", "QTY", "MRP", "PRICE"], &widths);
        for item in items {
            let free = snapshot.free_products.contains(&item.product_id);
            let price = item.effective_unit_price(eligible).display();
            let price = if free {
                format!("{} {}", price, style("(1 free)").green())
            } else {
                price
            };
            self.table_row(
                &[
                    item.product_id.as_str(),
                    item.size.map(|s| s.as_str()).unwrap_or("-"),
                    &item.quantity.to_string(),
                    &item.unit_price.display(),
                    &price,
                ],
                &widths,
            );
        }
    }

    /// Print a price breakdown.
    pub fn snapshot(&self, snapshot: &PriceSnapshot, payable: Money) {
        if self.json {
            return;
        }
        self.kv("Total MRP", &snapshot.total_mrp.display());
        self.kv("Discount", &format!("-{}", snapshot.total_discount.display()));
        if snapshot.has_promotion() {
            self.kv(
                "Group offer",
                &format!("-{}", style(snapshot.extra_discount.display()).green()),
            );
        }
        self.kv("Final", &snapshot.final_payable.display());
        if payable != snapshot.final_payable {
            self.kv(
                "Payable",
                &format!("{} {}", style(payable.display()).bold(), style("(locked)").yellow()),
            );
        } else {
            self.kv("Payable", &style(payable.display()).bold().to_string());
        }
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Format duration as human-readable string.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Status badge for cart and checkout states.
pub fn status_badge(status: &str) -> String {
    match status {
        "active" | "open" => style(status).green().to_string(),
        "locked" => style(status).yellow().to_string(),
        "expired" => style(status).red().to_string(),
        "empty" => style(status).dim().to_string(),
        _ => status.to_string(),
    }
}
