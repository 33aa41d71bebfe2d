//! Alert payload and message composition.

use super::item::Item;

/// Notification produced for a matched, unseen item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Image to send with the caption; plain text message when absent.
    pub image_path: Option<String>,
    /// HTML-formatted message body.
    pub message: String,
}

impl Alert {
    /// Build the alert for an item, listing every attached sticker.
    pub fn for_item(item: &Item, image_path: Option<String>) -> Self {
        Self {
            image_path,
            message: compose_message(item),
        }
    }
}

/// Render the alert text for an item.
///
/// ```text
/// <b>Name:</b> AK-47,
/// <b>Price:</b> 15.0$, <b>Store Price:</b> 20.0$
/// <b>Stickers:</b>
///       Katowice 2015, <b>Price:</b> 5.0$
/// ```
pub fn compose_message(item: &Item) -> String {
    let mut msg = format!(
        "<b>Name:</b> {},\n<b>Price:</b> {}, <b>Store Price:</b> {}\n<b>Stickers:</b>",
        escape_html(&item.name),
        format_price(item.price_cents),
        format_price(item.store_price_cents),
    );
    for sticker in &item.stickers {
        msg.push_str(&format!(
            "\n      {}, <b>Price:</b> {}",
            escape_html(&sticker.name),
            format_price(sticker.price_cents)
        ));
    }
    msg
}

/// Format a cent amount as dollars, always with a fractional part (`1500` -> `15.0$`).
pub fn format_price(cents: i64) -> String {
    // Debug keeps the trailing ".0" on whole values.
    format!("{:?}$", cents as f64 / 100.0)
}

/// Escape the characters the messaging API treats as HTML markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
