//! Message rendering (HTML parse mode).
//!
//! Pure functions: the timestamp shown is the observation time carried by the
//! snapshot or failure, converted to the configured timezone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use mw_diff::ChangeSet;
use mw_schemas::{FetchFailure, Resource, Snapshot};
use mw_sources::{required_secret_names, SourceDescriptor};

/// Escape the three characters the chat HTML subset treats as markup.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// `YYYY-MM-DD HH:MM` in `tz`.
pub fn format_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

pub fn render_change(
    source: &SourceDescriptor,
    changes: &ChangeSet,
    current: &Snapshot,
    tz: Tz,
) -> String {
    let emoji = if changes.is_first_observation { "🆕" } else { "🔔" };
    let mut msg = format!(
        "{emoji} <b>Provider: {}</b>\n\n",
        escape_html(&source.display_name)
    );

    if changes.is_first_observation {
        msg.push_str("✅ <b>First observation</b>\n");
        msg.push_str(&format!("📊 Current models: {}\n", current.count));
    } else {
        push_section(&mut msg, "➕ Added", &changes.added);
        push_section(&mut msg, "➖ Removed", &changes.removed);
        msg.push_str(&format!("📊 Total models: {}\n", current.count));
    }

    msg.push_str(&format!(
        "\n⏰ Updated: {}",
        format_time(current.observed_at, tz)
    ));
    msg
}

pub fn render_failure(source: &SourceDescriptor, failure: &FetchFailure, tz: Tz) -> String {
    let mut msg = format!(
        "❌ <b>Monitoring failed: {}</b>\n\n",
        escape_html(&source.display_name)
    );
    msg.push_str(&format!(
        "⚠️ <b>Error:</b>\n<code>{}</code>\n\n",
        escape_html(&failure.message)
    ));

    let required = required_secret_names(source);
    if !required.is_empty() {
        msg.push_str("🔑 <b>Requires:</b>\n");
        for name in &required {
            msg.push_str(&format!("  • {}\n", escape_html(name)));
        }
    }

    msg.push_str(&format!("\n⏰ Time: {}", format_time(failure.observed_at, tz)));
    msg
}

/// Heading plus bullets; nothing at all for an empty list.
fn push_section(msg: &mut String, heading: &str, items: &[Resource]) {
    if items.is_empty() {
        return;
    }
    msg.push_str(&format!("<b>{heading} ({}):</b>\n", items.len()));
    for r in items {
        msg.push_str(&format!("  • {}\n", escape_html(r.label())));
    }
    msg.push('\n');
}
