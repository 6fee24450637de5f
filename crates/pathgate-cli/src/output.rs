//! Output formatting helpers.

use comfy_table::presets::UTF8_FULL;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::Table;

/// Create a styled table for terminal output
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
