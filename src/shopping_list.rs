use std::collections::BTreeMap;

use crate::models::CartLine;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

/// Sums amounts per (ingredient name, measurement unit). The result is
/// ordered by name, then unit.
pub fn aggregate_cart(lines: impl IntoIterator<Item = CartLine>) -> Vec<CartLine> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for CartLine {
        name,
        measurement_unit,
        amount,
    } in lines
    {
        *totals.entry((name, measurement_unit)).or_default() += amount;
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| CartLine {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

pub fn render_shopping_list(lines: &[CartLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{} — {} {}", line.name, line.amount, line.measurement_unit))
        .collect::<Vec<_>>()
        .join("\n")
}
