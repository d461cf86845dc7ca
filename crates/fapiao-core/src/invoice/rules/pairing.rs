//! Quantity / unit price disambiguation by factor pairing.
//!
//! An item row prints quantity, unit price and their product (the amount),
//! often alongside the tax amount. Column order is not trusted: the first pair
//! of numbers whose product equals another number on the row is taken as
//! (quantity, unit price).

use rust_decimal::Decimal;
use tracing::debug;

/// Quantity and unit price chosen from a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuantityPrice {
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

/// Choose quantity and unit price among the numbers of an item row.
///
/// Pairs `(i, j)` with `i < j` are tried in ascending index order; the first
/// whose product is within `tolerance` (exclusive) of a third number wins.
/// Without a matching pair the first two numbers are used positionally; a
/// single number is the quantity.
pub fn pair_quantity_price(numbers: &[Decimal], tolerance: Decimal) -> QuantityPrice {
    match numbers {
        [] => QuantityPrice::default(),
        [only] => QuantityPrice {
            quantity: Some(*only),
            unit_price: None,
        },
        [first, second, ..] => {
            let matches = factor_pairs(numbers, tolerance);
            if matches.len() > 1 {
                debug!(
                    "Ambiguous item row {:?}: {} factor pairs, taking the first",
                    numbers,
                    matches.len()
                );
            }

            let (quantity, unit_price) = match matches.first() {
                Some(&(i, j)) => (numbers[i], numbers[j]),
                None => {
                    debug!("No factor pair in {:?}, using column order", numbers);
                    (*first, *second)
                }
            };

            QuantityPrice {
                quantity: Some(quantity),
                unit_price: Some(unit_price),
            }
        }
    }
}

/// All index pairs whose product matches another number of the row.
fn factor_pairs(numbers: &[Decimal], tolerance: Decimal) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();

    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            let Some(product) = numbers[i].checked_mul(numbers[j]) else {
                continue;
            };
            let matched = numbers
                .iter()
                .enumerate()
                .any(|(k, n)| {
                    k != i
                        && k != j
                        && n.checked_sub(product)
                            .is_some_and(|diff| diff.abs() < tolerance)
                });
            if matched {
                pairs.push((i, j));
            }
        }
    }

    pairs
}
