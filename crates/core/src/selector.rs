//! Roulette-wheel selection over a candidate pool.

use rand::Rng;

use crate::model::DrugCard;

/// Anything that carries a positive selection weight.
pub trait Weighted {
    fn weight(&self) -> f64;
}

impl Weighted for DrugCard {
    fn weight(&self) -> f64 {
        DrugCard::weight(self)
    }
}

impl<T: Weighted + ?Sized> Weighted for &T {
    fn weight(&self) -> f64 {
        (**self).weight()
    }
}

/// Pick one item with probability proportional to its weight.
///
/// Draws `r` uniformly from `[0, total)` and walks the items in order, subtracting each
/// weight until `r` drops to zero or below. If rounding leaves `r` positive after the last
/// item, the last item is returned, so the result is `None` only for an empty slice.
pub fn select_weighted<'a, T, R>(items: &'a [T], rng: &mut R) -> Option<&'a T>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    let last = items.last()?;
    let total: f64 = items.iter().map(Weighted::weight).sum();

    let mut remaining = rng.random::<f64>() * total;
    for item in items {
        remaining -= item.weight();
        if remaining <= 0.0 {
            return Some(item);
        }
    }
    Some(last)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
