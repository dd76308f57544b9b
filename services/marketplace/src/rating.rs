use rust_decimal::{Decimal, RoundingStrategy};

/// Places kept on the stored mentor rating.
pub const RATING_SCALE: u32 = 2;
pub const MIN_REVIEW_RATING: i32 = 1;
pub const MAX_REVIEW_RATING: i32 = 5;

/// Mean of review scores rounded half away from zero, or zero for no reviews.
pub fn mean_rating(ratings: &[i32]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }

    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = Decimal::from(sum) / Decimal::from(ratings.len() as u64);
    mean.round_dp_with_strategy(RATING_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn is_valid_review_rating(rating: i32) -> bool {
    (MIN_REVIEW_RATING..=MAX_REVIEW_RATING).contains(&rating)
}
