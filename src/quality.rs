//! Quality scale conversion
//!
//! Quality is stored on a 0-100 score everywhere. The 1-5 rating only exists
//! at the API boundary.

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;
pub const MAX_SCORE: i32 = 100;

/// Score points per rating step
const SCORE_PER_RATING: f64 = 20.0;

/// Convert a 0-100 score to a 1-5 rating: `round(score / 20)`, clamped
pub fn rating_from_score(score: i32) -> i32 {
    let rating = (f64::from(score) / SCORE_PER_RATING).round() as i32;
    rating.clamp(MIN_RATING, MAX_RATING)
}

/// Convert a 1-5 rating to a 0-100 score: `rating * 20`, rating clamped first
pub fn score_from_rating(rating: i32) -> i32 {
    let rating = rating.clamp(MIN_RATING, MAX_RATING);
    (f64::from(rating) * SCORE_PER_RATING).round() as i32
}

/// Whether `rating` lies on the 1-5 scale
pub fn is_valid_rating(rating: i32) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}

/// Clamp an arbitrary score onto 0-100
pub fn clamp_score(score: i32) -> i32 {
    score.clamp(0, MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_round_trip() {
        for rating in MIN_RATING..=MAX_RATING {
            assert_eq!(rating_from_score(score_from_rating(rating)), rating);
        }
    }

    #[test]
    fn score_rounds_to_nearest_rating() {
        assert_eq!(rating_from_score(70), 4);
        assert_eq!(rating_from_score(69), 3);
        assert_eq!(rating_from_score(90), 5);
        assert_eq!(rating_from_score(100), 5);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(rating_from_score(0), 1);
        assert_eq!(rating_from_score(5), 1);
        assert_eq!(score_from_rating(9), 100);
        assert_eq!(score_from_rating(0), 20);
        assert_eq!(clamp_score(140), 100);
        assert_eq!(clamp_score(-3), 0);
    }

    #[test]
    fn rating_validation() {
        assert!(is_valid_rating(1));
        assert!(is_valid_rating(5));
        assert!(!is_valid_rating(0));
        assert!(!is_valid_rating(6));
    }
}
