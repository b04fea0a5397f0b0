use super::types::{Review, ReviewState};

/// Outcome of reducing a review list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub approved: bool,
    pub in_review: bool,
}

/// Folds reviews into approval flags.
///
/// Plain comments are ignored. Any other review marks the pull request as in
/// review, and a single approval is enough for `approved`. There is no
/// recency handling: an approval followed by a change request still counts
/// as approved. The result is an OR over the states, so review order does not
/// matter.
pub fn classify<'a, I>(reviews: I) -> ReviewSummary
where
    I: IntoIterator<Item = &'a Review>,
{
    reviews
        .into_iter()
        .filter(|review| review.state != ReviewState::Commented)
        .fold(ReviewSummary::default(), |summary, review| ReviewSummary {
            approved: summary.approved || review.state == ReviewState::Approved,
            in_review: true,
        })
}
