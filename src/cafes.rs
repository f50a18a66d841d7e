use crate::catalog::CatalogRow;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;

/// Fixed fallback when a place has no café rows at all. Doubles as the
/// "nothing found, recommending generically" message for unmatched places,
/// matching the behavior users already know.
pub const NO_CAFE_INFO: &str =
    "(해당 관광지 주변 카페 정보가 없어, 직접 추천할 수 있어요!)";

pub const CAFE_HEADER: &str = "☕️ 주변 추천 카페 정보:";

pub const NO_REVIEW_LINE: &str = "아직 리뷰가 없어요";

/// Reviews kept per café group.
pub const MAX_REVIEWS_PER_CAFE: usize = 3;

/// Literal strings the source data uses to mean "no review exists".
///
/// The set drifted between data revisions, so it is configuration rather
/// than a hardcoded pair. Comparison happens after trimming, and a blank
/// review always counts as a placeholder.
#[derive(Debug, Clone)]
pub struct PlaceholderSet {
    tokens: Vec<String>,
}

impl Default for PlaceholderSet {
    fn default() -> Self {
        Self::new(vec!["없음".to_string(), "리뷰 없음".to_string()])
    }
}

impl PlaceholderSet {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// True when the review carries no content worth displaying.
    pub fn is_placeholder(&self, review: &str) -> bool {
        let trimmed = review.trim();
        trimmed.is_empty() || self.tokens.iter().any(|t| t == trimmed)
    }

    /// The review text, if it survives the placeholder filter.
    fn keep<'a>(&self, review: Option<&'a str>) -> Option<&'a str> {
        review
            .map(str::trim)
            .filter(|r| !self.is_placeholder(r))
    }
}

/// Rows aggregated per café identity, with surviving reviews in
/// first-seen order. Ephemeral; computed per request.
#[derive(Debug, Clone, Serialize)]
pub struct CafeGroup {
    pub cafe_name: String,
    pub cafe_rating: f64,
    pub reviews: Vec<String>,
}

// Distinct rows on (cafe_name, cafe_rating, cafe_review), first-seen order.
fn distinct_cafe_rows<'a>(rows: &[&'a CatalogRow]) -> Vec<&'a CatalogRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| {
            seen.insert((
                row.cafe_name.clone(),
                row.cafe_rating.to_bits(),
                row.cafe_review.clone(),
            ))
        })
        .copied()
        .collect()
}

/// Group matched rows by café identity `(cafe_name, cafe_rating)`,
/// deduplicating reviews, dropping placeholders, and keeping at most
/// [`MAX_REVIEWS_PER_CAFE`] reviews per group in first-seen order.
pub fn group_cafes(
    rows: &[&CatalogRow],
    placeholders: &PlaceholderSet,
) -> Vec<CafeGroup> {
    let mut groups: Vec<CafeGroup> = Vec::new();
    for row in distinct_cafe_rows(rows) {
        let group = match groups.iter_mut().find(|g| {
            g.cafe_name == row.cafe_name
                && g.cafe_rating.to_bits() == row.cafe_rating.to_bits()
        }) {
            Some(group) => group,
            None => {
                groups.push(CafeGroup {
                    cafe_name: row.cafe_name.clone(),
                    cafe_rating: row.cafe_rating,
                    reviews: Vec::new(),
                });
                groups.last_mut().unwrap()
            }
        };

        if group.reviews.len() >= MAX_REVIEWS_PER_CAFE {
            continue;
        }
        if let Some(review) = placeholders.keep(row.cafe_review.as_deref()) {
            if !group.reviews.iter().any(|r| r == review) {
                group.reviews.push(review.to_string());
            }
        }
    }
    groups
}

/// Render the café block for one place.
///
/// The shape depends on how many distinct café rows matched: a fixed
/// no-info fallback for zero, a one-line café entry for exactly one, and
/// a grouped multi-café listing otherwise. Pure function of its input.
pub fn format_cafes(rows: &[&CatalogRow], placeholders: &PlaceholderSet) -> String {
    let distinct = distinct_cafe_rows(rows);
    match distinct.len() {
        0 => NO_CAFE_INFO.to_string(),
        1 => {
            let row = distinct[0];
            let mut block = format!(
                "{}\n- **{}** (⭐ {:.1})",
                CAFE_HEADER, row.cafe_name, row.cafe_rating
            );
            if let Some(review) = placeholders.keep(row.cafe_review.as_deref())
            {
                write!(block, ": {}", review).unwrap();
            }
            block
        }
        _ => {
            let mut block = CAFE_HEADER.to_string();
            for group in group_cafes(rows, placeholders) {
                write!(
                    block,
                    "\n- **{}** (⭐ {:.1})",
                    group.cafe_name, group.cafe_rating
                )
                .unwrap();
                if group.reviews.is_empty() {
                    write!(block, "\n  - {}", NO_REVIEW_LINE).unwrap();
                } else {
                    for review in &group.reviews {
                        write!(block, "\n  - {}", review).unwrap();
                    }
                }
            }
            block
        }
    }
}

/// Up to three deduplicated visitor reviews of the site itself, in
/// first-seen order. An empty result means the caller renders no review
/// section at all.
pub fn summarize_reviews(
    rows: &[&CatalogRow],
    placeholders: &PlaceholderSet,
) -> Vec<String> {
    let mut reviews: Vec<String> = Vec::new();
    for row in rows {
        if reviews.len() >= 3 {
            break;
        }
        if let Some(review) = placeholders.keep(row.site_review.as_deref()) {
            if !reviews.iter().any(|r| r == review) {
                reviews.push(review.to_string());
            }
        }
    }
    reviews
}
