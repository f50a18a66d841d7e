use crate::catalog::CatalogRow;
use std::sync::Once;
use tracing_subscriber;

static INIT: Once = Once::new();

/// Initialize test logging in a thread-safe way.
/// Ensures the subscriber is installed only once even when multiple test
/// files run in parallel.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    });
}

/// A small catalog mirroring the shape of the real data: one site with
/// several café rows (including an exact duplicate and a placeholder
/// review), and a second site with a single café.
pub fn sample_catalog_rows() -> Vec<CatalogRow> {
    fn row(
        site: &str,
        cafe: &str,
        rating: f64,
        cafe_review: Option<&str>,
        site_review: Option<&str>,
    ) -> CatalogRow {
        CatalogRow {
            site_name: site.to_string(),
            cafe_name: cafe.to_string(),
            cafe_rating: rating,
            cafe_review: cafe_review.map(String::from),
            site_review: site_review.map(String::from),
        }
    }

    vec![
        row("청남대", "카페A", 4.5, Some("맛있어요"), Some("경치가 좋아요")),
        row("청남대", "카페A", 4.5, Some("맛있어요"), Some("경치가 좋아요")),
        row("청남대", "카페B", 4.0, Some("없음"), Some("산책하기 좋아요")),
        row("상당산성", "성곽카페", 4.2, Some("뷰가 멋져요"), None),
    ]
}
