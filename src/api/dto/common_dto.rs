//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::DownloadQuality;

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl PaginationParams {
    /// Clamps `per_page` to the allowed maximum of 100.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    /// Cuts one page out of `items` and describes it.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>) -> (Vec<T>, PaginationMeta) {
        let params = self.clamped();
        let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(params.per_page)
        };
        let start = usize::try_from(
            u64::from(params.page.saturating_sub(1)).saturating_mul(u64::from(params.per_page)),
        )
        .unwrap_or(usize::MAX);
        let data = items
            .into_iter()
            .skip(start)
            .take(params.per_page as usize)
            .collect();
        (
            data,
            PaginationMeta {
                page: params.page,
                per_page: params.per_page,
                total,
                total_pages,
            },
        )
    }
}

/// `?quality=` query for image downloads and exports.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QualityQuery {
    /// `normal` (default), `hd` or `2k`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub quality: DownloadQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_slices_requested_page() {
        let params = PaginationParams {
            page: 2,
            per_page: 2,
        };
        let (page, meta) = params.paginate(vec![1, 2, 3, 4, 5]);
        assert_eq!(page, vec![3, 4]);
        assert_eq!(meta.total, 5);
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn paginate_past_end_is_empty() {
        let params = PaginationParams {
            page: 9,
            per_page: 500,
        };
        let (page, meta) = params.paginate(vec!["a", "b"]);
        assert!(page.is_empty());
        assert_eq!(meta.per_page, 100);
        assert_eq!(meta.total_pages, 1);
    }
}
