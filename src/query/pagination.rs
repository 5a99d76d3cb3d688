//! Pagination input shared by the list-style GraphQL queries.

use serde::Serialize;

pub const DEFAULT_PAGE_NUM: i32 = 1;
pub const DEFAULT_PAGE_SIZE: i32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_num: i32,
    pub page_size: i32,
}

impl Pagination {
    /// Clamp non-positive values to the defaults (page 1, 15 items).
    pub fn build(page_num: i32, page_size: i32) -> Self {
        Self {
            page_num: if page_num <= 0 {
                DEFAULT_PAGE_NUM
            } else {
                page_num
            },
            page_size: if page_size <= 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clamps_non_positive_values_to_defaults() {
        assert_eq!(Pagination::build(0, 0), Pagination::build(-3, -10));
        assert_eq!(Pagination::build(0, 0).page_num, DEFAULT_PAGE_NUM);
        assert_eq!(Pagination::build(0, 0).page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn keeps_positive_values() {
        let paging = Pagination::build(3, 50);
        assert_eq!(paging.page_num, 3);
        assert_eq!(paging.page_size, 50);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(Pagination::build(2, 20)).unwrap();
        assert_eq!(value, json!({"pageNum": 2, "pageSize": 20}));
    }
}
