use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Pagination metadata, identical for every entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
    /// 1-based position of the first row on this page; `None` when the page is empty.
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl PageMeta {
    pub fn new(current_page: u64, per_page: u64, total: u64, rows_on_page: usize) -> Self {
        let per_page = per_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);
        let (from, to) = if rows_on_page == 0 {
            (None, None)
        } else {
            let rows = u64::try_from(rows_on_page).unwrap_or(u64::MAX);
            let from = current_page
                .saturating_sub(1)
                .saturating_mul(per_page)
                .saturating_add(1);
            (Some(from), Some(from.saturating_add(rows - 1)))
        };
        Self {
            current_page,
            last_page,
            per_page,
            total,
            from,
            to,
        }
    }
}

/// Paged envelope returned by every listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PagedResult<T> {
    pub fn new(data: Vec<T>, current_page: u64, per_page: u64, total: u64) -> Self {
        let meta = PageMeta::new(current_page, per_page, total, data.len());
        Self { data, meta }
    }

    pub fn empty(current_page: u64, per_page: u64) -> Self {
        Self::new(Vec::new(), current_page, per_page, 0)
    }

    pub fn map<U, F>(self, f: F) -> PagedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PagedResult {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PagedResult<Value> {
    /// Deserialize JSON rows into typed entities.
    pub fn try_map_rows<T: DeserializeOwned>(self) -> Result<PagedResult<T>, serde_json::Error> {
        let data = self
            .data
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        Ok(PagedResult {
            data,
            meta: self.meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn meta_for_middle_page() {
        let meta = PageMeta::new(2, 15, 40, 15);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.from, Some(16));
        assert_eq!(meta.to, Some(30));
    }

    #[test]
    fn meta_for_empty_result() {
        let meta = PageMeta::new(1, 15, 0, 0);
        assert_eq!(meta.last_page, 1);
        assert_eq!(meta.from, None);
        assert_eq!(meta.to, None);
    }

    #[test]
    fn meta_past_last_page() {
        let meta = PageMeta::new(9, 10, 12, 0);
        assert_eq!(meta.last_page, 2);
        assert_eq!(meta.from, None);
    }

    #[test]
    fn meta_saturates_at_huge_offsets() {
        let meta = PageMeta::new(1 << 62, 8, 100, 1);
        assert_eq!(meta.from, Some(u64::MAX));
        assert_eq!(meta.to, Some(u64::MAX));

        let meta = PageMeta::new(u64::MAX, u64::MAX, u64::MAX, 3);
        assert_eq!(meta.last_page, 1);
        assert_eq!(meta.to, Some(u64::MAX));
    }

    proptest! {
        #[test]
        fn meta_bounds_hold_for_any_input(
            page in any::<u64>(),
            per_page in any::<u64>(),
            total in any::<u64>(),
            rows in 0usize..64,
        ) {
            let meta = PageMeta::new(page, per_page, total, rows);
            prop_assert!(meta.last_page >= 1);
            match (meta.from, meta.to) {
                (Some(from), Some(to)) => prop_assert!(from >= 1 && from <= to),
                (None, None) => prop_assert_eq!(rows, 0),
                other => prop_assert!(false, "mismatched bounds {:?}", other),
            }
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Brand {
        id: u64,
        name: String,
    }

    #[test]
    fn rows_map_to_typed_entities() {
        let page = PagedResult::new(vec![json!({"id": 1, "name": "Acme", "extra": true})], 1, 15, 1);
        let typed = page.try_map_rows::<Brand>().unwrap();
        assert_eq!(typed.data, vec![Brand { id: 1, name: "Acme".into() }]);
        assert_eq!(typed.meta.total, 1);

        let broken = PagedResult::new(vec![json!({"id": "x"})], 1, 15, 1);
        assert!(broken.try_map_rows::<Brand>().is_err());
    }
}
