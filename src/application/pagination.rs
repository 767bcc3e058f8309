//! Page-number pagination shared by every feed.
//!
//! The engine never surfaces an error to the caller: malformed page
//! parameters fall back to page 1 and out-of-range requests clamp to the
//! last valid page.

use serde::Serialize;

/// Fixed page size used by all feed call sites.
pub const PAGE_SIZE: u32 = 10;

/// A validated, 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(u32);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    /// Lenient parse of the `page` query parameter. Absent, empty,
    /// non-numeric, zero or negative input yields page 1.
    pub fn from_query(raw: Option<&str>) -> Self {
        let parsed = raw
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value >= 1);
        Self(parsed.unwrap_or(1))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Resolved slice bounds for a page over a counted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSelection {
    pub number: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub offset: u64,
    pub limit: u32,
}

impl PageSelection {
    /// Clamp `requested` into the valid page range for `total_items`
    /// and compute the matching offset window. An empty collection
    /// still has one (empty) page.
    pub fn resolve(total_items: u64, page_size: u32, requested: PageNumber) -> Self {
        debug_assert!(page_size > 0);
        let size = u64::from(page_size.max(1));
        let total_pages = total_items.div_ceil(size).max(1);
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
        let number = requested.get().min(total_pages);
        let offset = u64::from(number - 1) * size;

        Self {
            number,
            total_pages,
            total_items,
            offset,
            limit: page_size.max(1),
        }
    }
}

/// A bounded slice of an ordered collection plus pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, selection: PageSelection) -> Self {
        Self {
            items,
            number: selection.number,
            total_pages: selection.total_pages,
            total_items: selection.total_items,
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            number: 1,
            total_pages: 1,
            total_items: 0,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn previous_number(&self) -> u32 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_number(&self) -> u32 {
        (self.number + 1).min(self.total_pages)
    }
}

/// Pure in-memory pagination for sequences already loaded in full.
pub fn paginate<T>(items: Vec<T>, page_size: u32, requested: PageNumber) -> Page<T> {
    let selection = PageSelection::resolve(items.len() as u64, page_size, requested);
    let items = items
        .into_iter()
        .skip(selection.offset as usize)
        .take(selection.limit as usize)
        .collect();
    Page::new(items, selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_defaults_to_first() {
        assert_eq!(PageNumber::from_query(None), PageNumber::FIRST);
        assert_eq!(PageNumber::from_query(Some("")), PageNumber::FIRST);
        assert_eq!(PageNumber::from_query(Some("abc")), PageNumber::FIRST);
        assert_eq!(PageNumber::from_query(Some("0")), PageNumber::FIRST);
        assert_eq!(PageNumber::from_query(Some("-3")), PageNumber::FIRST);
        assert_eq!(PageNumber::from_query(Some(" 2 ")).get(), 2);
    }

    #[test]
    fn resolve_computes_page_count() {
        let selection = PageSelection::resolve(14, 10, PageNumber::from_query(Some("1")));
        assert_eq!(selection.total_pages, 2);
        assert_eq!(selection.offset, 0);

        let selection = PageSelection::resolve(14, 10, PageNumber::from_query(Some("2")));
        assert_eq!(selection.number, 2);
        assert_eq!(selection.offset, 10);
    }

    #[test]
    fn resolve_clamps_out_of_range_to_last_page() {
        let selection = PageSelection::resolve(14, 10, PageNumber::from_query(Some("3")));
        assert_eq!(selection.number, 2);
        assert_eq!(selection.offset, 10);
    }

    #[test]
    fn resolve_empty_collection_has_one_page() {
        let selection = PageSelection::resolve(0, 10, PageNumber::from_query(Some("7")));
        assert_eq!(selection.number, 1);
        assert_eq!(selection.total_pages, 1);
        assert_eq!(selection.offset, 0);
    }

    #[test]
    fn paginate_never_exceeds_page_size() {
        for len in 0..35usize {
            let items: Vec<usize> = (0..len).collect();
            for page in ["0", "1", "2", "3", "4", "nope"] {
                let result = paginate(items.clone(), 10, PageNumber::from_query(Some(page)));
                assert!(result.items.len() <= 10, "len={len} page={page}");
            }
        }
    }

    #[test]
    fn paginate_last_page_holds_remainder() {
        let items: Vec<u32> = (0..14).collect();
        let page = paginate(items, 10, PageNumber::from_query(Some("2")));
        assert_eq!(page.items.len(), 4);
        assert_eq!(page.items[0], 10);
        assert!(page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn paginate_scenario_fourteen_posts() {
        let items: Vec<u32> = (0..14).collect();

        let first = paginate(items.clone(), 10, PageNumber::from_query(Some("1")));
        assert_eq!(first.items.len(), 10);

        let second = paginate(items.clone(), 10, PageNumber::from_query(Some("2")));
        assert_eq!(second.items.len(), 4);

        let clamped = paginate(items, 10, PageNumber::from_query(Some("3")));
        assert_eq!(clamped.number, 2);
        assert_eq!(clamped.items.len(), 4);
    }
}
