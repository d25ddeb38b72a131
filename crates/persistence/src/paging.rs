//! Paginated listing types.
//!
//! A paged fetch is two queries over the same predicate: the data query for
//! one page and an independent count query for the total. Callers state both
//! explicitly through [`PagedQuery`]; the core never derives one from the
//! other by rewriting SQL text.

use serde::{Deserialize, Serialize};

/// Paging descriptor accompanying a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Row count of the predicate independent of paging.
    pub total_count: u64,
    /// The page size that was requested.
    pub limit: i64,
    /// The offset that was requested.
    pub offset: i64,
}

/// An ordered page of results plus its [`Paging`] descriptor.
///
/// Invariant: `items.len() <= limit`, and `total_count` reflects the
/// unpaged row count of the same predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// The items in this page, in result order.
    pub items: Vec<T>,
    /// Paging information.
    pub paging: Paging,
}

impl<T> PagedResult<T> {
    /// Creates a page from items and its descriptor.
    pub fn new(items: Vec<T>, paging: Paging) -> Self {
        Self { items, paging }
    }

    /// Creates an empty page for the given window.
    pub fn empty(limit: i64, offset: i64) -> Self {
        Self {
            items: Vec::new(),
            paging: Paging {
                total_count: 0,
                limit,
                offset,
            },
        }
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maps the items to a different type, keeping the descriptor.
    pub fn map<U, F>(self, f: F) -> PagedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            paging: self.paging,
        }
    }
}

/// The explicit two-query contract for a paged fetch.
///
/// `data_sql` selects the rows (with its `ORDER BY`, without any
/// `LIMIT`/`OFFSET` clause - the executor appends those as the final two
/// bind parameters). `count_sql` computes the unpaged total of the same
/// predicate and must use the same caller-supplied parameters.
///
/// ```
/// use alexandria_persistence::paging::PagedQuery;
///
/// let query = PagedQuery::new(
///     "SELECT * FROM items WHERE name ILIKE $1 ORDER BY id",
///     "SELECT count(*) FROM items WHERE name ILIKE $1",
/// );
/// assert!(query.data_sql().contains("ORDER BY"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedQuery {
    data_sql: String,
    count_sql: String,
}

impl PagedQuery {
    /// Creates a paged query from an explicit data/count pair.
    pub fn new(data_sql: impl Into<String>, count_sql: impl Into<String>) -> Self {
        Self {
            data_sql: data_sql.into(),
            count_sql: count_sql.into(),
        }
    }

    /// Generates the pair for the common single-predicate case.
    ///
    /// `source` is everything between `FROM` and `ORDER BY` (table plus any
    /// `WHERE` clause with `$n` placeholders).
    ///
    /// ```
    /// use alexandria_persistence::paging::PagedQuery;
    ///
    /// let query = PagedQuery::for_select("*", "items WHERE name ILIKE $1", "id");
    /// assert_eq!(
    ///     query.data_sql(),
    ///     "SELECT * FROM items WHERE name ILIKE $1 ORDER BY id"
    /// );
    /// assert_eq!(
    ///     query.count_sql(),
    ///     "SELECT count(*) FROM items WHERE name ILIKE $1"
    /// );
    /// ```
    pub fn for_select(projection: &str, source: &str, order_by: &str) -> Self {
        Self {
            data_sql: format!("SELECT {} FROM {} ORDER BY {}", projection, source, order_by),
            count_sql: format!("SELECT count(*) FROM {}", source),
        }
    }

    /// Returns the data query text (without the paging window).
    pub fn data_sql(&self) -> &str {
        &self.data_sql
    }

    /// Returns the count query text.
    pub fn count_sql(&self) -> &str {
        &self.count_sql
    }

    /// Returns the data query with the paging window appended.
    ///
    /// Limit and offset become the final two bind parameters, numbered after
    /// the `param_count` caller-supplied ones, in that fixed order.
    pub(crate) fn windowed_data_sql(&self, param_count: usize) -> String {
        format!(
            "{} LIMIT ${} OFFSET ${}",
            self.data_sql,
            param_count + 1,
            param_count + 2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_result_map() {
        let page = PagedResult::new(
            vec![1, 2, 3],
            Paging {
                total_count: 10,
                limit: 3,
                offset: 0,
            },
        );
        let mapped = page.map(|x| x * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.paging.total_count, 10);
    }

    #[test]
    fn test_paged_result_empty() {
        let page: PagedResult<String> = PagedResult::empty(25, 50);
        assert!(page.is_empty());
        assert_eq!(page.len(), 0);
        assert_eq!(page.paging.limit, 25);
        assert_eq!(page.paging.offset, 50);
    }

    #[test]
    fn test_for_select() {
        let query = PagedQuery::for_select("id, name", "items WHERE name ILIKE $1", "name, id");
        assert_eq!(
            query.data_sql(),
            "SELECT id, name FROM items WHERE name ILIKE $1 ORDER BY name, id"
        );
        assert_eq!(
            query.count_sql(),
            "SELECT count(*) FROM items WHERE name ILIKE $1"
        );
    }

    #[test]
    fn test_windowed_data_sql_numbers_after_params() {
        let query = PagedQuery::for_select("*", "items WHERE name ILIKE $1", "id");
        assert_eq!(
            query.windowed_data_sql(1),
            "SELECT * FROM items WHERE name ILIKE $1 ORDER BY id LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_windowed_data_sql_no_params() {
        let query = PagedQuery::for_select("*", "items", "id");
        assert_eq!(
            query.windowed_data_sql(0),
            "SELECT * FROM items ORDER BY id LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_paging_serde_round_trip() {
        let paging = Paging {
            total_count: 2,
            limit: 1,
            offset: 1,
        };
        let json = serde_json::to_string(&paging).unwrap();
        let back: Paging = serde_json::from_str(&json).unwrap();
        assert_eq!(back, paging);
    }
}
