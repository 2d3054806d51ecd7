use serde::{Deserialize, Serialize};

use crate::error::LenderError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw pagination query string, as sent by the web client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_no: Option<i64>,
    #[serde(alias = "rpp")]
    pub page_size: Option<i64>,
    #[serde(alias = "orderby")]
    pub order_by: Option<String>,
    pub dir: Option<String>,
    pub search_term: Option<String>,
    pub count_limit: Option<i64>,
}

/// Validated pagination. `order_by` is always one of the caller's allowed columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    pub page_no: i64,
    pub page_size: i64,
    pub order_by: &'static str,
    pub dir: SortDir,
    pub search_term: Option<String>,
    /// Zero means an exact count.
    pub count_limit: i64,
}

impl Paging {
    pub fn offset(&self) -> i64 {
        (self.page_no - 1).saturating_mul(self.page_size)
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page_no: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: "uid",
            dir: SortDir::Desc,
            search_term: None,
            count_limit: 0,
        }
    }
}

impl PageQuery {
    /// Resolve against a whitelist of sortable columns. The first entry is the default.
    pub fn resolve(&self, sortable: &[&'static str]) -> Result<Paging, LenderError> {
        let page_no = self.page_no.filter(|n| *n > 0).unwrap_or(1);
        let page_size = self
            .page_size
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        let order_by = match self.order_by.as_deref().map(str::trim) {
            None | Some("") => sortable.first().copied().unwrap_or("uid"),
            Some(requested) => sortable
                .iter()
                .copied()
                .find(|col| col.eq_ignore_ascii_case(requested))
                .ok_or_else(|| {
                    LenderError::InvalidInput(format!("cannot order by '{requested}'"))
                })?,
        };

        let dir = match self.dir.as_deref().map(str::trim) {
            None | Some("") => SortDir::Desc,
            Some(d) if d.eq_ignore_ascii_case("asc") => SortDir::Asc,
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDir::Desc,
            Some(d) => {
                return Err(LenderError::InvalidInput(format!(
                    "dir must be ASC or DESC, got '{d}'"
                )))
            }
        };

        let search_term = self
            .search_term
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Paging {
            page_no,
            page_size,
            order_by,
            dir,
            search_term,
            count_limit: self.count_limit.filter(|n| *n > 0).unwrap_or(0),
        })
    }
}

/// One page of rows plus the (possibly capped) total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub count: i64,
}
