use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 0;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub direction: Direction,
}

impl SortOrder {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Desc,
        }
    }
}

/// Raw `page`, `size` and `sort` query parameters of a collection read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
}

/// Validated paging and ordering for a collection scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
    pub sort: Vec<SortOrder>,
}

impl PageRequest {
    /// Builds a request from raw query values.
    ///
    /// `sort` is a comma-separated list of `field[.asc|.desc]`; a field without
    /// a direction sorts ascending. Every problem found is reported, not just
    /// the first one.
    pub fn parse(page: i64, size: i64, sort: &str, allowed: &[&str]) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();
        if page < 0 {
            errors.push("page: must be greater than or equal to 0".to_string());
        }
        if size < 1 {
            errors.push("size: must be greater than or equal to 1".to_string());
        }

        let mut orders = Vec::new();
        for entry in sort.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (field, direction) = match entry.split_once('.') {
                Some((field, dir)) => match dir.to_ascii_lowercase().as_str() {
                    "asc" => (field, Direction::Asc),
                    "desc" => (field, Direction::Desc),
                    _ => {
                        errors.push(format!("sort: unknown direction '{}' for '{}'", dir, field));
                        continue;
                    }
                },
                None => (entry, Direction::Asc),
            };
            if !allowed.contains(&field) {
                errors.push(format!("sort: unknown property '{}'", field));
                continue;
            }
            orders.push(SortOrder {
                field: field.to_string(),
                direction,
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            page: page as u64,
            size: size as u64,
            sort: orders,
        })
    }

    /// Applies the collection defaults to missing parameters.
    pub fn from_params(
        params: &ListParams,
        default_sort: &str,
        allowed: &[&str],
    ) -> Result<Self, Vec<String>> {
        Self::parse(
            params.page.unwrap_or(DEFAULT_PAGE),
            params.size.unwrap_or(DEFAULT_PAGE_SIZE),
            params.sort.as_deref().unwrap_or(default_sort),
            allowed,
        )
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

/// Page envelope returned by collection reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub sort: Vec<SortOrder>,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(request.size.max(1)),
            sort: request.sort.clone(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            sort: self.sort,
        }
    }
}
