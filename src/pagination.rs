use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    Ten,
    TwentyFive,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::TwentyFive,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    pub fn rows(self) -> usize {
        match self {
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }

    pub fn from_rows(rows: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.rows() == rows)
    }

    /// The next larger size, wrapping around to the smallest.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rows())
    }
}

/// The visible slice of a projection. `page` is 1-based and already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub total_pages: usize,
    pub page_size: PageSize,
    /// Positions in the projection shown on this page.
    pub range: Range<usize>,
}

impl PageWindow {
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn rows<'a>(&self, projection: &'a [usize]) -> &'a [usize] {
        &projection[self.range.clone()]
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

pub fn total_pages(len: usize, page_size: PageSize) -> usize {
    len.div_ceil(page_size.rows())
}

/// Clamp `requested` into `[1, total_pages]`, or 1 when there is nothing to show.
pub fn clamp_page(requested: usize, total_pages: usize) -> usize {
    requested.clamp(1, total_pages.max(1))
}

pub fn paginate(len: usize, page_size: PageSize, requested: usize) -> PageWindow {
    let total_pages = total_pages(len, page_size);
    let page = clamp_page(requested, total_pages);
    let start = ((page - 1) * page_size.rows()).min(len);
    let end = (page * page_size.rows()).min(len);
    PageWindow {
        page,
        total_pages,
        page_size,
        range: start..end,
    }
}
