//! Paged candidate list with a highlight cursor.
//!
//! The host always receives the whole list and selects by global index;
//! paging only drives the selection keys and the page indicator.

use std::ops::Range;

#[derive(Debug, Clone)]
pub struct CandidateList {
    candidates: Vec<String>,
    page_size: usize,
    current_page: usize,
    /// Position within the current page.
    cursor: usize,
}

impl CandidateList {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            candidates: Vec::new(),
            page_size: page_size.max(1),
            current_page: 0,
            cursor: 0,
        }
    }

    /// Replace the candidates and go back to the first page.
    pub fn set_candidates(&mut self, candidates: Vec<String>) {
        self.candidates = candidates;
        self.current_page = 0;
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.set_candidates(Vec::new());
    }

    pub fn all(&self) -> &[String] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.candidates.get(index).map(String::as_str)
    }

    pub fn num_pages(&self) -> usize {
        self.candidates.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    fn page_range(&self) -> Range<usize> {
        let start = (self.current_page * self.page_size).min(self.candidates.len());
        let end = (start + self.page_size).min(self.candidates.len());
        start..end
    }

    pub fn page(&self) -> &[String] {
        &self.candidates[self.page_range()]
    }

    /// Global index of the highlighted candidate.
    pub fn highlighted(&self) -> Option<usize> {
        let index = self.page_range().start + self.cursor;
        (index < self.candidates.len()).then_some(index)
    }

    /// Global index of the `nth` candidate on the current page.
    pub fn page_index(&self, nth: usize) -> Option<usize> {
        let range = self.page_range();
        (nth < range.len()).then(|| range.start + nth)
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.page_range().len().saturating_sub(1));
    }

    pub fn cursor_up(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn cursor_down(&mut self) -> bool {
        if self.cursor + 1 >= self.page_range().len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn page_up(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.current_page -= 1;
        self.clamp_cursor();
        true
    }

    pub fn page_down(&mut self) -> bool {
        if self.current_page + 1 >= self.num_pages() {
            return false;
        }
        self.current_page += 1;
        self.clamp_cursor();
        true
    }
}

impl Default for CandidateList {
    fn default() -> Self {
        Self::with_page_size(5)
    }
}
