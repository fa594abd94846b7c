// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Page requests to store windows and page metadata.
//!
//! A cursor is either a 1-indexed `{number, size}` page or unbounded. An
//! unbounded cursor still reads at most the configured maximum, while the
//! reported total always counts every row.

use nestchat_config::model::PaginationConfig;
use nestchat_core::types::Window;
use nestchat_core::NestchatError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Page { number: u64, size: u64 },
    Unbounded,
}

/// Raw `page[number]` / `page[size]` values, before validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageParams {
    pub number: Option<u64>,
    pub size: Option<u64>,
}

/// Totals reported alongside every paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_count: u64,
    pub total_pages: u64,
}

/// Resolves raw query parameters against the configured bounds.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    default_size: u64,
    max_size: u64,
}

impl Paginator {
    pub fn new(config: &PaginationConfig) -> Self {
        Self {
            default_size: config.default_page_size,
            max_size: config.max_page_size,
        }
    }

    /// No parameters yields [`Cursor::Unbounded`]; a lone number uses the
    /// default size.
    pub fn resolve(&self, number: Option<u64>, size: Option<u64>) -> Result<Cursor, NestchatError> {
        if number.is_none() && size.is_none() {
            return Ok(Cursor::Unbounded);
        }
        let number = number.unwrap_or(1);
        let size = size.unwrap_or(self.default_size);

        let mut violations = Vec::new();
        if number == 0 {
            violations.push(
                nestchat_core::Violation::new("invalid_page_number", "page number must be at least 1")
                    .at("page[number]"),
            );
        }
        if size == 0 || size > self.max_size {
            violations.push(
                nestchat_core::Violation::new(
                    "invalid_page_size",
                    format!("page size must be between 1 and {}", self.max_size),
                )
                .at("page[size]"),
            );
        }
        if !violations.is_empty() {
            return Err(NestchatError::Validation(violations));
        }
        Ok(Cursor::Page { number, size })
    }

    pub fn resolve_params(&self, params: PageParams) -> Result<Cursor, NestchatError> {
        self.resolve(params.number, params.size)
    }

    pub fn window(&self, cursor: Cursor) -> Window {
        match cursor {
            Cursor::Page { number, size } => Window {
                offset: number.saturating_sub(1).saturating_mul(size),
                limit: size,
            },
            Cursor::Unbounded => Window {
                offset: 0,
                limit: self.max_size,
            },
        }
    }

    /// An unbounded listing cannot be paged, so it reports at most one page.
    pub fn meta(&self, cursor: Cursor, total_count: u64) -> PageMeta {
        let total_pages = match cursor {
            Cursor::Page { size, .. } => total_count.div_ceil(size.max(1)),
            Cursor::Unbounded => u64::from(total_count > 0),
        };
        PageMeta {
            total_count,
            total_pages,
        }
    }

    /// Applies the cursor's window to an in-memory list.
    pub fn slice<T>(&self, cursor: Cursor, items: Vec<T>) -> Vec<T> {
        let window = self.window(cursor);
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}
