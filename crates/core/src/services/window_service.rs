use chrono::NaiveDate;
use log::debug;

use crate::errors::CoreError;
use crate::models::price::PriceTable;
use crate::models::window::WindowSpec;

/// Narrows a multi-symbol price table to a date window.
pub struct TimeWindowSelector;

impl TimeWindowSelector {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `spec` against the table's date range.
    ///
    /// Named periods end on the latest date in the table. Manual bounds are
    /// clamped into the table's range, and fail with `InvalidRange` if the
    /// start still falls after the end.
    pub fn resolve(
        &self,
        table: &PriceTable,
        spec: &WindowSpec,
    ) -> Result<(NaiveDate, NaiveDate), CoreError> {
        let (min_date, max_date) = table.date_bounds().ok_or(CoreError::EmptyTable)?;

        match spec {
            WindowSpec::Named(period) => {
                let start = period
                    .length()
                    .and_then(|len| max_date.checked_sub_signed(len))
                    .map_or(min_date, |d| d.max(min_date));
                Ok((start, max_date))
            }
            WindowSpec::Manual { start, end } => {
                let start = (*start).clamp(min_date, max_date);
                let end = (*end).clamp(min_date, max_date);
                if start > end {
                    return Err(CoreError::InvalidRange { start, end });
                }
                Ok((start, end))
            }
        }
    }

    /// Rows of every symbol whose date falls inside the resolved window.
    pub fn select(&self, table: &PriceTable, spec: &WindowSpec) -> Result<PriceTable, CoreError> {
        let (start, end) = self.resolve(table, spec)?;
        let windowed = table.between(start, end);
        debug!(
            "window {start}..={end}: {} of {} rows kept",
            windowed.row_count(),
            table.row_count()
        );
        Ok(windowed)
    }
}

impl Default for TimeWindowSelector {
    fn default() -> Self {
        Self::new()
    }
}
