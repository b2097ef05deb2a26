use crate::errors::CoreError;
use crate::models::chart::PlotStyle;
use crate::models::price::{PriceField, PriceTable};

/// Rescales each symbol's prices relative to its first row in the table.
///
/// Symbols are scaled independently; one symbol's data never affects another.
pub struct SeriesNormalizer;

impl SeriesNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Divide every price field of each symbol by that symbol's first
    /// `datum_field` value, so the series starts at 1.0 in that field.
    /// With `normalize` off the table is returned unchanged.
    ///
    /// Fails with `ZeroDatum` if a symbol's first value is zero.
    pub fn normalize(
        &self,
        table: &PriceTable,
        datum_field: PriceField,
        normalize: bool,
    ) -> Result<PriceTable, CoreError> {
        if !normalize {
            return Ok(table.clone());
        }

        let mut out = PriceTable::new();
        for (symbol, bars) in table.iter() {
            let Some(first) = bars.first() else {
                out.insert(symbol, Vec::new());
                continue;
            };
            let datum = first.get(datum_field);
            if datum == 0.0 {
                return Err(CoreError::ZeroDatum {
                    symbol: symbol.to_string(),
                });
            }
            out.insert(symbol, bars.iter().map(|b| b.scaled(datum)).collect());
        }
        Ok(out)
    }

    /// Normalize for a given plot style: candles anchor on `open`,
    /// lines on the displayed field.
    pub fn normalize_for(
        &self,
        table: &PriceTable,
        price_field: PriceField,
        style: PlotStyle,
        normalize: bool,
    ) -> Result<PriceTable, CoreError> {
        self.normalize(table, style.datum_field(price_field), normalize)
    }
}

impl Default for SeriesNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
