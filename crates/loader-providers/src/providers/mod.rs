mod fmp;
mod fred;
mod polygon;

pub use fmp::FmpAdapter;
pub use fred::{FredAdapter, SERIES as FRED_SERIES};
pub use polygon::PolygonAdapter;
