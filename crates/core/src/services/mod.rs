pub mod chart_service;
pub mod filter_service;
pub mod ingest_service;
pub mod normalize_service;
pub mod portfolio_service;
pub mod window_service;
