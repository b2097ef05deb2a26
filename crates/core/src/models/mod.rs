pub mod attribute;
pub mod chart;
pub mod collection;
pub mod filter;
pub mod option;
pub mod portfolio;
pub mod price;
pub mod settings;
pub mod symbol;
pub mod window;
