mod allocator;
pub mod builder;
mod keystream;
mod searcher;
mod store;
pub mod unit;

pub use self::builder::Builder;
pub use self::searcher::*;
pub use self::unit::Unit;
