//! Document frequency bookkeeping for TF-IDF features.
//!
//! - [`table`]: the in-memory [`DocumentFrequencyTable`] and its line format
//! - [`store`]: default and named tables persisted under one storage root
//! - [`collector`]: a training pass that fills a table from feature lists

pub mod collector;
pub mod store;
pub mod table;

pub use collector::IdfCollector;
pub use store::IdfStore;
pub use table::DocumentFrequencyTable;
