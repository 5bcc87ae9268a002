// Resolver core: persistent directory database, query resolution, and error modeling.
pub mod error;
pub mod query;
pub mod store;
