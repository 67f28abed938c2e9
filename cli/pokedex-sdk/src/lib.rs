pub mod models;
pub mod providers;
pub mod utils;

#[cfg(any(test, feature = "tests"))]
pub mod test_helpers;

pub use pokeapi_client as catalog;
