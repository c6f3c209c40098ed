pub mod db;
pub mod error;
pub mod query;
pub mod routes;
pub mod seeding;
mod startup;
mod utils;

pub use db::*;
pub use error::Error;
pub use routes::*;
pub use startup::*;
pub use utils::*;
