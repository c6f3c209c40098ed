pub mod cities;
pub mod weather;

pub use cities::*;
pub use weather::*;
