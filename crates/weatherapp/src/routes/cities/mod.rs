pub mod city_routes;

pub use city_routes::*;
