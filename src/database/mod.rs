pub mod connection;
pub mod model;
