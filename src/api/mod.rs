pub mod client;
pub mod error;
pub mod ihme;
pub mod paginate;
pub mod transport;
