pub mod indicator;
pub mod location;
pub mod results;
pub mod summary;
pub mod window;
