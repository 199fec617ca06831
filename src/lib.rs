pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::entities;
pub use domain::errors;
pub use application::use_cases;
pub use infrastructure::output;
