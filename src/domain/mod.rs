pub mod forecast;
pub mod records;
pub mod types;

pub use forecast::*;
pub use records::*;
pub use types::*;
