pub mod error;
pub mod result;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use result::QueryResult;
pub use types::{DataType, IpNetwork, Row};
pub use value::Value;
