pub mod registry;

pub use registry::{ResourceMeta, RuntimeType};
