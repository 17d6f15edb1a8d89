pub mod executor;
pub mod store;
pub mod template;

pub use executor::{ActionExecutor, TransportGuard};
pub use store::{ActionResultStore, ResponseRecord};
pub use template::{TemplateContext, TemplateRenderer};
