pub mod setup;

#[allow(unused_imports)]
pub use setup::{TestServer, TestServerBuilder};
