// Local relay that injects upstream proxy credentials outside the browser

pub mod error;
pub mod relay;
pub mod route;
mod tunnel;

pub use error::{Error, Result};
pub use relay::RelayServer;
pub use route::ProxyRoute;
