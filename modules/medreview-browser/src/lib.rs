pub mod error;
pub mod page;
pub mod session;

pub use error::{BrowserError, Result};
pub use page::{BrowserPage, CdpPage};
pub use session::BrowserSession;
