pub mod bot;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fanout;
pub mod models;
pub mod notify;
pub mod renderer;
pub mod scrapers;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use discovery::{Discovery, DiscoveryEngine, Session};
pub use error::{Result, ScoutError};
pub use fanout::FanOut;
pub use models::{CompleteDetails, DetailRecord, Details, ListingId, Listings};
