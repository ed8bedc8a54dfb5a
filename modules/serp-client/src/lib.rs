pub mod client;
pub mod credential;
pub mod error;
pub mod normalize;
pub mod types;

pub use client::{SerpClient, ORGANIC_LIVE_ADVANCED};
pub use credential::{Credential, CredentialResolver};
pub use error::{Result, SerpError};
pub use normalize::{extract_organic_results, organic_items};
pub use types::{ResultRecord, TaskResult, UpstreamRequest, UpstreamResponse, SUCCESS_STATUS};
