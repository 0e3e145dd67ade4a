//! HTTP adapters for Nutq
//!
//! Implementations of the `nutq-attempt` ports that talk to the Nutq web
//! backend with `reqwest`, plus a parser for the detailed JSON returned by
//! the speech-assessment service.

pub mod assessment;
pub mod config;
pub mod error;
pub mod scores;
pub mod token;

pub use assessment::parse_detailed_result;
pub use config::ClientConfig;
pub use error::ClientError;
pub use scores::HttpScoreGateway;
pub use token::HttpAuthorizationProvider;
