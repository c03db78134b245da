//! # bizrelay
//!
//! HTTP front end for company-registry lookups and transactional email.
//!
//! ## Routes
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/health` | liveness |
//! | GET | `/info` | build version |
//! | GET | `/api/entreprise/{identifier}` | canonical company record |
//! | POST | `/api/send-email`, `/send-email` | compose and relay an email |
//! | OPTIONS | any | CORS preflight |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cors;
mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use cors::AllowedOrigins;
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
