//! Auxiliary relays — thin pass-throughs with degrade-gracefully semantics.
//!
//! Speech synthesis needs a credential and fails loudly without one; web
//! search and weather never fail the caller, substituting deterministic
//! fallback payloads instead.

pub mod speech;
pub mod weather;
pub mod web_search;

pub use speech::SpeechSynthesizer;
pub use weather::{WeatherReport, WeatherService};
pub use web_search::{SearchResult, SearchResults, WebSearchService};
