pub mod documents;
pub mod errors;
pub mod language;
pub mod message;
pub mod providers;
pub mod router;
