pub mod base;
pub mod configs;
pub mod foundry;
pub mod sse;
pub mod stream;
pub mod translator;

// Mock transport for testing the streaming client without a live service
pub mod mock;
