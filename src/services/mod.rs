/// Accounts, password hashing and access tokens.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Content generation entry points and saved games.
pub mod game_service;
/// Language-model backed and fallback question generators.
pub mod generator;
/// Google token verification and account linking.
pub mod google;
/// Health check service.
pub mod health_service;
/// Browser redirect handshake with Google.
pub mod oauth_service;
/// Live play sessions and score recording.
pub mod session_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
