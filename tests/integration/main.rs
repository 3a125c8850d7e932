//! End-to-end tests driving the HTTP router against in-memory stores.

mod helpers;

mod http_test;
mod session_lifecycle_test;
