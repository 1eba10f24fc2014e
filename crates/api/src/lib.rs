//! HTTP API: router, request DTOs and error mapping over the inventory store.

pub mod app;
