//! Route Handlers

pub mod gateway;
