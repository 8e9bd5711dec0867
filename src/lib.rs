//! Invoice dashboard backend.
//!
//! Form-based invoice management over a relational store, with credential
//! authentication and route-keyed cache invalidation. The unifying piece is
//! the mutation pipeline: validate → persist → invalidate → navigate.

pub mod auth;
pub mod cache;
pub mod models;
// The pipeline orchestrates validation, persistence, and cache invalidation
// per submitted form; navigation is a value interpreted by the REST layer.
pub mod pipeline;
pub mod rest;
pub mod storage;
pub mod validate;
