//! Verdant Core
//!
//! Core types and abstractions for the Verdant field vision service.
//!
//! This crate contains:
//! - Domain types: Field analytics and video generation job records
//! - Backend: The capability interface to the remote generation backend
//! - DTOs: Data transfer objects for the HTTP API

pub mod backend;
pub mod domain;
pub mod dto;
