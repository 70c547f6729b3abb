//! Shared types for the Suuq marketplace: entity records, wire DTOs,
//! gateway events, the category/region catalog, bilingual text and the
//! posting/payment rules that every other crate leans on.

pub mod api;
pub mod catalog;
pub mod events;
pub mod i18n;
pub mod models;
pub mod pricing;
