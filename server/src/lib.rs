// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod persistence;
pub mod routes;
pub mod store;

pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use store::ScheduleStore;
