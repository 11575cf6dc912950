// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod billing;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod db;
pub mod errors;
pub mod materialize;
pub mod models;
pub mod resolver;
pub mod rules;
pub mod store;
pub mod utils;

pub use errors::{Result, ScheduleError};
pub use store::{SqliteStore, Store};
