// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid input: {message}")]
    Validation { message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ScheduleError {
    pub fn validation(message: impl Into<String>) -> Self {
        ScheduleError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        ScheduleError::NotFound { entity, id }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ScheduleError::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ScheduleError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
