// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::CustodyEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CustodyEngine>,
    /// Secret store directory, checked by the readiness probe
    pub data_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(engine: CustodyEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            data_dir: None,
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }
}
