//! Options shared by every command

use std::sync::Arc;

use crate::process::{CommandRunner, SystemRunner};
use crate::storage::layout::StorageLayout;

/// Run options
#[derive(Clone)]
pub struct RunOptions {
    /// Project and state locations
    pub layout: StorageLayout,

    /// Print results as JSON instead of text
    pub json: bool,

    /// Process runner used for compose commands and scripts
    pub runner: Arc<dyn CommandRunner>,
}

impl RunOptions {
    pub fn new(layout: StorageLayout, json: bool) -> Self {
        Self {
            layout,
            json,
            runner: Arc::new(SystemRunner),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new(StorageLayout::default(), false)
    }
}
