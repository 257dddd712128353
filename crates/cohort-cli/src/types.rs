use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub struct RunResult {
    pub output: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub patients: usize,
    pub label_columns: usize,
    pub duration: Duration,
}
