//! Dataset loading port trait.

use std::path::Path;

use crate::domain::dataset::FinancialDataset;
use crate::domain::error::FinmetricsError;

pub trait DatasetPort {
    fn load(&self, path: &Path) -> Result<FinancialDataset, FinmetricsError>;
}
