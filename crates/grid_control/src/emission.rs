use grid_core::{EmissionView, StateDocument};
use grid_store::StateStore;
use rand::Rng;

use crate::error::PipelineError;

/// Baseline emission generation and queries, run in-process.
pub struct EmissionStage<'a> {
    store: &'a StateStore,
}

impl<'a> EmissionStage<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }

    /// Generate emissions for every district of `year` that lacks them.
    /// Returns how many districts were generated.
    pub fn ensure(&self, year: &str, rng: &mut impl Rng) -> Result<usize, PipelineError> {
        grid_core::validate_year(year)?;
        let generated = self
            .store
            .update(|doc| grid_core::ensure_emissions(doc, year, rng))?;
        tracing::info!(year, generated, "emissions ensured");
        Ok(generated)
    }

    pub fn ensure_all_years(&self, rng: &mut impl Rng) -> Result<usize, PipelineError> {
        let generated = self
            .store
            .update(|doc| grid_core::ensure_emissions_all_years(doc, rng))?;
        tracing::info!(generated, "emissions ensured for all years");
        Ok(generated)
    }

    pub fn for_district(
        &self,
        district: &str,
        year: &str,
    ) -> Result<Option<EmissionView>, PipelineError> {
        Ok(grid_core::emission_for_district(&self.load()?, district, year))
    }

    pub fn for_all_districts(&self, year: &str) -> Result<Vec<EmissionView>, PipelineError> {
        Ok(grid_core::emission_for_all_districts(&self.load()?, year))
    }

    fn load(&self) -> Result<StateDocument, PipelineError> {
        Ok(self.store.load()?)
    }
}
