use crate::{options::Hazard, vector};
use anyhow::Result;
use evac::safezone::preliminary_safe_zone;
use log::info;

impl Hazard {
    pub fn run(&self) -> Result<()> {
        let study_area = vector::read_shape(&self.study_area)?;
        let hazard = vector::read_shape(&self.hazard)?;
        let safe = preliminary_safe_zone(&study_area, &hazard);
        vector::write_polygons(&self.out, &safe)?;
        info!(
            "{} preliminary safe zone polygons written to {}",
            safe.len(),
            self.out.display()
        );
        Ok(())
    }
}
