//! Pass pipeline

use log::{debug, info};
use rois_ir::{IrError, Module};
use crate::{ConstantFold, DeadTail, Pass};

/// Runs a sequence of passes over every non-extern function of a module
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Default pipeline: constant folding, then dead-tail elimination
    pub fn new() -> Self {
        Self {
            passes: vec![Box::new(ConstantFold), Box::new(DeadTail)],
        }
    }

    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn add_pass(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Returns whether any pass changed any function
    pub fn run(&self, module: &mut Module) -> Result<bool, IrError> {
        let mut changed = false;
        for func in module.functions.iter_mut().filter(|f| !f.is_extern) {
            for pass in &self.passes {
                let pass_changed = pass.run_on_function(func)?;
                debug!("{} on {}: changed={}", pass.name(), func.name, pass_changed);
                changed |= pass_changed;
            }
        }
        info!("optimized module {} (changed={})", module.name, changed);
        Ok(changed)
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}
