//! A generator that writes nothing.

use crate::error::GenerateError;
use crate::generator::{GenerateContext, Generator};

/// Resolves the project without producing files.
///
/// Useful to validate a project description and persist selections.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyGenerator;

impl Generator for DummyGenerator {
    fn name(&self) -> &str {
        "dummy"
    }

    fn description(&self) -> &str {
        "resolve the project without generating files"
    }

    fn generate(&self, context: &mut GenerateContext<'_>) -> Result<(), GenerateError> {
        let model = context.model();
        context.logger().debug(&format!(
            "target \"{}\": {} files, {} defines",
            model.target_name,
            model.all_files().count(),
            model.defines.len()
        ));
        Ok(())
    }
}
