use serde::{Deserialize, Serialize};

/// Attempts per issue: the initial request plus one strict re-prompt.
pub const MAX_ATTEMPTS: usize = 2;

/// Settings handed to the patch generator with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Model identifier; `None` leaves the choice to the generator
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 2048,
            temperature: 0.0,
        }
    }
}

/// Configuration for the fix pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum issues attempted per run
    pub max_fixes: usize,

    /// Extra lines shown around each evidence range in prompts
    pub snippet_context: usize,

    pub generator: GeneratorSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_fixes: 2,
            snippet_context: 0,
            generator: GeneratorSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.generator.max_tokens == 0 {
            return Err("generator.max_tokens must be > 0".to_string());
        }

        if !self.generator.temperature.is_finite() || self.generator.temperature < 0.0 {
            return Err(format!(
                "generator.temperature must be a non-negative number, got {}",
                self.generator.temperature
            ));
        }

        Ok(())
    }
}
