use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL_ID: &str = "mobilenetv2_default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    Upload,
    MaskEdit,
    Confirmation,
    Results,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Upload,
        WizardStep::MaskEdit,
        WizardStep::Confirmation,
        WizardStep::Results,
    ];

    pub fn index(self) -> usize {
        match self {
            WizardStep::Upload => 0,
            WizardStep::MaskEdit => 1,
            WizardStep::Confirmation => 2,
            WizardStep::Results => 3,
        }
    }

    pub fn next(self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Upload => "File upload",
            WizardStep::MaskEdit => "Mask editing",
            WizardStep::Confirmation => "Confirmation",
            WizardStep::Results => "Results",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Normal,
    Pathological,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Normal => "normal",
            Classification::Pathological => "pathological",
        }
    }

    pub fn is_normal(self) -> bool {
        self == Classification::Normal
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub accuracy: String,
}

impl ModelDescriptor {
    fn new(id: &str, name: &str, accuracy: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            accuracy: accuracy.to_string(),
        }
    }
}

/// Models offered by the backend, also the client's fallback when the list
/// cannot be fetched.
pub fn default_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new(DEFAULT_MODEL_ID, "MobileNetV2 (Default)", "92.3%"),
        ModelDescriptor::new("mobilenetv2_enhanced", "MobileNetV2 Enhanced", "94.1%"),
        ModelDescriptor::new("resnet50_custom", "ResNet50 Custom", "91.8%"),
    ]
}
