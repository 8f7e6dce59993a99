use serde::Serialize;

/// Architectural generation bucket. Drives regional routing on the
/// multi-region backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelFamily {
    #[serde(rename = "gpt-3.5")]
    Gpt35,
    #[serde(rename = "gpt-4")]
    Gpt4,
}

/// One entry of the client-facing model catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub family: ModelFamily,
    pub max_length: u32,
    pub token_limit: u32,
}

/// Static capability record for a known upstream model identifier.
#[derive(Debug, Clone, Copy)]
pub struct ModelCard {
    pub id: &'static str,
    pub name: &'static str,
    pub family: ModelFamily,
    pub max_length: u32,
    pub token_limit: u32,
}

impl ModelCard {
    /// Catalog entry keeping the listed identifier, which on the
    /// multi-region backend is the deployment id rather than `self.id`.
    pub fn descriptor_for(&self, listed_id: impl Into<String>) -> ModelDescriptor {
        ModelDescriptor {
            id: listed_id.into(),
            name: self.name.to_owned(),
            family: self.family,
            max_length: self.max_length,
            token_limit: self.token_limit,
        }
    }
}

pub const KNOWN_MODELS: &[ModelCard] = &[
    ModelCard {
        id: "gpt-3.5-turbo",
        name: "GPT-3.5",
        family: ModelFamily::Gpt35,
        max_length: 12_000,
        token_limit: 4_000,
    },
    // Same model under the multi-region backend's naming.
    ModelCard {
        id: "gpt-35-turbo",
        name: "GPT-3.5",
        family: ModelFamily::Gpt35,
        max_length: 12_000,
        token_limit: 4_000,
    },
    ModelCard {
        id: "gpt-4",
        name: "GPT-4",
        family: ModelFamily::Gpt4,
        max_length: 24_000,
        token_limit: 8_000,
    },
    ModelCard {
        id: "gpt-4-32k",
        name: "GPT-4-32K",
        family: ModelFamily::Gpt4,
        max_length: 96_000,
        token_limit: 32_000,
    },
];

pub fn find_model(id: &str) -> Option<&'static ModelCard> {
    KNOWN_MODELS.iter().find(|card| card.id == id)
}
