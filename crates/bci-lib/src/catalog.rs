use serde::{Deserialize, Serialize};

pub const ORIGINAL: &str = "original";
pub const QUANTIZED: &str = "quantized";

/// A deployable form of the classifier, e.g. full precision or int8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVariant {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl ModelVariant {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVariantCatalog {
    variants: Vec<ModelVariant>,
}

impl Default for ModelVariantCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelVariantCatalog {
    pub fn new(variants: Vec<ModelVariant>) -> Self {
        Self { variants }
    }

    /// Variants served by the reference backend; used until `/api/init` answers.
    pub fn builtin() -> Self {
        Self::new(vec![
            ModelVariant::new(ORIGINAL, "Original (Keras)"),
            ModelVariant::new(QUANTIZED, "Quantized (TFLite)"),
            ModelVariant::new("dynamic", "Dynamic Range (TFLite)"),
            ModelVariant::new("fp16", "Float16 (TFLite)"),
            ModelVariant::new("int8", "Integer8 (TFLite)"),
        ])
    }

    pub fn variants(&self) -> &[ModelVariant] {
        &self.variants
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelVariant> {
        self.variants.iter()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ModelVariant> {
        self.variants.iter().find(|variant| variant.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id)
            .map(|variant| variant.display_name.as_str())
            .unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_order() {
        let catalog = ModelVariantCatalog::builtin();
        let ids: Vec<&str> = catalog.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["original", "quantized", "dynamic", "fp16", "int8"]);
        assert_eq!(catalog.display_name("fp16"), "Float16 (TFLite)");
        assert_eq!(catalog.display_name("custom"), "custom");
    }

    #[test]
    fn variant_uses_wire_name_field() {
        let variant: ModelVariant =
            serde_json::from_str(r#"{"id": "int8", "name": "Integer8 (TFLite)"}"#).unwrap();
        assert_eq!(variant, ModelVariant::new("int8", "Integer8 (TFLite)"));
    }
}
