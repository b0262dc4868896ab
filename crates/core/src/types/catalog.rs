//! Equipment catalog records.

use serde::{Deserialize, Deserializer, Serialize};

use super::id::EquipmentId;

/// A crane as stored in the `guindastes` table.
///
/// Field names follow the backing store's column names. Capacity is not a
/// column: it is parsed out of [`name`](Self::name) by the catalog optimizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: EquipmentId,
    /// Descriptive name, e.g. `"Guindaste GSI 6.5 3h1m"`.
    #[serde(rename = "subgrupo")]
    pub name: String,
    #[serde(rename = "modelo", default)]
    pub model: Option<String>,
    #[serde(rename = "grupo", default)]
    pub group: Option<String>,
    #[serde(rename = "codigo_referencia", default)]
    pub reference_code: Option<String>,
    #[serde(rename = "imagem_url", default)]
    pub image_url: Option<String>,
    #[serde(rename = "imagens_adicionais", default, deserialize_with = "null_as_empty")]
    pub extra_images: Vec<String>,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "nao_incluido", default)]
    pub not_included: Option<String>,
}

impl CatalogItem {
    /// A catalog record with only the required fields set.
    #[must_use]
    pub fn new(id: EquipmentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            model: None,
            group: None,
            reference_code: None,
            image_url: None,
            extra_images: Vec::new(),
            description: None,
            not_included: None,
        }
    }
}

/// The store returns `null` for an unset array column.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_store_row() {
        let row = r#"{
            "id": 12,
            "subgrupo": "Guindaste GSI 6.5 3h1m",
            "modelo": "GSI",
            "imagem_url": "https://cdn.example/gsi.png",
            "descricao": "Alcance 11,5 m"
        }"#;
        let item: CatalogItem = serde_json::from_str(row).unwrap();
        assert_eq!(item.id, EquipmentId::new(12));
        assert_eq!(item.name, "Guindaste GSI 6.5 3h1m");
        assert_eq!(item.model.as_deref(), Some("GSI"));
        assert!(item.extra_images.is_empty());
        assert!(item.reference_code.is_none());
    }

    #[test]
    fn test_null_extra_images() {
        let row = r#"{"id": 1, "subgrupo": "GSE 8.0", "imagens_adicionais": null}"#;
        let item: CatalogItem = serde_json::from_str(row).unwrap();
        assert!(item.extra_images.is_empty());
    }
}
