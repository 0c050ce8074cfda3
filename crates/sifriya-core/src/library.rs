use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Interface language for titles and labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    He,
}

impl Language {
    pub fn toggle(self) -> Self {
        match self {
            Language::En => Language::He,
            Language::He => Language::En,
        }
    }
}

/// One entry of the library index, either a category or a readable work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub he_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub he_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<LibraryNode>>,
    #[serde(
        default,
        deserialize_with = "lenient_order",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub he_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en_short_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub he_short_desc: Option<String>,
    #[serde(
        default,
        rename = "primary_category",
        skip_serializing_if = "Option::is_none"
    )]
    pub primary_category: Option<String>,
}

/// `order` is numeric in practice; anything else sorts as if absent
fn lenient_order<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

impl LibraryNode {
    /// Children in source order; empty for works
    pub fn children(&self) -> &[LibraryNode] {
        self.contents.as_deref().unwrap_or_default()
    }

    /// A node is a readable work iff it has no children
    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// Path segment: category, then title, then name
    pub fn label(&self) -> &str {
        self.category
            .as_deref()
            .or(self.title.as_deref())
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn display_title(&self, language: Language) -> &str {
        let english = self
            .title
            .as_deref()
            .or(self.category.as_deref())
            .or(self.name.as_deref());
        match language {
            Language::En => english.unwrap_or_default(),
            Language::He => self
                .he_title
                .as_deref()
                .or(self.he_category.as_deref())
                .or(english)
                .unwrap_or_default(),
        }
    }

    pub fn sort_key(&self) -> f64 {
        self.order.unwrap_or(0.0)
    }

    pub fn description(&self, language: Language) -> Option<&str> {
        match language {
            Language::En => self.en_short_desc.as_deref().or(self.en_desc.as_deref()),
            Language::He => self.he_short_desc.as_deref().or(self.he_desc.as_deref()),
        }
    }
}
