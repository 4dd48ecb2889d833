use serde::{Deserialize, Serialize};

/// Per-cell style.
///
/// Values are opaque strings handed to the presentation layer as-is
/// (e.g. `"bold"`, `"center"`, `"#FF0000"`, `"1px solid #000"`).
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CellStyle {
    // Font
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_transform: Option<String>,

    // Colors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    // Alignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<String>,

    // Borders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_left: Option<String>,
}

impl CellStyle {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A field-wise style update.
///
/// `Some(value)` sets the property, `Some("")` clears it, `None` leaves it alone.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StylePatch {
    pub font_weight: Option<String>,
    pub font_style: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub text_decoration: Option<String>,
    pub text_transform: Option<String>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub text_align: Option<String>,
    pub vertical_align: Option<String>,
    pub border_top: Option<String>,
    pub border_right: Option<String>,
    pub border_bottom: Option<String>,
    pub border_left: Option<String>,
}

fn patch_field(target: &mut Option<String>, patch: Option<&String>) {
    if let Some(value) = patch {
        *target = if value.is_empty() {
            None
        } else {
            Some(value.clone())
        };
    }
}

impl StylePatch {
    /// Apply every set field of the patch onto `style`.
    pub fn apply(&self, style: &mut CellStyle) {
        patch_field(&mut style.font_weight, self.font_weight.as_ref());
        patch_field(&mut style.font_style, self.font_style.as_ref());
        patch_field(&mut style.font_family, self.font_family.as_ref());
        patch_field(&mut style.font_size, self.font_size.as_ref());
        patch_field(&mut style.text_decoration, self.text_decoration.as_ref());
        patch_field(&mut style.text_transform, self.text_transform.as_ref());
        patch_field(&mut style.color, self.color.as_ref());
        patch_field(&mut style.background_color, self.background_color.as_ref());
        patch_field(&mut style.text_align, self.text_align.as_ref());
        patch_field(&mut style.vertical_align, self.vertical_align.as_ref());
        patch_field(&mut style.border_top, self.border_top.as_ref());
        patch_field(&mut style.border_right, self.border_right.as_ref());
        patch_field(&mut style.border_bottom, self.border_bottom.as_ref());
        patch_field(&mut style.border_left, self.border_left.as_ref());
    }

    /// Names of the properties this patch touches, for history details.
    pub fn touched_fields(&self) -> Vec<&'static str> {
        [
            ("fontWeight", self.font_weight.is_some()),
            ("fontStyle", self.font_style.is_some()),
            ("fontFamily", self.font_family.is_some()),
            ("fontSize", self.font_size.is_some()),
            ("textDecoration", self.text_decoration.is_some()),
            ("textTransform", self.text_transform.is_some()),
            ("color", self.color.is_some()),
            ("backgroundColor", self.background_color.is_some()),
            ("textAlign", self.text_align.is_some()),
            ("verticalAlign", self.vertical_align.is_some()),
            ("borderTop", self.border_top.is_some()),
            ("borderRight", self.border_right.is_some()),
            ("borderBottom", self.border_bottom.is_some()),
            ("borderLeft", self.border_left.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }
}

/// Sheet-wide presentation defaults, stored with the document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalStyles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub gridlines: bool,
}

impl Default for GlobalStyles {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: None,
            color: None,
            background_color: None,
            gridlines: true,
        }
    }
}
