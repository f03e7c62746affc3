use std::str::FromStr;

use sea_orm::{Iterable, entity::prelude::*};

/// Seasonal tag for a film. Stored as its display name.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Category {
    #[sea_orm(string_value = "Spring")]
    Spring,
    #[sea_orm(string_value = "Summer")]
    Summer,
    #[sea_orm(string_value = "Autumn")]
    Autumn,
    #[sea_orm(string_value = "Halloween")]
    Halloween,
    #[sea_orm(string_value = "Winter")]
    Winter,
    #[sea_orm(string_value = "Christmas")]
    Christmas,
    #[sea_orm(string_value = "Christmas rom-com")]
    ChristmasRomCom,
}

impl Category {
    pub const DEFAULT: Category = Category::Spring;

    pub fn all() -> impl Iterator<Item = Category> {
        Category::iter()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Spring => "Spring",
            Category::Summer => "Summer",
            Category::Autumn => "Autumn",
            Category::Halloween => "Halloween",
            Category::Winter => "Winter",
            Category::Christmas => "Christmas",
            Category::ChristmasRomCom => "Christmas rom-com",
        }
    }

    /// Path of the themed background used on the result page.
    pub fn background_image(self) -> String {
        match self {
            Category::ChristmasRomCom => "/static/images/christmas-rom-com-background.png".to_string(),
            other => format!("/static/images/{}-background.png", other.as_str()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::all().find(|c| c.as_str() == s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
