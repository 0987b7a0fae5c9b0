use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password_hash: String,
    pub email: String,
}

/// Account edit. `None` keeps the stored value; there is no username field.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
    pub email: Option<String>,
}

/// A list column stored as comma-delimited text, e.g. `"red, gold, teal"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList(pub Vec<String>);

impl ItemList {
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }
}

impl From<String> for ItemList {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl fmt::Display for ItemList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// An uploaded image as stored: base64 text plus the MIME subtype (`png`, `jpeg`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub data: String,
    pub mime_subtype: String,
}

/// Measurement, timing and outcome fields of one casting session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Details {
    pub resin_brand: String,
    pub resin_type: String,
    pub amount: f64,
    pub unit: String,
    #[sqlx(try_from = "String")]
    pub colors: ItemList,
    #[sqlx(try_from = "String")]
    pub color_amts: ItemList,
    #[sqlx(try_from = "String")]
    pub color_types: ItemList,
    #[sqlx(try_from = "String")]
    pub glitters: ItemList,
    #[sqlx(try_from = "String")]
    pub glitter_types: ItemList,
    #[sqlx(try_from = "String")]
    pub glitter_amts: ItemList,
    pub time_to_pour_hrs: i64,
    pub time_to_pour_mins: i64,
    pub pouring_time_hrs: i64,
    pub pouring_time_mins: i64,
    pub time_to_demold_hrs: i64,
    pub time_to_demold_mins: i64,
    /// 1 (worst) to 5 (best); 0 when not rated.
    pub result_scale: i64,
    pub start_temp: f64,
    pub start_temp_unit: String,
    pub end_temp: f64,
    pub end_temp_unit: String,
    pub demold_temp: f64,
    pub demold_temp_unit: String,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub notes: String,
    pub mold_img: Option<Image>,
    pub result_img: Option<Image>,
    pub details: Details,
}

/// Mutable subset of a project. Images left as `None` keep what is stored.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub notes: String,
    pub mold_img: Option<Image>,
    pub result_img: Option<Image>,
    pub details: Details,
}

/// A project joined with its details.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub notes: String,
    #[serde(skip_serializing)]
    pub mold_img: Option<String>,
    pub mold_img_type: Option<String>,
    #[serde(skip_serializing)]
    pub result_img: Option<String>,
    pub result_img_type: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: Details,
}

impl ProjectRecord {
    pub fn mold_image(&self) -> Option<Image> {
        stored_image(&self.mold_img, &self.mold_img_type)
    }

    pub fn result_image(&self) -> Option<Image> {
        stored_image(&self.result_img, &self.result_img_type)
    }
}

fn stored_image(data: &Option<String>, subtype: &Option<String>) -> Option<Image> {
    match (data, subtype) {
        (Some(data), Some(subtype)) => Some(Image {
            data: data.clone(),
            mime_subtype: subtype.clone(),
        }),
        _ => None,
    }
}

/// Row of the recent-projects overview.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    pub resin_brand: String,
    pub resin_type: String,
    pub amount: f64,
    pub unit: String,
    #[sqlx(try_from = "String")]
    pub colors: ItemList,
    #[sqlx(try_from = "String")]
    pub glitters: ItemList,
    pub result_scale: i64,
}
