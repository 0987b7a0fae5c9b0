//! Boundary validation: untyped submitted fields in, typed records out.
//!
//! Handlers hand the raw JSON bodies or multipart field maps to this module
//! and get back the records the stores accept. Nothing past this point looks
//! a field up by name.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::{
    db::models::{Details, Image, ItemList, NewProject, ProjectUpdate},
    error::{AppError, Result},
    services::images,
};

fn required(value: Option<String>, message: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::Validation(message.to_string())),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub first: Option<String>,
    pub last: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub confirmation: Option<String>,
    pub email: Option<String>,
}

/// A registration that passed validation; the password is still plaintext.
#[derive(Debug)]
pub struct Registration {
    pub first: String,
    pub last: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration> {
        let first = required(self.first, "Need to enter a first name")?;
        let last = required(self.last, "Need to enter a last name")?;
        let username = required(self.username, "Need to enter a username")?;

        let (password, confirmation) = match (self.password, self.confirmation) {
            (Some(p), Some(c)) if !p.is_empty() && !c.is_empty() => (p, c),
            _ => {
                return Err(AppError::Validation(
                    "Need to enter your password twice".to_string(),
                ))
            }
        };
        let email = required(self.email, "Need to enter an email address")?;

        if password != confirmation {
            return Err(AppError::Validation("Your passwords do not match".to_string()));
        }

        Ok(Registration {
            first,
            last,
            username,
            password,
            email,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(self) -> Result<(String, String)> {
        let username = required(self.username, "Must provide username")?;
        let password = match self.password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(AppError::Validation("Must provide password".to_string())),
        };
        Ok((username, password))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountUpdateRequest {
    pub first: Option<String>,
    pub last: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub confirmation: Option<String>,
    pub email: Option<String>,
}

/// Validated account edit; `password` is plaintext until the service hashes it.
#[derive(Debug, Default)]
pub struct AccountChanges {
    pub first: Option<String>,
    pub last: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

impl AccountUpdateRequest {
    pub fn validate(self, current_username: &str) -> Result<AccountChanges> {
        if let Some(username) = non_empty(self.username) {
            if username != current_username {
                return Err(AppError::Validation("Username cannot be changed".to_string()));
            }
        }

        let password = match (self.password.filter(|p| !p.is_empty()), self.confirmation) {
            (None, _) => None,
            (Some(p), Some(c)) if p == c => Some(p),
            (Some(_), _) => {
                return Err(AppError::Validation("Your passwords do not match".to_string()))
            }
        };

        Ok(AccountChanges {
            first: non_empty(self.first),
            last: non_empty(self.last),
            password,
            email: non_empty(self.email),
        })
    }
}

/// A file part from a multipart submission.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Text fields and uploads of a project form, keyed by field name.
#[derive(Debug, Default)]
pub struct ProjectFields {
    text: HashMap<String, String>,
    uploads: HashMap<String, Upload>,
}

impl ProjectFields {
    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.text.insert(name.into(), value.into());
    }

    /// Empty parts are how browsers submit an untouched file input; they are
    /// not uploads.
    pub fn insert_upload(&mut self, name: impl Into<String>, upload: Upload) {
        if !upload.bytes.is_empty() {
            self.uploads.insert(name.into(), upload);
        }
    }

    fn text(&self, key: &str) -> String {
        self.text
            .get(key)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    fn number<T: FromStr + Default>(&self, key: &str) -> Result<T> {
        let raw = self.text(key);
        if raw.is_empty() {
            return Ok(T::default());
        }
        raw.parse()
            .map_err(|_| AppError::Validation(format!("`{key}` must be a number")))
    }

    /// `f64::from_str` accepts "NaN" and "inf"; neither can be stored or rendered.
    fn decimal(&self, key: &str) -> Result<f64> {
        let value: f64 = self.number(key)?;
        if !value.is_finite() {
            return Err(AppError::Validation(format!("`{key}` must be a number")));
        }
        Ok(value)
    }

    /// Hours and minutes.
    fn duration_part(&self, key: &str) -> Result<i64> {
        let value: i64 = self.number(key)?;
        if value < 0 {
            return Err(AppError::Validation(format!("`{key}` cannot be negative")));
        }
        Ok(value)
    }

    fn list(&self, key: &str) -> ItemList {
        ItemList::parse(&self.text(key))
    }

    fn image(&self, key: &str) -> Result<Option<Image>> {
        self.uploads
            .get(key)
            .map(|upload| images::encode_upload(&upload.bytes, &upload.content_type))
            .transpose()
    }

    fn details(&self) -> Result<Details> {
        let result_scale: i64 = self.number("result_scale")?;
        if !(0..=5).contains(&result_scale) {
            return Err(AppError::Validation(
                "`result_scale` must be between 0 (unrated) and 5".to_string(),
            ));
        }

        Ok(Details {
            resin_brand: self.text("resin_brand"),
            resin_type: self.text("resin_type"),
            amount: self.decimal("amount")?,
            unit: self.text("unit"),
            colors: self.list("colors"),
            color_amts: self.list("color_amts"),
            color_types: self.list("color_types"),
            glitters: self.list("glitters"),
            glitter_types: self.list("glitter_types"),
            glitter_amts: self.list("glitter_amts"),
            time_to_pour_hrs: self.duration_part("time_to_pour_hrs")?,
            time_to_pour_mins: self.duration_part("time_to_pour_mins")?,
            pouring_time_hrs: self.duration_part("pouring_time_hrs")?,
            pouring_time_mins: self.duration_part("pouring_time_mins")?,
            time_to_demold_hrs: self.duration_part("time_to_demold_hrs")?,
            time_to_demold_mins: self.duration_part("time_to_demold_mins")?,
            result_scale,
            start_temp: self.decimal("start_temp")?,
            start_temp_unit: self.text("start_temp_unit"),
            end_temp: self.decimal("end_temp")?,
            end_temp_unit: self.text("end_temp_unit"),
            demold_temp: self.decimal("demold_temp")?,
            demold_temp_unit: self.text("demold_temp_unit"),
        })
    }

    pub fn new_project(&self) -> Result<NewProject> {
        let name = self.text("name");
        if name.is_empty() {
            return Err(AppError::Validation("Project name is required".to_string()));
        }

        Ok(NewProject {
            name,
            notes: self.text("notes"),
            mold_img: self.image("mold_img")?,
            result_img: self.image("result_img")?,
            details: self.details()?,
        })
    }

    /// Any `name` field is ignored: a project keeps its name for life.
    pub fn project_update(&self) -> Result<ProjectUpdate> {
        Ok(ProjectUpdate {
            notes: self.text("notes"),
            mold_img: self.image("mold_img")?,
            result_img: self.image("result_img")?,
            details: self.details()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn registration() -> RegisterRequest {
        RegisterRequest {
            first: Some("Jo".to_string()),
            last: Some("Lee".to_string()),
            username: Some("jo1".to_string()),
            password: Some("secret123".to_string()),
            confirmation: Some("secret123".to_string()),
            email: Some("jo@example.com".to_string()),
        }
    }

    #[test]
    fn complete_registration_validates() {
        let reg = registration().validate().unwrap();
        assert_eq!(reg.username, "jo1");
        assert_eq!(reg.password, "secret123");
    }

    #[test]
    fn registration_requires_every_field() {
        let missing_last = RegisterRequest {
            last: Some("  ".to_string()),
            ..registration()
        };
        assert_matches!(
            missing_last.validate(),
            Err(AppError::Validation(msg)) if msg.contains("last name")
        );

        let single_password = RegisterRequest {
            confirmation: None,
            ..registration()
        };
        assert_matches!(
            single_password.validate(),
            Err(AppError::Validation(msg)) if msg.contains("twice")
        );
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let req = RegisterRequest {
            confirmation: Some("secret124".to_string()),
            ..registration()
        };
        assert_matches!(
            req.validate(),
            Err(AppError::Validation(msg)) if msg.contains("do not match")
        );
    }

    #[test]
    fn account_update_rejects_username_change() {
        let req = AccountUpdateRequest {
            username: Some("someone-else".to_string()),
            ..Default::default()
        };
        assert!(req.validate("jo1").is_err());

        let same = AccountUpdateRequest {
            username: Some("jo1".to_string()),
            first: Some("Joanna".to_string()),
            ..Default::default()
        };
        let changes = same.validate("jo1").unwrap();
        assert_eq!(changes.first.as_deref(), Some("Joanna"));
        assert!(changes.password.is_none());
    }

    #[test]
    fn account_password_change_needs_matching_confirmation() {
        let req = AccountUpdateRequest {
            password: Some("newsecret1".to_string()),
            confirmation: Some("newsecret2".to_string()),
            ..Default::default()
        };
        assert!(req.validate("jo1").is_err());
    }

    #[test]
    fn project_fields_default_to_zero_and_empty() {
        let mut fields = ProjectFields::default();
        fields.insert_text("name", "Galaxy Coaster");
        fields.insert_text("amount", "100");
        fields.insert_text("unit", "grams");
        fields.insert_text("time_to_pour_mins", "");

        let project = fields.new_project().unwrap();
        assert_eq!(project.name, "Galaxy Coaster");
        assert_eq!(project.details.amount, 100.0);
        assert_eq!(project.details.unit, "grams");
        assert_eq!(project.details.time_to_pour_mins, 0);
        assert_eq!(project.details.result_scale, 0);
        assert!(project.details.colors.items().is_empty());
        assert!(project.mold_img.is_none());
    }

    #[test]
    fn project_lists_split_on_commas() {
        let mut fields = ProjectFields::default();
        fields.insert_text("name", "Tray");
        fields.insert_text("colors", "red, gold,teal");

        let project = fields.new_project().unwrap();
        assert_eq!(project.details.colors.items(), ["red", "gold", "teal"]);
    }

    #[test]
    fn bad_numbers_name_the_field() {
        let mut fields = ProjectFields::default();
        fields.insert_text("name", "Tray");
        fields.insert_text("start_temp", "warm");

        assert_matches!(
            fields.new_project(),
            Err(AppError::Validation(msg)) if msg.contains("start_temp")
        );
    }

    #[test]
    fn non_finite_decimals_are_rejected() {
        for (key, raw) in [("amount", "NaN"), ("start_temp", "inf"), ("demold_temp", "-infinity")] {
            let mut fields = ProjectFields::default();
            fields.insert_text("name", "Tray");
            fields.insert_text(key, raw);

            assert_matches!(
                fields.new_project(),
                Err(AppError::Validation(msg)) if msg.contains(key),
                "{key}={raw} should be rejected"
            );
        }
    }

    #[test]
    fn negative_durations_are_rejected() {
        let mut fields = ProjectFields::default();
        fields.insert_text("name", "Tray");
        fields.insert_text("pouring_time_mins", "-5");

        assert_matches!(
            fields.project_update(),
            Err(AppError::Validation(msg)) if msg.contains("pouring_time_mins")
        );
    }

    #[test]
    fn negative_temperatures_are_allowed() {
        let mut fields = ProjectFields::default();
        fields.insert_text("name", "Tray");
        fields.insert_text("start_temp", "-4.5");

        assert_eq!(fields.new_project().unwrap().details.start_temp, -4.5);
    }

    #[test]
    fn result_scale_is_bounded() {
        let mut fields = ProjectFields::default();
        fields.insert_text("name", "Tray");
        fields.insert_text("result_scale", "6");
        assert_matches!(
            fields.new_project(),
            Err(AppError::Validation(msg)) if msg.contains("0 (unrated)")
        );

        fields.insert_text("result_scale", "0");
        assert_eq!(fields.new_project().unwrap().details.result_scale, 0);
    }

    #[test]
    fn project_name_is_required() {
        assert_matches!(
            ProjectFields::default().new_project(),
            Err(AppError::Validation(_))
        );
    }

    #[test]
    fn empty_upload_is_not_an_image() {
        let mut fields = ProjectFields::default();
        fields.insert_upload(
            "mold_img",
            Upload {
                bytes: Vec::new(),
                content_type: "application/octet-stream".to_string(),
            },
        );
        fields.insert_upload(
            "result_img",
            Upload {
                bytes: b"jpegdata".to_vec(),
                content_type: "image/jpeg".to_string(),
            },
        );

        let update = fields.project_update().unwrap();
        assert!(update.mold_img.is_none());
        assert_eq!(update.result_img.unwrap().mime_subtype, "jpeg");
    }
}
