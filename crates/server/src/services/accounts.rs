use crate::{
    db::{
        models::{NewUser, User, UserUpdate},
        Database,
    },
    error::{AppError, Result},
    forms::{AccountChanges, Registration},
};

use super::password::{hash_password, validate_password_strength, verify_password, DUMMY_HASH};

pub async fn register(db: &Database, registration: Registration) -> Result<User> {
    validate_password_strength(&registration.password)?;

    let users = db.users();
    if users.exists(&registration.username).await? {
        return Err(AppError::Conflict(
            "Username already exists. Log in or try another username.".to_string(),
        ));
    }

    let password_hash = hash_password(&registration.password)?;
    let user = users
        .create(&NewUser {
            first_name: registration.first,
            last_name: registration.last,
            username: registration.username,
            password_hash,
            email: registration.email,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Check a username/password pair. Both failure modes return the same
/// `AppError::Unauthorized`.
pub async fn login(db: &Database, username: &str, password: &str) -> Result<User> {
    let Some(user) = db.users().find_by_username(username).await? else {
        verify_password(password, DUMMY_HASH)?;
        tracing::warn!(username, "login for unknown username");
        return Err(AppError::Unauthorized);
    };

    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(username, "login with wrong password");
        return Err(AppError::Unauthorized);
    }

    tracing::info!(user_id = user.id, "user logged in");
    Ok(user)
}

pub async fn update_account(db: &Database, user_id: i64, changes: AccountChanges) -> Result<User> {
    let password_hash = match changes.password {
        Some(password) => {
            validate_password_strength(&password)?;
            Some(hash_password(&password)?)
        }
        None => None,
    };

    let user = db
        .users()
        .update(
            user_id,
            &UserUpdate {
                first_name: changes.first,
                last_name: changes.last,
                password_hash,
                email: changes.email,
            },
        )
        .await?;

    tracing::info!(user_id, "account updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn jo() -> Registration {
        Registration {
            first: "Jo".to_string(),
            last: "Lee".to_string(),
            username: "jo1".to_string(),
            password: "secret123".to_string(),
            email: "jo@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let db = Database::connect_in_memory().await.unwrap();
        let user = register(&db, jo()).await.unwrap();
        assert_ne!(user.password_hash, "secret123");

        let logged_in = login(&db, "jo1", "secret123").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert_matches!(login(&db, "jo1", "wrong").await, Err(AppError::Unauthorized));
        assert_matches!(login(&db, "nobody", "secret123").await, Err(AppError::Unauthorized));
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let db = Database::connect_in_memory().await.unwrap();
        register(&db, jo()).await.unwrap();

        let again = Registration {
            email: "other@example.com".to_string(),
            ..jo()
        };
        assert_matches!(register(&db, again).await, Err(AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_insert() {
        let db = Database::connect_in_memory().await.unwrap();
        let weak = Registration {
            password: "short".to_string(),
            ..jo()
        };

        assert_matches!(register(&db, weak).await, Err(AppError::Validation(_)));
        assert!(!db.users().exists("jo1").await.unwrap());
    }

    #[tokio::test]
    async fn password_change_takes_effect_on_login() {
        let db = Database::connect_in_memory().await.unwrap();
        let user = register(&db, jo()).await.unwrap();

        update_account(
            &db,
            user.id,
            AccountChanges {
                password: Some("newsecret99".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(login(&db, "jo1", "newsecret99").await.is_ok());
        assert_matches!(login(&db, "jo1", "secret123").await, Err(AppError::Unauthorized));
    }
}
