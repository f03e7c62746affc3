use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};

use crate::entities::user;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("an account with that email already exists")]
    EmailTaken,
    #[error("no account with that email")]
    UnknownEmail,
    #[error("wrong password")]
    WrongPassword,
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl AccountError {
    /// Message shown to the visitor for the expected failure cases.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            AccountError::EmailTaken => {
                Some("You've already signed up with that email, log in instead!")
            },
            AccountError::UnknownEmail => Some("That email does not exist, please try again."),
            AccountError::WrongPassword => Some("Password incorrect, please try again."),
            AccountError::Hash(_) | AccountError::Db(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct Accounts {
    db: DatabaseConnection,
}

impl Accounts {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, AccountError> {
        Ok(user::Entity::find().filter(user::Column::Email.eq(email)).one(&self.db).await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<user::Model>, AccountError> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<user::Model, AccountError> {
        if self.find_by_email(email).await?.is_some() {
            tracing::warn!(email = %email, "registration with existing email");
            return Err(AccountError::EmailTaken);
        }

        let model = user::ActiveModel {
            id: Default::default(),
            email: Set(email.to_string()),
            password: Set(hash_password(password)?),
            name: Set(name.to_string()),
        };

        match model.insert(&self.db).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, email = %user.email, "user registered");
                Ok(user)
            },
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AccountError::EmailTaken)
            },
            Err(err) => Err(err.into()),
        }
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, AccountError> {
        let Some(user) = self.find_by_email(email).await? else {
            tracing::warn!(email = %email, "login for unknown email");
            return Err(AccountError::UnknownEmail);
        };

        if !verify_password(&user.password, password)? {
            tracing::warn!(user_id = user.id, "login with wrong password");
            return Err(AccountError::WrongPassword);
        }

        tracing::info!(user_id = user.id, "user logged in");
        Ok(user)
    }
}

fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AccountError::Hash)?
        .to_string();
    Ok(hash)
}

fn verify_password(stored: &str, candidate: &str) -> Result<bool, AccountError> {
    let parsed = PasswordHash::new(stored).map_err(AccountError::Hash)?;
    Ok(Argon2::default().verify_password(candidate.as_bytes(), &parsed).is_ok())
}
