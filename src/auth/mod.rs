pub mod ownership;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::store::{keys, Attribute, Item, Store, StoreError, GSI1, GSI1_PK, PK, SK};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub token_use: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
}

/// Token pair issued on login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username already exists")]
    DuplicateUser,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        IdentityError::Unavailable(err.to_string())
    }
}

/// External collaborator issuing and validating bearer credentials.
/// `authenticate` returns the stable subject id for a valid token.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn register(&self, new_user: NewUser) -> Result<RegisteredUser, IdentityError>;

    async fn login(&self, username: &str, password: &str) -> Result<Session, IdentityError>;

    async fn authenticate(&self, token: &str) -> Result<String, IdentityError>;
}

/// Store-backed identity provider issuing HS256 JWTs. Credentials live as
/// `CREDENTIALS` items under the user partition, with a `USERNAME#` index key
/// for login lookup.
pub struct JwtIdentityProvider {
    store: Arc<dyn Store>,
    secret: String,
    issuer: String,
    audience: String,
    token_expiry_hours: i64,
}

impl JwtIdentityProvider {
    pub fn new(store: Arc<dyn Store>, config: &AuthConfig) -> Self {
        Self {
            store,
            secret: config.jwt_secret.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_expiry_hours: config.token_expiry_hours,
        }
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<Item>, IdentityError> {
        let items = self
            .store
            .query_index(GSI1, &keys::username(username))
            .await?;
        Ok(items.into_iter().next())
    }

    fn issue_token(&self, user_id: &str, token_use: &str, hours: i64) -> Result<String, IdentityError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            token_use: token_use.to_string(),
            exp: (now + Duration::hours(hours)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| IdentityError::Unavailable(format!("token generation failed: {err}")))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn register(&self, new_user: NewUser) -> Result<RegisteredUser, IdentityError> {
        if self.find_credentials(&new_user.username).await?.is_some() {
            return Err(IdentityError::DuplicateUser);
        }

        let user_id = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().simple().to_string();
        let digest = hash_password(&salt, &new_user.password);
        let now = Utc::now().to_rfc3339();

        let mut item = Item::new();
        item.insert(PK.into(), keys::user(&user_id).into());
        item.insert(SK.into(), keys::CREDENTIALS.into());
        item.insert(GSI1_PK.into(), keys::username(&new_user.username).into());
        item.insert("user_id".into(), user_id.clone().into());
        item.insert("username".into(), new_user.username.clone().into());
        item.insert("email".into(), new_user.email.clone().into());
        item.insert("password_salt".into(), salt.into());
        item.insert("password_hash".into(), digest.into());
        item.insert("created_at".into(), now.into());
        self.store.put(item).await?;

        Ok(RegisteredUser {
            user_id,
            username: new_user.username,
            email: new_user.email,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<Session, IdentityError> {
        let credentials = self
            .find_credentials(username)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        let field = |name: &str| {
            credentials
                .get(name)
                .and_then(Attribute::as_str)
                .map(str::to_string)
                .ok_or(IdentityError::InvalidCredentials)
        };
        let salt = field("password_salt")?;
        let stored_hash = field("password_hash")?;
        let user_id = field("user_id")?;
        let email = field("email").unwrap_or_default();

        if hash_password(&salt, password) != stored_hash {
            return Err(IdentityError::InvalidCredentials);
        }

        let access_token = self.issue_token(&user_id, "access", self.token_expiry_hours)?;
        let refresh_token = self.issue_token(&user_id, "refresh", self.token_expiry_hours * 24)?;
        Ok(Session {
            user_id,
            username: username.to_string(),
            email,
            access_token,
            refresh_token,
            expires_in: self.token_expiry_hours * 3600,
        })
    }

    async fn authenticate(&self, token: &str) -> Result<String, IdentityError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| IdentityError::InvalidToken)?;

        // Refresh tokens never authenticate a request on their own.
        if data.claims.token_use != "access" {
            return Err(IdentityError::InvalidToken);
        }
        Ok(data.claims.sub)
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
