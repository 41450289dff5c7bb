//! Bearer-token-to-principal resolution: check shared-secret keys
//! first, then JWT HS256. Used both for `agent_auth` socket frames
//! and (if the HTTP surface ever grows beyond `/health`) any bearer-gated
//! route.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use switchboard_models::{AccountStatus, User};

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    permissions: Vec<String>,
    #[allow(dead_code)]
    #[serde(default)]
    exp: Option<usize>,
}

/// The synthetic principal the dev shared-secret bypass resolves to.
fn synthetic_admin(token: &str) -> User {
    User {
        user_id: format!("dev-admin:{token}"),
        email: "dev-admin@switchboard.local".to_string(),
        name: "Development Admin".to_string(),
        roles: vec!["admin".to_string(), "agent".to_string()],
        account_status: AccountStatus::Active,
        permissions: vec!["*".to_string()],
        created_at: 0,
        updated_at: 0,
    }
}

/// Resolves a bearer token to a principal, checking the configured
/// shared-secret list before the JWT secret (mirrors
/// `auth_middleware`'s precedence exactly).
pub fn resolve_principal(config: &Config, token: &str) -> Option<User> {
    if config.admin_shared_secrets.iter().any(|secret| secret == token) {
        return Some(synthetic_admin(token));
    }

    let secret = config.jwt_secret.as_ref()?;
    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(secret.as_bytes());
    let claims = decode::<Claims>(token, &key, &validation).ok()?.claims;

    Some(User {
        user_id: claims.sub.clone(),
        email: claims.email.unwrap_or(claims.sub),
        name: String::new(),
        roles: claims.roles,
        account_status: AccountStatus::Active,
        permissions: claims.permissions,
        created_at: 0,
        updated_at: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        roles: Vec<String>,
        permissions: Vec<String>,
        exp: usize,
    }

    fn config_with(secrets: Vec<&str>, jwt_secret: Option<&str>) -> Config {
        let mut config = Config::defaults();
        config.admin_shared_secrets = secrets.into_iter().map(str::to_string).collect();
        config.jwt_secret = jwt_secret.map(str::to_string);
        config
    }

    #[test]
    fn shared_secret_resolves_to_synthetic_admin() {
        let config = config_with(vec!["dev-secret"], None);
        let user = resolve_principal(&config, "dev-secret").unwrap();
        assert!(user.can_authenticate_as_agent());
    }

    #[test]
    fn unknown_token_with_no_jwt_secret_fails() {
        let config = config_with(vec!["dev-secret"], None);
        assert!(resolve_principal(&config, "garbage").is_none());
    }

    #[test]
    fn valid_jwt_resolves_principal_with_roles() {
        let config = config_with(vec![], Some("jwt-secret"));
        let claims = TestClaims {
            sub: "u-1".to_string(),
            roles: vec!["agent".to_string()],
            permissions: vec![],
            exp: 9_999_999_999,
        };
        let token = encode(&Header::new(jsonwebtoken::Algorithm::HS256), &claims, &EncodingKey::from_secret(b"jwt-secret")).unwrap();

        let user = resolve_principal(&config, &token).unwrap();
        assert_eq!(user.user_id, "u-1");
        assert!(user.can_authenticate_as_agent());
    }

    #[test]
    fn jwt_signed_with_wrong_secret_is_rejected() {
        let config = config_with(vec![], Some("jwt-secret"));
        let claims = TestClaims { sub: "u-1".to_string(), roles: vec![], permissions: vec![], exp: 9_999_999_999 };
        let token = encode(&Header::new(jsonwebtoken::Algorithm::HS256), &claims, &EncodingKey::from_secret(b"wrong")).unwrap();

        assert!(resolve_principal(&config, &token).is_none());
    }
}
