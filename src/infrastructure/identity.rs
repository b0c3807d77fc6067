use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Server-side half of the auth collaborator: maps a bearer token to a user id.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Option<String>, InfraError>;
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() || token.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(token)
}

#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: RwLock<HashMap<String, String>>,
}

impl StaticTokenVerifier {
    pub fn register(&self, token: &str, user_id: &str) -> Result<(), InfraError> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|error| InfraError::LockPoisoned(format!("token registry: {error}")))?;
        tokens.insert(token.trim().to_string(), user_id.trim().to_string());
        Ok(())
    }

    pub fn revoke(&self, token: &str) -> Result<(), InfraError> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|error| InfraError::LockPoisoned(format!("token registry: {error}")))?;
        tokens.remove(token.trim());
        Ok(())
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<Option<String>, InfraError> {
        let tokens = self
            .tokens
            .read()
            .map_err(|error| InfraError::LockPoisoned(format!("token registry: {error}")))?;
        Ok(tokens.get(token.trim()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("bearer   abc ")), Some("abc"));
        assert_eq!(bearer_token(Some("Bearer null")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn static_verifier_resolves_registered_tokens() {
        let verifier = StaticTokenVerifier::default();
        verifier.register("tok-1", "user_1").expect("register");
        assert_eq!(verifier.verify("tok-1").expect("verify"), Some("user_1".to_string()));
        assert_eq!(verifier.verify("tok-2").expect("verify"), None);

        verifier.revoke("tok-1").expect("revoke");
        assert_eq!(verifier.verify("tok-1").expect("verify"), None);
    }
}
