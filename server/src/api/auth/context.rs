//! Authenticated principal attached to requests

use uuid::Uuid;

use super::jwt::TokenClaims;

/// The authenticated caller, derived from validated token claims.
///
/// Stored in request extensions by the auth middleware; handlers receive it
/// through the binding layer, where it overrides every raw input channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl Principal {
    /// Build from claims; fails when `sub` is not a UUID
    pub fn from_claims(claims: &TokenClaims) -> Option<Self> {
        let user_id = Uuid::parse_str(&claims.sub).ok()?;
        Some(Self {
            user_id,
            email: claims.email.clone(),
            first_name: claims.given_name.clone().unwrap_or_default(),
            last_name: claims.family_name.clone().unwrap_or_default(),
        })
    }

    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email
                .clone()
                .unwrap_or_else(|| self.user_id.to_string())
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> TokenClaims {
        TokenClaims {
            sub: sub.to_string(),
            email: Some("jane@chat.dev".to_string()),
            given_name: Some("Jane".to_string()),
            family_name: Some("Doe".to_string()),
            iat: 0,
            exp: i64::MAX,
        }
    }

    #[test]
    fn builds_from_uuid_subject() {
        let id = Uuid::new_v4();
        let principal = Principal::from_claims(&claims(&id.to_string())).unwrap();
        assert_eq!(principal.user_id, id);
        assert_eq!(principal.display_name(), "Jane Doe");
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        assert!(Principal::from_claims(&claims("service-account")).is_none());
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut c = claims(&Uuid::new_v4().to_string());
        c.given_name = None;
        c.family_name = None;
        let principal = Principal::from_claims(&c).unwrap();
        assert_eq!(principal.display_name(), "jane@chat.dev");
    }
}
