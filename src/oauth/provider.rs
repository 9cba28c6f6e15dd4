//! Authorization URL construction.
//!
//! Pure: builds the provider redirect target without any I/O.

use reqwest::Url;

use super::pkce::PkceChallenge;
use super::OAuthConfig;
use crate::error::{IntegrationError, Result};

/// Build the authorization URL for `config`.
///
/// Query parameters, in order: `client_id`, `response_type=code`,
/// `redirect_uri` (explicit or the configured default, omitted if neither),
/// `state`, `scope` (joined with the provider delimiter, omitted when empty),
/// the PKCE pair when given, then the provider's extra parameters.
pub(crate) fn authorization_url(
    config: &OAuthConfig,
    state: &str,
    scopes: Option<&[String]>,
    redirect_uri: Option<&str>,
    pkce: Option<&PkceChallenge>,
) -> Result<Url> {
    let mut url = Url::parse(&config.auth_url).map_err(|e| IntegrationError::InvalidUrl {
        url: config.auth_url.clone(),
        reason: e.to_string(),
    })?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("client_id", &config.client_id);
        query.append_pair("response_type", "code");
        if let Some(redirect_uri) = redirect_uri.or(config.redirect_uri.as_deref()) {
            query.append_pair("redirect_uri", redirect_uri);
        }
        query.append_pair("state", state);

        let scopes = scopes.unwrap_or(&config.scopes);
        if !scopes.is_empty() {
            query.append_pair("scope", &config.scope_delimiter.join(scopes));
        }

        if let Some(pkce) = pkce {
            query.append_pair("code_challenge", &pkce.challenge);
            query.append_pair("code_challenge_method", pkce.method());
        }

        for (key, value) in &config.extra_auth_params {
            query.append_pair(key, value);
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::ScopeDelimiter;
    use std::collections::HashMap;

    fn make_config() -> OAuthConfig {
        OAuthConfig {
            auth_url: "https://example.com/oauth/authorize".to_string(),
            token_url: "https://example.com/oauth/token".to_string(),
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            scopes: vec!["read".to_string(), "write".to_string()],
            ..OAuthConfig::default()
        }
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_build_auth_url() {
        let config = make_config();
        let url = authorization_url(
            &config,
            "random_state",
            None,
            Some("http://localhost:3000/callback"),
            None,
        )
        .unwrap();

        let query = query_map(&url);
        assert_eq!(query["client_id"], "test_client_id");
        assert_eq!(query["redirect_uri"], "http://localhost:3000/callback");
        assert_eq!(query["scope"], "read write");
        assert_eq!(query["state"], "random_state");
        assert_eq!(query["response_type"], "code");
        assert!(url.as_str().starts_with("https://example.com/oauth/authorize?"));
    }

    #[test]
    fn test_scope_and_state_round_trip() {
        let mut config = make_config();
        config.scope_delimiter = ScopeDelimiter::Comma;
        let scopes = vec![
            "repo".to_string(),
            "read:user".to_string(),
            "https://www.googleapis.com/auth/calendar.readonly".to_string(),
        ];
        let state = "st&te=with/special chars";

        let url = authorization_url(&config, state, Some(&scopes), None, None).unwrap();
        let query = query_map(&url);

        assert_eq!(query["state"], state);
        let parsed: Vec<String> = query["scope"].split(',').map(str::to_string).collect();
        assert_eq!(parsed, scopes);
        assert!(!query.contains_key("redirect_uri"));
    }

    #[test]
    fn test_extra_params_default_redirect_and_pkce() {
        let mut config = make_config();
        config.redirect_uri = Some("https://hub.example.com/callback".to_string());
        config
            .extra_auth_params
            .insert("access_type".to_string(), "offline".to_string());
        config
            .extra_auth_params
            .insert("prompt".to_string(), "consent".to_string());
        let pkce = PkceChallenge::from_verifier("verifier");

        let url = authorization_url(&config, "s", None, None, Some(&pkce)).unwrap();
        let query = query_map(&url);

        assert_eq!(query["redirect_uri"], "https://hub.example.com/callback");
        assert_eq!(query["access_type"], "offline");
        assert_eq!(query["prompt"], "consent");
        assert_eq!(query["code_challenge"], pkce.challenge);
        assert_eq!(query["code_challenge_method"], "S256");
    }

    #[test]
    fn test_empty_scope_set_omits_scope() {
        let config = make_config();
        let url = authorization_url(&config, "s", Some(&[]), None, None).unwrap();
        assert!(!query_map(&url).contains_key("scope"));
    }

    #[test]
    fn test_malformed_base_url() {
        let mut config = make_config();
        config.auth_url = "not a url".to_string();
        let err = authorization_url(&config, "s", None, None, None).unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidUrl { .. }));
    }
}
