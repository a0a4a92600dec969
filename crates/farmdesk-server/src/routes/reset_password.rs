//! `GET /reset-password/token` — landing route for emailed reset links.
//!
//! Decides between bouncing back to the reset form with an error and
//! handing the token to the client, which then posts it with the new
//! password to `/api/auth/reset-password`.

use axum::Json;
use axum::extract::Query;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetForm {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLanding {
    Redirect(String),
    Form(ResetForm),
}

/// A missing token takes precedence over an error value.
pub fn land(query: TokenQuery) -> TokenLanding {
    let token = match query.token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => return TokenLanding::Redirect("/reset-password?error=missing_token".into()),
    };
    match query.error.filter(|e| !e.is_empty()) {
        Some(error) => TokenLanding::Redirect(format!(
            "/reset-password?error={}",
            urlencoding::encode(&error)
        )),
        None => TokenLanding::Form(ResetForm { token }),
    }
}

pub async fn reset_token_landing(Query(query): Query<TokenQuery>) -> Response {
    match land(query) {
        TokenLanding::Redirect(to) => Redirect::to(&to).into_response(),
        TokenLanding::Form(form) => Json(form).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn query(token: Option<&str>, error: Option<&str>) -> TokenQuery {
        TokenQuery {
            token: token.map(String::from),
            error: error.map(String::from),
        }
    }

    #[test]
    fn missing_or_empty_token_redirects() {
        let expected = TokenLanding::Redirect("/reset-password?error=missing_token".into());
        assert_eq!(land(query(None, None)), expected);
        assert_eq!(land(query(Some(""), None)), expected);
        assert_eq!(land(query(None, Some("expired"))), expected);
    }

    #[test]
    fn error_is_encoded() {
        assert_eq!(
            land(query(Some("abc"), Some("invalid token&x=1"))),
            TokenLanding::Redirect("/reset-password?error=invalid%20token%26x%3D1".into())
        );
    }

    #[test]
    fn valid_token_returns_form() {
        assert_eq!(
            land(query(Some("abc"), Some(""))),
            TokenLanding::Form(ResetForm {
                token: "abc".into()
            })
        );
    }

    proptest! {
        #[test]
        fn any_error_redirects_with_round_trippable_value(token in "[A-Za-z0-9_-]{1,43}", error in ".{1,40}") {
            match land(query(Some(&token), Some(&error))) {
                TokenLanding::Redirect(to) => {
                    let value = to.strip_prefix("/reset-password?error=").unwrap();
                    prop_assert_eq!(urlencoding::decode(value).unwrap(), error.as_str());
                }
                TokenLanding::Form(_) => prop_assert!(false, "error must redirect"),
            }
        }

        #[test]
        fn token_without_error_is_passed_through(token in "[A-Za-z0-9_-]{1,43}") {
            prop_assert_eq!(land(query(Some(&token), None)), TokenLanding::Form(ResetForm { token }));
        }
    }
}
