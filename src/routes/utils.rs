use axum::http::{HeaderMap, StatusCode};
use uuid::Uuid;

use super::auth::AuthService;

/// Resolves the acting user from the Authorization header. Accepts the raw
/// token or the `Bearer <token>` form.
#[inline]
pub fn validate_auth_token(headers: &HeaderMap, service: &AuthService) -> Result<Uuid, StatusCode> {
    let jwt_header_token = match headers.get("Authorization").map(|token| token.to_str()) {
        Some(Ok(token)) => token.strip_prefix("Bearer ").unwrap_or(token),
        _ => {
            return Err(StatusCode::UNAUTHORIZED);
        }
    };
    //validate our token
    match service.verify_token(jwt_header_token) {
        Ok(user) => Ok(user),
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

#[inline]
pub fn check_password(password: &str) -> Result<(), Box<dyn std::error::Error>> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".into());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".into());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".into());
    }
    if !password.chars().any(|c| c.is_digit(10)) {
        return Err("Password must contain at least one digit".into());
    }
    Ok(())
}

#[inline]
pub fn check_username(username: &str) -> Result<(), Box<dyn std::error::Error>> {
    if username.len() < 3 || username.len() > 32 {
        return Err("Username must be between 3 and 32 characters".into());
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err("Username may only contain letters, digits, '_' and '.'".into());
    }
    Ok(())
}
