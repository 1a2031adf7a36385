//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate full name
pub fn validate_full_name(full_name: &str) -> Result<(), String> {
    let full_name = full_name.trim();

    if full_name.is_empty() {
        return Err("Full name is required".to_string());
    }

    if full_name.chars().count() > 120 {
        return Err("Full name must be at most 120 characters long".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password strength for new accounts
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    let length = password.chars().count();
    if length < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if length > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    let mut has_upper = false;
    let mut has_digit = false;
    let mut has_symbol = false;

    for c in password.chars() {
        if c.is_uppercase() {
            has_upper = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if !c.is_alphanumeric() && !c.is_whitespace() {
            has_symbol = true;
        }
    }

    if !has_upper {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }

    if !has_symbol {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

/// Validate sign-in fields before any call is made
pub fn validate_credentials(email: &str, password: &str) -> Result<(), String> {
    if email.trim().is_empty() || password.is_empty() {
        return Err("Please fill in all fields".to_string());
    }

    validate_email(email.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(validate_email("ana.souza@example.com").is_ok());
        assert!(validate_email("a+tag@mail.example.co").is_ok());
        assert_eq!(validate_email(""), Err("Email is required".to_string()));
        assert_eq!(
            validate_email("ana@example"),
            Err("Invalid email format".to_string())
        );
        assert!(validate_email("ana example.com").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password("Secret#123").is_ok());
        assert!(validate_password("ÉLAN-2024").is_ok());
        assert_eq!(
            validate_password("S#1a"),
            Err("Password must be at least 8 characters long".to_string())
        );
        assert_eq!(
            validate_password("secret#123"),
            Err("Password must contain at least one uppercase letter".to_string())
        );
        assert_eq!(
            validate_password("Secret#abc"),
            Err("Password must contain at least one digit".to_string())
        );
        assert_eq!(
            validate_password("Secret1234"),
            Err("Password must contain at least one special character".to_string())
        );
    }

    #[test]
    fn test_password_length_counts_characters() {
        // 120 two-byte characters: 240 bytes but within the limit
        let accented = format!("A1#{}", "é".repeat(120));
        assert!(validate_password(&accented).is_ok());

        let too_long = format!("A1#{}", "é".repeat(126));
        assert_eq!(
            validate_password(&too_long),
            Err("Password must be at most 128 characters long".to_string())
        );
    }

    #[test]
    fn test_full_name() {
        assert!(validate_full_name("Ana Souza").is_ok());
        assert!(validate_full_name("   ").is_err());
        assert!(validate_full_name(&"x".repeat(121)).is_err());
    }

    #[test]
    fn test_credentials() {
        assert!(validate_credentials("ana@example.com", "anything").is_ok());
        assert_eq!(
            validate_credentials("", "pw"),
            Err("Please fill in all fields".to_string())
        );
        assert_eq!(
            validate_credentials("ana@example.com", ""),
            Err("Please fill in all fields".to_string())
        );
        assert!(validate_credentials("not-an-email", "pw").is_err());
    }
}
