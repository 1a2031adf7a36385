//! Navigation routes of the client

use std::{fmt, str::FromStr};

/// A page of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    SignIn,
    SignUp,
    Dashboard,
}

impl Route {
    /// URL path of the page
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::SignIn => "/signin",
            Route::SignUp => "/signup",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Whether the page needs a signed-in user
    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches('/') {
            "" | "home" => Ok(Route::Home),
            "/signin" | "signin" => Ok(Route::SignIn),
            "/signup" | "signup" => Ok(Route::SignUp),
            "/dashboard" | "dashboard" => Ok(Route::Dashboard),
            other => Err(format!("Unknown route: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_and_bare_names() {
        assert_eq!("/".parse::<Route>(), Ok(Route::Home));
        assert_eq!("home".parse::<Route>(), Ok(Route::Home));
        assert_eq!("/signin".parse::<Route>(), Ok(Route::SignIn));
        assert_eq!("signup".parse::<Route>(), Ok(Route::SignUp));
        assert_eq!("/dashboard/".parse::<Route>(), Ok(Route::Dashboard));
        assert!("/settings".parse::<Route>().is_err());
    }

    #[test]
    fn only_dashboard_requires_session() {
        assert!(Route::Dashboard.requires_session());
        assert!(!Route::SignIn.requires_session());
        assert_eq!(Route::Dashboard.to_string(), "/dashboard");
    }
}
