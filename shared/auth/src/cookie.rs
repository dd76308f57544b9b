pub const TOKEN_COOKIE: &str = "token";

/// `Set-Cookie` value carrying the session token.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        TOKEN_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the session token.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc", 604800, false);
        assert_eq!(cookie, "token=abc; Path=/; HttpOnly; SameSite=Strict; Max-Age=604800");
    }

    #[test]
    fn secure_flag_is_appended() {
        assert!(session_cookie("abc", 60, true).ends_with("; Secure"));
    }

    #[test]
    fn clearing_expires_immediately() {
        assert!(clear_session_cookie(false).starts_with("token=;"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
