use crate::error::AppError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Tasks,
}

impl Route {
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Tasks)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

/// Evaluated on every navigation; a token removed mid-session takes effect
/// on the next call.
pub fn guard(route: Route, session: &Session) -> Navigation {
    if route.requires_auth() && !session.is_authenticated() {
        tracing::debug!(?route, "no session token, redirecting to login");
        return Navigation::Redirect(Route::Login);
    }
    Navigation::Render(route)
}

/// Like [`guard`], but a redirect becomes an `unauthenticated` error so the
/// guarded view is never produced.
pub fn require(route: Route, session: &Session) -> Result<(), AppError> {
    match guard(route, session) {
        Navigation::Render(_) => Ok(()),
        Navigation::Redirect(_) => Err(AppError::unauthenticated(
            "not signed in; run `taskdeck login` first",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{Navigation, Route, guard, require};
    use crate::session::Session;

    #[test]
    fn tasks_redirect_to_login_without_token() {
        let session = Session::in_memory();
        assert_eq!(
            guard(Route::Tasks, &session),
            Navigation::Redirect(Route::Login)
        );
        assert_eq!(
            require(Route::Tasks, &session).unwrap_err().code(),
            "unauthenticated"
        );
    }

    #[test]
    fn tasks_render_with_token() {
        let session = Session::in_memory();
        session.store_token("abc").unwrap();

        assert_eq!(guard(Route::Tasks, &session), Navigation::Render(Route::Tasks));
        assert!(require(Route::Tasks, &session).is_ok());
    }

    #[test]
    fn public_routes_always_render() {
        let session = Session::in_memory();
        assert_eq!(guard(Route::Login, &session), Navigation::Render(Route::Login));
        assert_eq!(
            guard(Route::Register, &session),
            Navigation::Render(Route::Register)
        );
    }

    #[test]
    fn guard_is_reevaluated_after_logout() {
        let session = Session::in_memory();
        session.store_token("abc").unwrap();
        assert_eq!(guard(Route::Tasks, &session), Navigation::Render(Route::Tasks));

        session.clear().unwrap();
        assert_eq!(
            guard(Route::Tasks, &session),
            Navigation::Redirect(Route::Login)
        );
    }
}
