use hireboard_core::gateway::{Navigator, Route};

/// Terminal stand-in for the app's navigation stack.
///
/// A reset to the login screen tells the user to log in again.
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn reset(&self, routes: Vec<Route>) {
        let stack: Vec<&str> = routes.iter().map(|r| r.name.as_str()).collect();
        log::warn!(
            "session ended by the server; run `hireboard login` to continue ({})",
            stack.join(" > ")
        );
    }
}
