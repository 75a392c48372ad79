use url::Url;

/// Where the host application should send the user next.
///
/// The session manager never navigates on its own; it returns one of these
/// and the calling layer (router, `window.location`, HTTP redirect) acts on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Leave the application, e.g. for the hosted login page.
    External(Url),
    /// Route inside the hosting application.
    Route(String),
}

impl Navigation {
    /// Target as a string, whichever variant this is.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::External(url) => url.as_str(),
            Self::Route(route) => route,
        }
    }
}

impl std::fmt::Display for Navigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
