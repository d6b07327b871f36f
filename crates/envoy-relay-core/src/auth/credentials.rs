use std::fmt;

/// Enlighten account plus the Envoy the token is minted for.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub site: String,
    pub serial: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("site", &self.site)
            .field("serial", &self.serial)
            .finish()
    }
}
