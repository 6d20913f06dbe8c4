//! Sources for the PKCS#12 container password.

use crate::{Error, Result};
use secrecy::SecretString;
use std::io::{self, BufRead, IsTerminal};

/// Supplies the password used to open the signing container.
pub trait PasswordProvider {
    /// Obtain the password. May block, e.g. on an interactive prompt.
    fn password(&self) -> Result<SecretString>;
}

/// Container has no password; yields the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPassword;

impl PasswordProvider for NoPassword {
    fn password(&self) -> Result<SecretString> {
        Ok(SecretString::new(String::new()))
    }
}

/// A password known up front.
#[derive(Clone)]
pub struct StaticPassword(SecretString);

impl StaticPassword {
    /// Wrap a password. It is zeroized when dropped.
    pub fn new(password: impl Into<String>) -> Self {
        Self(SecretString::new(password.into()))
    }
}

impl PasswordProvider for StaticPassword {
    fn password(&self) -> Result<SecretString> {
        Ok(self.0.clone())
    }
}

/// Reads the password from the terminal without echo.
///
/// When stdin is not a terminal (piped input in scripts or CI), the first
/// line of stdin is taken instead.
#[derive(Debug, Clone)]
pub struct PromptPassword {
    prompt: String,
}

impl PromptPassword {
    /// Prompt with the given text.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Default for PromptPassword {
    fn default() -> Self {
        Self::new("Input certificate password: ")
    }
}

impl PromptPassword {
    /// Read one newline-terminated line from `reader` as the password.
    pub(crate) fn read_line(reader: &mut impl BufRead) -> Result<SecretString> {
        #[allow(deprecated)]
        let line = rpassword::read_password_from_bufread(reader);
        line.map(SecretString::new)
            .map_err(|e| Error::MissingCredentials(format!("Failed to read password: {e}")))
    }
}

impl PasswordProvider for PromptPassword {
    fn password(&self) -> Result<SecretString> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            tracing::debug!("stdin is not a terminal, reading password from stdin");
            return Self::read_line(&mut stdin.lock());
        }

        rpassword::prompt_password(&self.prompt)
            .map(SecretString::new)
            .map_err(|e| Error::MissingCredentials(format!("Failed to read password: {e}")))
    }
}
