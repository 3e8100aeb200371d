//! Error reporting for the work model generator.
//!
//! Library crates return typed errors. The generator binary only has to explain a failure to whoever ran it, so every
//! error is collapsed into a [`GenericError`] with one line of context per layer. Most of those lines name a file, which
//! is what [`ErrorContext::file_context`] is for.
#![deny(warnings)]
#![deny(missing_docs)]

use std::{fmt, path::Path};

/// An opaque error carrying a chain of causes.
pub type GenericError = anyhow::Error;

/// Constructs a [`GenericError`] from a format string and its arguments.
#[macro_export]
macro_rules! generic_error {
    ($($arg:tt)+) => { $crate::_anyhow!($($arg)+) };
}

#[doc(hidden)]
pub use anyhow::anyhow as _anyhow;

/// What was being done to a file when an error occurred.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileAction {
    /// Reading the file from disk.
    Read,

    /// Decoding the file's contents.
    Parse,

    /// Writing the file to disk.
    Write,

    /// Creating a directory.
    Create,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Read => "read",
            Self::Parse => "parse",
            Self::Write => "write",
            Self::Create => "create",
        };
        f.write_str(verb)
    }
}

/// Extension methods for attaching context to fallible results.
pub trait ErrorContext<T> {
    /// Wraps the error value with the given context.
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Wraps the error value with a message naming the file and what was being done to it, such as
    /// `Failed to read service graph '/data/servicegraph.json'.`
    ///
    /// The message is only rendered once an error has actually occurred.
    fn file_context(self, action: FileAction, subject: &str, path: &Path) -> Result<T, GenericError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    Result<T, E>: anyhow::Context<T, E>,
{
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        <Self as anyhow::Context<T, E>>::context(self, context)
    }

    fn file_context(self, action: FileAction, subject: &str, path: &Path) -> Result<T, GenericError> {
        <Self as anyhow::Context<T, E>>::with_context(self, || {
            format!("Failed to {} {} '{}'.", action, subject, path.display())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn not_found() -> Result<(), io::Error> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    #[test]
    fn context_is_prepended_to_chain() {
        let err = not_found().error_context("Failed to load configuration.").unwrap_err();

        let chain = err.chain().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(chain, vec!["Failed to load configuration.", "no such file"]);
    }

    #[test]
    fn file_context_names_action_and_path() {
        let err = not_found()
            .file_context(FileAction::Read, "service graph", Path::new("/data/servicegraph.json"))
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to read service graph '/data/servicegraph.json'.");
        assert_eq!(err.root_cause().to_string(), "no such file");
    }

    #[test]
    fn file_context_stacks_on_generic_errors() {
        let inner: Result<(), GenericError> = Err(generic_error!("{} services left unassigned", 2));
        let err = inner
            .file_context(FileAction::Write, "work model", Path::new("out/workmodel.json"))
            .unwrap_err();

        let chain = err.chain().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(
            chain,
            vec!["Failed to write work model 'out/workmodel.json'.", "2 services left unassigned"]
        );
    }

    #[test]
    fn ok_results_pass_through() {
        let value: Result<u32, io::Error> = Ok(7);
        assert_eq!(value.file_context(FileAction::Parse, "parameters file", Path::new("p.json")).unwrap(), 7);
    }
}
