/*!
Loading the process argument vector for the engine.

The engine consumes `&[String]`; this module provides the owned container
those slices borrow from, converted once from the OS encoding near the
start of `main`.
*/

use crate::command::Command;
use crate::errors::InvokeError;

/// Owned container for the arguments this process was started with.
#[derive(Debug, Clone)]
pub struct LoadedArguments {
    arguments: Vec<String>,
}

impl LoadedArguments {
    /// Capture the environment's argument vector, converting lossily from
    /// the OS encoding.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            arguments: std::env::args_os()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        }
    }

    /// Build from an explicit vector that still includes the program name.
    #[must_use]
    pub fn from_vec(arguments: Vec<String>) -> Self {
        Self { arguments }
    }

    /// The program name, when the OS provided one.
    pub fn argv0(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }

    /// The arguments proper, program name excluded.
    pub fn args(&self) -> &[String] {
        self.arguments.get(1..).unwrap_or(&[])
    }

    /// Invoke a command tree on the loaded arguments.
    pub fn invoke(&self, root: &Command) -> Result<(), InvokeError> {
        root.invoke(self.args())
    }
}

#[cfg(test)]
mod tests {
    use super::LoadedArguments;

    #[test]
    fn argv0_is_split_from_the_arguments() {
        let loaded = LoadedArguments::from_vec(vec!["tool".to_owned(), "-v".to_owned()]);
        assert_eq!(loaded.argv0(), Some("tool"));
        assert_eq!(loaded.args(), ["-v"]);
    }

    #[test]
    fn empty_vector_yields_no_arguments() {
        let loaded = LoadedArguments::from_vec(Vec::new());
        assert_eq!(loaded.argv0(), None);
        assert!(loaded.args().is_empty());
    }
}
