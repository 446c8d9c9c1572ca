//! Debugging and tuning switches read once from environment variables.
//!
//! An [EnvParam] is a static holding the name of an environment variable and the textual
//! form of its default value. It is meant for parameters that are too specialized to appear on
//! a command line, for instance to dump the constraints produced by an encoder:
//!
//! ```
//! use env_param::EnvParam;
//! static PRINT_ENCODING: EnvParam<bool> = EnvParam::new("DOC_PRINT_ENCODING", "false");
//!
//! // variable not set: the default value is used
//! assert!(!PRINT_ENCODING.get());
//! ```
//!
//! The variable is read on the first access only, later changes of the environment are ignored.
//!
//! ```
//! use env_param::EnvParam;
//! static TIMEOUT: EnvParam<u32> = EnvParam::new("DOC_TIMEOUT", "0");
//!
//! std::env::set_var("DOC_TIMEOUT", "30");
//! assert_eq!(TIMEOUT.get(), 30);
//! std::env::set_var("DOC_TIMEOUT", "60");
//! assert_eq!(TIMEOUT.get(), 30);
//! ```
//!
//! A parameter can also be given a value programmatically, provided it was never read before.
//!
//! ```
//! use env_param::EnvParam;
//! static SIMPLIFY: EnvParam<bool> = EnvParam::new("DOC_SIMPLIFY", "false");
//!
//! assert!(SIMPLIFY.try_set(true).is_ok());
//! assert!(SIMPLIFY.get());
//! assert_eq!(SIMPLIFY.try_set(false), Err(false));
//! ```

use once_cell::sync::OnceCell;
use std::str::FromStr;

pub struct EnvParam<T> {
    value: OnceCell<T>,
    env: &'static str,
    default: &'static str,
}

impl<T> EnvParam<T> {
    /// Declares a parameter read from the environment variable `env`, with the value parsed
    /// from `default` if the variable is absent or invalid.
    pub const fn new(env: &'static str, default: &'static str) -> EnvParam<T> {
        EnvParam {
            value: OnceCell::new(),
            env,
            default,
        }
    }

    /// Name of the environment variable.
    pub fn name(&self) -> &'static str {
        self.env
    }

    pub fn default_value(&self) -> &'static str {
        self.default
    }

    /// True if the value has already been determined.
    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }

    /// Gives a value to the parameter. Fails, returning the value, if the parameter was
    /// already read or set.
    pub fn try_set(&self, value: T) -> Result<(), T> {
        self.value.set(value)
    }

    /// Gives a value to the parameter.
    ///
    /// # Panics
    ///
    /// If the parameter was already read or set.
    pub fn set(&self, value: T) {
        if self.try_set(value).is_err() {
            panic!("parameter {} was already initialized", self.env);
        }
    }
}

impl<T: FromStr> EnvParam<T> {
    fn parse_default(&self) -> T {
        T::from_str(self.default)
            .unwrap_or_else(|_| panic!("{}: invalid default value \"{}\"", self.env, self.default))
    }

    fn read(&self) -> T {
        match std::env::var(self.env) {
            Ok(text) => match T::from_str(&text) {
                Ok(value) => value,
                Err(_) => {
                    eprintln!(
                        "[env_param] WARNING {}: cannot parse \"{text}\", using default \"{}\"",
                        self.env, self.default
                    );
                    self.parse_default()
                }
            },
            Err(std::env::VarError::NotPresent) => self.parse_default(),
            Err(err) => {
                eprintln!("[env_param] WARNING {}: {err}, using default \"{}\"", self.env, self.default);
                self.parse_default()
            }
        }
    }

    /// Value of the parameter, read from the environment on the first access.
    ///
    /// # Panics
    ///
    /// If the default value cannot be parsed.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        *self.get_ref()
    }

    /// Same as [EnvParam::get] for values that are not `Copy`.
    pub fn get_ref(&self) -> &T {
        self.value.get_or_init(|| self.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_value() {
        static PARAM: EnvParam<u32> = EnvParam::new("ENV_PARAM_TEST_DEFAULT", "12");
        assert_eq!(PARAM.name(), "ENV_PARAM_TEST_DEFAULT");
        assert!(!PARAM.is_initialized());
        assert_eq!(PARAM.get(), 12);
        assert!(PARAM.is_initialized());
    }

    #[test]
    fn invalid_value_falls_back_to_default() {
        static PARAM: EnvParam<bool> = EnvParam::new("ENV_PARAM_TEST_INVALID", "true");
        std::env::set_var("ENV_PARAM_TEST_INVALID", "maybe");
        assert!(PARAM.get());
    }

    #[test]
    fn non_copy_values() {
        static PARAM: EnvParam<String> = EnvParam::new("ENV_PARAM_TEST_STRING", "qfnra-nlsat");
        assert_eq!(PARAM.get_ref(), "qfnra-nlsat");
    }

    #[test]
    #[should_panic]
    fn set_after_read() {
        static PARAM: EnvParam<u32> = EnvParam::new("ENV_PARAM_TEST_SET", "1");
        PARAM.get();
        PARAM.set(2);
    }

    #[test]
    #[should_panic]
    fn invalid_default() {
        static PARAM: EnvParam<u32> = EnvParam::new("ENV_PARAM_TEST_BAD_DEFAULT", "one");
        PARAM.get();
    }
}
