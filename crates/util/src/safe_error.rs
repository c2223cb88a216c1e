use anyhow::Result;
use log::error;

/// Unwrap without panicking; a failure is logged and turned into `None`.
pub trait SafeUnwrap {
    type Output;

    fn safe_unwrap(self) -> Self::Output;
}

impl<T> SafeUnwrap for Result<T> {
    type Output = Option<T>;

    fn safe_unwrap(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                error!("{error:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};

    use super::SafeUnwrap;

    #[test]
    fn ok_passes_through() {
        let result: Result<u32> = Ok(7);
        assert_eq!(result.safe_unwrap(), Some(7));
    }

    #[test]
    fn error_becomes_none() {
        let result: Result<u32> = Err(anyhow!("boom"));
        assert_eq!(result.safe_unwrap(), None);
    }
}
