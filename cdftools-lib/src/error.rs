#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Skeleton(#[from] crate::skeleton::Error),
    #[error(transparent)]
    Timecode(#[from] crate::timecode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn decode() -> Result<()> {
        crate::timecode::decode(0x0e, &[], None)?;
        Ok(())
    }

    #[test]
    fn wraps_module_errors() {
        assert!(matches!(decode(), Err(Error::Timecode(_))));

        let err: Error = crate::skeleton::Error::UnknownVariable("x".to_string()).into();
        assert_eq!(err.to_string(), "Unknown zVariable \"x\"");
    }
}
