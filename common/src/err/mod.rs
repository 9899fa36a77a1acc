use crate::err::mirror_error::MirrorError;

pub mod mirror_error;

pub type MResult<T> = Result<T, MirrorError>;
