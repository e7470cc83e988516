use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("cache index unavailable")]
    Index,
    #[display("durable store unavailable")]
    Store,
    #[display("nothing to classify in: {_0}")]
    NotRecognized(#[error(not(source))] String),
}
