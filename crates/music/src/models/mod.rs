mod identifier;
mod market;
mod provider;
mod record;
mod result;

pub use self::identifier::{Identifier, IdentifierKind};
pub use self::market::Market;
pub use self::provider::{EntityKind, Provider};
pub use self::record::DurableRecord;
pub use self::result::{ProviderResult, ResolutionResult, WorkIdentity};
pub(crate) use self::result::collapse;

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace('/', "").replace('-', "").replace('_', "").replace(' ', "")
}
