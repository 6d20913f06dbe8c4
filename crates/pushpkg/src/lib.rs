pub mod archive;
pub mod builder;
pub mod bundle;
pub mod crypto;
pub mod error;

pub use archive::{create_push_package, CompressionLevel, PackageSources};
pub use builder::{BuildReport, PushPackage};
pub use bundle::{validate, Manifest, ManifestBuilder, ValidationReport};
pub use crypto::{
    Backend, ExternalSigner, NoPassword, PasswordProvider, PromptPassword, Signer, StaticPassword,
};
#[cfg(feature = "openssl-backend")]
pub use crypto::{OpensslSigner, SigningAssets};
#[cfg(feature = "pure-rust")]
pub use crypto::{PureRustCredentials, PureSigner};
pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
