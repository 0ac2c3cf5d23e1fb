//! Data model shared by every stage of the engine.

pub mod config;
pub mod desired;
pub mod entry;
pub mod keystore;

pub use config::{CapabilityTable, EngineConfig, FormatCapabilities, FormatOverride};
pub use desired::{DesiredSpec, Ensure, SourceBundle, SourceKind};
pub use entry::{Certificate, CertificateChain, Entry, EntryKind};
pub use keystore::{KeystoreRef, Secret, StoreFormat};
