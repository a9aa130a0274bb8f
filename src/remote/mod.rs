pub mod error;
pub mod executor;
pub mod local;
pub mod script;
pub mod transporter;

pub use error::*;
pub use executor::{RemoteExecutor, SshExecutor, SshOptions};
pub use local::{LocalExecutor, LocalTransporter};
pub use transporter::{
    transporter_for, ArtifactTransporter, RemoteStep, RsyncTransporter, ScpTransporter,
    TransferMethod, TransferReceipt,
};
