//! Packaging transcoder: profile resolution, backend selection and the two
//! execution paths (cloud submission, local encoder).

pub mod backend;
pub mod capabilities;
pub mod cloud;
pub mod encoder;
pub mod packager;
pub mod profile;
pub mod rules;

pub use backend::{select_backend, Backend, BackendDefaults, CloudTarget};
pub use capabilities::Capabilities;
pub use cloud::{
    CloudJobStatus, HttpTranscodeService, SubmittedJob, TranscodeJobSpec, TranscodeService,
};
pub use encoder::LocalEncoder;
pub use packager::{PackagingSummary, PackagingTranscoder};
pub use profile::{Container, Profile, ProfileSpec};
pub use rules::{ProfileRule, ProfileRules};
