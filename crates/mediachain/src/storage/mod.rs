pub mod assets;
pub mod filesystem;
pub mod object_store;

pub use assets::{
    AssetStorage, IncomingUpload, IngestManifest, PendingSync, SavedUpload, SourceAsset,
    UploadedAsset,
};
pub use filesystem::FileStorage;
pub use object_store::{
    is_remote_uri, parse_remote_uri, remote_uri, FsObjectStore, ObjectMeta, ObjectStore,
    RemoteObject,
};
