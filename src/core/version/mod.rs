pub mod descriptor;
pub mod manifest;
pub mod resolver;

pub use descriptor::{
    ArgumentFragment, ArgumentValue, Arguments, AssetIndexInfo, DownloadInfo, ExtractFlag,
    ExtractRules, JavaVersionInfo, LibraryDownloads, LibraryEntry, VersionDescriptor,
    VersionDownloads,
};
pub use manifest::{VersionEntry, VersionManifest};
pub use resolver::VersionResolver;
