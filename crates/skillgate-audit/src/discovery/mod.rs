//! Package discovery -- file walks, manifests and installed packages.

pub mod files;
pub mod packages;

pub use files::{package_files, read_text, PackageFile};
pub use packages::{
    describe_package, discover_packages, locate_package, read_manifest, ManifestMeta,
    PackageInfo, DEFAULT_MANIFEST,
};
