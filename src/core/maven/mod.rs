mod artifact;

pub use artifact::MavenArtifact;

/// Default repository for libraries that carry no download URL of their own.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
