//! Staging of CI artifacts for the e2e flows

use std::path::{Path, PathBuf};

use super::{fetch, E2eContext};
use crate::circleci::{ArtifactResolver, CiTransport, JsEngine};
use crate::common::Result;

pub const HERMES_TARBALL: &str = "hermes-ios-debug.tar.gz";
pub const PACKAGE_TARBALL: &str = "react-native.tgz";
pub const MAVEN_LOCAL_ZIP: &str = "maven-local.zip";
pub const MAVEN_LOCAL_DIR: &str = "maven-local";

/// Download the debug Hermes tarball; returns its path
pub async fn hermes_tarball<T: CiTransport>(
    ctx: &E2eContext<'_>,
    resolver: &ArtifactResolver<T>,
) -> Result<PathBuf> {
    let url = resolver.artifact_url_hermes_debug().await?;
    let dest = resolver.tmp_path(HERMES_TARBALL);
    fetch(ctx, resolver, &url, &dest).await?;
    Ok(dest)
}

/// Download the framework npm tarball; returns its path
pub async fn package_tarball<T: CiTransport>(
    ctx: &E2eContext<'_>,
    resolver: &ArtifactResolver<T>,
) -> Result<PathBuf> {
    let url = resolver.artifact_url_react_native_package().await?;
    let dest = resolver.tmp_path(PACKAGE_TARBALL);
    fetch(ctx, resolver, &url, &dest).await?;
    Ok(dest)
}

/// Download and unpack the Maven local repository; returns the unpacked directory
pub async fn maven_local<T: CiTransport>(
    ctx: &E2eContext<'_>,
    resolver: &ArtifactResolver<T>,
) -> Result<PathBuf> {
    let url = resolver.artifact_url_maven_local().await?;
    let zip_path = resolver.tmp_path(MAVEN_LOCAL_ZIP);
    let dest = resolver.tmp_path(MAVEN_LOCAL_DIR);
    fetch(ctx, resolver, &url, &zip_path).await?;

    if !ctx.dry_run {
        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }
        extract_zip(&zip_path, &dest)?;
    }
    Ok(dest)
}

/// Download the RNTester APK matching `engine` and the device ABI `arch`
pub async fn rntester_apk<T: CiTransport>(
    ctx: &E2eContext<'_>,
    resolver: &ArtifactResolver<T>,
    engine: JsEngine,
    arch: &str,
) -> Result<PathBuf> {
    let url = resolver.artifact_url_rntester_apk(engine, arch).await?;
    let dest = resolver.tmp_path(&format!("app-{engine}-{arch}-release.apk"));
    fetch(ctx, resolver, &url, &dest).await?;
    Ok(dest)
}

/// Extract a zip archive
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let outpath = match entry.enclosed_name() {
            Some(path) => dest_dir.join(path),
            None => continue,
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = std::fs::File::create(&outpath)?;
        std::io::copy(&mut entry, &mut outfile)?;
    }

    tracing::debug!(archive = %archive_path.display(), dest = %dest_dir.display(), "Extracted");
    Ok(())
}
